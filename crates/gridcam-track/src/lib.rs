//! Real-time frame acquisition and grid-transform tracking.
//!
//! Three threads of control cooperate here:
//! - the capture loop (single producer) publishing frames into a
//!   fixed-size buffer pool,
//! - the async grid locator (single worker) resolving the grid→frame
//!   homography off the capture path,
//! - any number of readers pulling the latest frame or the latest
//!   stabilized transform.
//!
//! Frame sequence numbers are the only ordering authority; nothing in
//! this crate infers ordering from wall-clock time.

mod capture;
mod locator;
mod pool;
mod source;

pub use capture::{CaptureLoop, CaptureParams};
pub use locator::{AsyncGridLocate, LocateCallback, LocateOutcome, LocatorParams};
pub use pool::{EncodeError, FramePool, FrameWriter};
pub use source::{CaptureError, FrameSource};
