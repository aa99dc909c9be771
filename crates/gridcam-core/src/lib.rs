//! Core geometry and calibration types for electrode-grid tracking.
//!
//! This crate is intentionally small and purely geometric. It holds the
//! pieces that do not depend on threads or a camera: homography
//! estimation and composition, fiducial marker types, the calibration
//! reference, the marker correspondence matcher, and the per-frame grid
//! locator. The real-time capture/tracking pipeline lives in
//! `gridcam-track`.

mod correspond;
mod frame;
mod homography;
mod logger;
mod marker;
mod reference;
mod resolve;

pub use correspond::{match_markers, MarkerMatch, MatchError, MAX_MARKERS};
pub use frame::Frame;
pub use homography::{estimate_homography, homography_from_4pt, Homography};
pub use marker::{Marker, MarkerDetector, Quad};
pub use reference::{ControlPoint, GridReference, ReferenceError, MIN_CONTROL_POINTS};
pub use resolve::{locate_grid, LocateError};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
