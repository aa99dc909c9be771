//! Electrode-grid tracking from fiducial markers in live camera frames.
//!
//! This crate is the facade over the `gridcam-*` workspace:
//! - stable re-exports of the geometry core and the tracking pipeline
//! - [`VideoPipeline`], the end-to-end aggregate a serving layer embeds.
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::sync::Arc;
//! use gridcam::{GridReference, PipelineParams, VideoPipeline};
//! # use gridcam::{Frame, Marker, MarkerDetector};
//! # use gridcam::track::{CaptureError, FrameSource};
//! # struct Camera;
//! # impl FrameSource for Camera {
//! #     fn frame_size(&self) -> (usize, usize) { (1024, 768) }
//! #     fn capture_into(&mut self, _f: &mut Frame) -> Result<(), CaptureError> { Ok(()) }
//! # }
//! # struct Decoder;
//! # impl MarkerDetector for Decoder {
//! #     fn detect(&self, _: &Frame) -> Vec<Marker> { vec![] }
//! # }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let reference = GridReference::from_json_file("reference.json")?;
//! let pipeline = VideoPipeline::spawn(
//!     Box::new(Camera),
//!     Arc::new(Decoder),
//!     reference,
//!     PipelineParams::default(),
//! );
//!
//! let (jpeg, seq) = pipeline.latest_jpeg(0)?;
//! println!("frame {seq}: {} bytes, transform: {}", jpeg.len(), pipeline.latest_transform_json());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `gridcam::core`: homographies, markers, the calibration reference.
//! - `gridcam::track`: frame pool, capture loop, async locator.
//! - `gridcam::VideoPipeline`: everything wired together.

pub use gridcam_core as core;
pub use gridcam_track as track;

pub use gridcam_core::{
    locate_grid, ControlPoint, Frame, GridReference, Homography, LocateError, Marker,
    MarkerDetector, Quad, ReferenceError,
};
pub use gridcam_track::{CaptureParams, LocateOutcome, LocatorParams};

mod pipeline;

pub use pipeline::{PipelineParams, VideoPipeline};
