use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::Frame;

/// Ordered corner quadrilateral of one fiducial marker, image-plane
/// coordinates. The corner order is whatever the decoder reports, but it
/// must be stable for a given physical marker: the matcher derives its
/// orientation basis from the `corners[1] - corners[0]` edge.
pub type Quad = [Point2<f64>; 4];

/// One fiducial detected in a frame.
///
/// Markers carry no persistent identity across frames; correspondence with
/// the calibration reference is re-established every cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub corners: Quad,
    /// Decoded payload, opaque to the tracking pipeline.
    pub payload: String,
}

impl Marker {
    pub fn new(corners: Quad, payload: impl Into<String>) -> Self {
        Self {
            corners,
            payload: payload.into(),
        }
    }
}

/// Fiducial decoder seam.
///
/// Implementations are treated as pure functions of the frame contents;
/// the pipeline never caches or reorders their output.
pub trait MarkerDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Vec<Marker>;
}
