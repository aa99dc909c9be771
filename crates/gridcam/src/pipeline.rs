//! End-to-end tracking pipeline: capture → frame pool → async locator.

use std::sync::Arc;

use serde_json::json;

use gridcam_core::{Frame, GridReference, Homography, Marker, MarkerDetector};
use gridcam_track::{
    AsyncGridLocate, CaptureError, CaptureLoop, CaptureParams, EncodeError, FramePool, FrameSource,
    LocatorParams,
};

/// Settings for [`VideoPipeline::spawn`].
#[derive(Clone, Copy, Debug)]
pub struct PipelineParams {
    /// Frame pool size; 3 lets a reader encode one slot while the writer
    /// fills another.
    pub slot_count: usize,
    pub capture: CaptureParams,
    pub locator: LocatorParams,
    pub jpeg_quality: u8,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            slot_count: 3,
            capture: CaptureParams::default(),
            locator: LocatorParams::default(),
            jpeg_quality: 90,
        }
    }
}

/// Owns the capture thread, the frame pool, and the grid locator, and
/// exposes the read-side API consumed by a serving layer.
///
/// All accessors are safe to call from any number of threads; none of
/// them can stall the capture loop.
pub struct VideoPipeline {
    capture: CaptureLoop,
    locator: Arc<AsyncGridLocate>,
    pool: FramePool,
    jpeg_quality: u8,
}

impl VideoPipeline {
    /// Spawn the locator worker and the capture thread.
    ///
    /// `reference` carries its own validation: a malformed calibration
    /// file never reaches this point.
    pub fn spawn(
        source: Box<dyn FrameSource>,
        detector: Arc<dyn MarkerDetector>,
        reference: GridReference,
        params: PipelineParams,
    ) -> Self {
        let (width, height) = source.frame_size();
        let (pool, writer) = FramePool::with_writer(params.slot_count, width, height);
        let locator = Arc::new(AsyncGridLocate::spawn(reference, detector, params.locator));
        let capture = CaptureLoop::spawn(source, writer, Some(Arc::clone(&locator)), params.capture);

        Self {
            capture,
            locator,
            pool,
            jpeg_quality: params.jpeg_quality,
        }
    }

    /// JPEG-encode the latest frame with sequence ≥ `min_seq`, blocking
    /// until one is available. Long-polling consumers pass the returned
    /// sequence number plus one on their next call to never see the same
    /// frame twice.
    pub fn latest_jpeg(&self, min_seq: u64) -> Result<(Vec<u8>, u64), EncodeError> {
        self.pool.latest_jpeg(min_seq, self.jpeg_quality)
    }

    /// Run `f` on the latest frame with sequence ≥ `min_seq` (for overlay
    /// drawing or custom encoding by the caller).
    pub fn latest_frame_with<R>(&self, min_seq: u64, f: impl FnOnce(&Frame, u64) -> R) -> R {
        self.pool.wait_latest(min_seq, f)
    }

    /// The stabilized grid→current-frame transform, if one is held.
    pub fn latest_transform(&self) -> Option<Homography> {
        self.locator.latest().transform
    }

    /// The transform as a JSON value: a 3×3 array of arrays, or explicit
    /// null when absent.
    pub fn latest_transform_json(&self) -> serde_json::Value {
        match self.latest_transform() {
            Some(t) => json!(t.to_array()),
            None => serde_json::Value::Null,
        }
    }

    /// Markers from the most recent stabilized locate cycle, for overlay
    /// rendering by the caller.
    pub fn latest_markers(&self) -> Vec<Marker> {
        self.locator.latest().markers
    }

    /// Sequence number of the most recently published frame.
    pub fn sequence(&self) -> u64 {
        self.pool.sequence()
    }

    /// Reader handle to the frame pool, for consumers that manage their
    /// own waits and timeouts.
    pub fn pool(&self) -> &FramePool {
        &self.pool
    }

    /// The error that killed the capture thread, if it has died.
    pub fn capture_error(&self) -> Option<CaptureError> {
        self.capture.error()
    }
}
