use gridcam_core::Frame;

/// A single capture attempt failed.
///
/// The capture loop retries a bounded number of consecutive failures
/// before treating the source as dead (see `CaptureParams`).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("frame capture failed: {0}")]
pub struct CaptureError(String);

impl CaptureError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Camera seam: anything that can fill an RGB frame buffer on demand.
///
/// `capture_into` writes a complete frame into `frame` or fails without
/// publishing anything; the buffer it was handed may be left in any state
/// on failure, the pool never exposes it.
pub trait FrameSource: Send {
    /// Native capture dimensions `(width, height)`.
    fn frame_size(&self) -> (usize, usize);

    fn capture_into(&mut self, frame: &mut Frame) -> Result<(), CaptureError>;
}
