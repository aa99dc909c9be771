//! Continuous frame acquisition.
//!
//! A dedicated producer thread drives the [`FrameSource`], publishes every
//! frame through the pool writer, and forwards a copy of the latest frame
//! to the grid locator at a throttled rate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use gridcam_core::Frame;

use crate::locator::AsyncGridLocate;
use crate::pool::FrameWriter;
use crate::source::{CaptureError, FrameSource};

/// Capture loop settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CaptureParams {
    /// Minimum interval between frames forwarded to the locator.
    pub process_period: Duration,
    /// Consecutive capture failures tolerated before the loop gives up.
    pub max_capture_retries: u32,
}

impl Default for CaptureParams {
    fn default() -> Self {
        Self {
            process_period: Duration::from_secs(1),
            max_capture_retries: 5,
        }
    }
}

struct CaptureShared {
    shutdown: AtomicBool,
    error: Mutex<Option<CaptureError>>,
}

/// Handle to the running capture thread. Dropping it stops the loop and
/// joins the thread.
pub struct CaptureLoop {
    shared: Arc<CaptureShared>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureLoop {
    /// Start capturing from `source` into the pool owned by `writer`.
    ///
    /// When `locator` is set, a copy of the freshest frame is pushed to it
    /// no more often than `params.process_period`.
    pub fn spawn(
        source: Box<dyn FrameSource>,
        writer: FrameWriter,
        locator: Option<Arc<AsyncGridLocate>>,
        params: CaptureParams,
    ) -> Self {
        let shared = Arc::new(CaptureShared {
            shutdown: AtomicBool::new(false),
            error: Mutex::new(None),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::spawn(move || {
            run_capture(source, writer, locator, params, &worker_shared);
        });

        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// The fatal error that terminated the loop, if it has died.
    pub fn error(&self) -> Option<CaptureError> {
        self.shared.error.lock().unwrap().clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_capture(
    mut source: Box<dyn FrameSource>,
    mut writer: FrameWriter,
    locator: Option<Arc<AsyncGridLocate>>,
    params: CaptureParams,
    shared: &CaptureShared,
) {
    let (width, height) = source.frame_size();
    log::info!("capture loop running ({width}x{height})");

    let mut consecutive_failures = 0u32;
    let mut last_forward: Option<Instant> = None;

    while !shared.shutdown.load(Ordering::Relaxed) {
        let forward_due = locator.is_some()
            && last_forward.is_none_or(|at| at.elapsed() >= params.process_period);
        let mut forward: Option<Frame> = None;

        let published = writer.publish_with(|frame| {
            frame.resize_to(width, height);
            source.capture_into(frame)?;
            if !frame.is_consistent() {
                return Err(CaptureError::new("source left the frame buffer inconsistent"));
            }
            if forward_due {
                forward = Some(frame.clone());
            }
            Ok(())
        });

        match published {
            Ok(_) => {
                consecutive_failures = 0;
                if let (Some(locator), Some(frame)) = (locator.as_deref(), forward.take()) {
                    last_forward = Some(Instant::now());
                    locator.push(frame);
                }
            }
            Err(err) => {
                consecutive_failures += 1;
                log::warn!(
                    "frame capture failed ({consecutive_failures}/{}): {err}",
                    params.max_capture_retries
                );
                if consecutive_failures > params.max_capture_retries {
                    log::error!(
                        "giving up after {consecutive_failures} consecutive capture failures"
                    );
                    *shared.error.lock().unwrap() = Some(err);
                    return;
                }
            }
        }
    }
}
