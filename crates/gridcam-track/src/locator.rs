//! Asynchronous grid location off the capture path.
//!
//! A dedicated worker consumes at most one pending frame at a time
//! (latest-wins mailbox, not a queue: location is expensive relative to
//! the frame rate, and a stale result beats a backlog). The stabilized
//! result follows a drop-out hysteresis policy so one blurred frame does
//! not flash the overlay off.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};

use gridcam_core::{locate_grid, Frame, GridReference, Homography, Marker, MarkerDetector};

/// Log failed cycles on the first failure of a streak, then every this
/// many failures.
const FAIL_LOG_EVERY: u32 = 30;

/// Locator settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LocatorParams {
    /// Consecutive failed cycles tolerated before the stabilized result
    /// drops to "no transform".
    pub tolerance: u32,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self { tolerance: 3 }
    }
}

/// Result of one locate cycle: the resolved transform (absent on
/// failure) and the markers detected in that frame.
#[derive(Clone, Debug, Default)]
pub struct LocateOutcome {
    pub transform: Option<Homography>,
    pub markers: Vec<Marker>,
}

/// Notification side channel, invoked after every processing cycle with
/// the cycle's raw outcome — independent of the stabilized `latest()`.
pub type LocateCallback = Box<dyn Fn(&LocateOutcome) + Send + 'static>;

struct LocatorState {
    pending: Option<Frame>,
    latest: LocateOutcome,
    fail_count: u32,
    shutdown: bool,
}

struct LocatorShared {
    state: Mutex<LocatorState>,
    pending_ready: Condvar,
}

/// Worker-backed grid locator.
///
/// `push` and `latest` never block the caller beyond pointer-sized
/// critical sections; the expensive detection/resolution pipeline runs
/// with no locks held.
pub struct AsyncGridLocate {
    shared: Arc<LocatorShared>,
    worker: Option<JoinHandle<()>>,
}

impl AsyncGridLocate {
    pub fn spawn(
        reference: GridReference,
        detector: Arc<dyn MarkerDetector>,
        params: LocatorParams,
    ) -> Self {
        Self::spawn_with_callback(reference, detector, params, None)
    }

    pub fn spawn_with_callback(
        reference: GridReference,
        detector: Arc<dyn MarkerDetector>,
        params: LocatorParams,
        callback: Option<LocateCallback>,
    ) -> Self {
        let shared = Arc::new(LocatorShared {
            state: Mutex::new(LocatorState {
                pending: None,
                latest: LocateOutcome::default(),
                fail_count: 0,
                shutdown: false,
            }),
            pending_ready: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::spawn(move || {
            run_worker(&worker_shared, &reference, detector.as_ref(), params, callback);
        });

        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Hand a frame to the worker. Non-blocking; replaces any pending
    /// frame that processing has not started on yet.
    pub fn push(&self, frame: Frame) {
        let mut state = self.shared.state.lock().unwrap();
        state.pending = Some(frame);
        self.shared.pending_ready.notify_one();
    }

    /// The most recent stabilized (transform, markers) pair. Non-blocking.
    pub fn latest(&self) -> LocateOutcome {
        self.shared.state.lock().unwrap().latest.clone()
    }
}

impl Drop for AsyncGridLocate {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.shutdown = true;
            self.shared.pending_ready.notify_one();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(
    shared: &LocatorShared,
    reference: &GridReference,
    detector: &dyn MarkerDetector,
    params: LocatorParams,
    callback: Option<LocateCallback>,
) {
    loop {
        let frame = {
            let state = shared.state.lock().unwrap();
            let mut state = shared
                .pending_ready
                .wait_while(state, |s| s.pending.is_none() && !s.shutdown)
                .unwrap();
            if state.shutdown {
                return;
            }
            // take and clear the mailbox, then drop the lock for the
            // whole detection/resolution pipeline
            let Some(frame) = state.pending.take() else {
                continue;
            };
            frame
        };

        let markers = detector.detect(&frame);
        let outcome = match locate_grid(reference, &markers) {
            Ok(transform) => LocateOutcome {
                transform: Some(transform),
                markers,
            },
            Err(err) => {
                let streak = {
                    let state = shared.state.lock().unwrap();
                    state.fail_count + 1
                };
                if streak == 1 || streak % FAIL_LOG_EVERY == 0 {
                    log::warn!("grid locate failed ({streak} consecutive): {err}");
                }
                LocateOutcome {
                    transform: None,
                    markers,
                }
            }
        };

        {
            let mut state = shared.state.lock().unwrap();
            if outcome.transform.is_some() {
                state.fail_count = 0;
                state.latest = outcome.clone();
            } else {
                state.fail_count += 1;
                if state.fail_count > params.tolerance {
                    state.latest = outcome.clone();
                }
            }
        }

        if let Some(callback) = &callback {
            callback(&outcome);
        }
    }
}
