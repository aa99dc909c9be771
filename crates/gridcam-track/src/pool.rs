//! Fixed-size frame buffer ring with a single writer and any number of
//! readers.
//!
//! One slot is "active" (the most recently completed capture) at any
//! instant. The active index and the monotone frame sequence number live
//! under a coordination lock with a condition variable; each slot has its
//! own lock. Readers hold the coordination lock only long enough to read
//! the active index and acquire that slot's lock, then do all expensive
//! work (JPEG encode, overlay drawing) under the slot lock alone, so the
//! writer can keep publishing into other slots.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use gridcam_core::Frame;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

struct PoolState {
    active: usize,
    seq: u64,
}

struct Shared {
    slots: Vec<Mutex<Frame>>,
    state: Mutex<PoolState>,
    frame_ready: Condvar,
}

/// Reader handle to the pool. Cheap to clone; every clone sees the same
/// slots.
#[derive(Clone)]
pub struct FramePool {
    shared: Arc<Shared>,
}

/// The single writer handle. Not cloneable: slot selection assumes one
/// producer, so write access is confined to whoever owns this value.
pub struct FrameWriter {
    shared: Arc<Shared>,
}

impl FramePool {
    /// Create a pool of `slot_count` buffers sized `width × height` and
    /// the writer handle for it.
    ///
    /// # Panics
    ///
    /// Panics if `slot_count < 2`; the writer needs at least one slot that
    /// is not the active one.
    pub fn with_writer(
        slot_count: usize,
        width: usize,
        height: usize,
    ) -> (FramePool, FrameWriter) {
        assert!(slot_count >= 2, "frame pool needs at least 2 slots");
        let shared = Arc::new(Shared {
            slots: (0..slot_count)
                .map(|_| Mutex::new(Frame::new(width, height)))
                .collect(),
            state: Mutex::new(PoolState { active: 0, seq: 0 }),
            frame_ready: Condvar::new(),
        });
        (
            FramePool {
                shared: Arc::clone(&shared),
            },
            FrameWriter { shared },
        )
    }

    /// Sequence number of the most recently published frame (0 before the
    /// first publish).
    pub fn sequence(&self) -> u64 {
        self.shared.state.lock().unwrap().seq
    }

    /// Run `f` on the latest frame once its sequence number reaches
    /// `min_seq`, blocking on the pool's condition variable until then.
    ///
    /// `f` runs under the slot lock only; the coordination lock is
    /// released first, so the writer is never stalled by a slow reader.
    pub fn wait_latest<R>(&self, min_seq: u64, f: impl FnOnce(&Frame, u64) -> R) -> R {
        let state = self.shared.state.lock().unwrap();
        let state = self
            .shared
            .frame_ready
            .wait_while(state, |s| s.seq < min_seq)
            .unwrap();
        let seq = state.seq;
        let slot = self.shared.slots[state.active].lock().unwrap();
        drop(state);
        f(&slot, seq)
    }

    /// Like [`wait_latest`](Self::wait_latest) but gives up after
    /// `timeout` and returns `None`.
    pub fn wait_latest_timeout<R>(
        &self,
        min_seq: u64,
        timeout: Duration,
        f: impl FnOnce(&Frame, u64) -> R,
    ) -> Option<R> {
        let state = self.shared.state.lock().unwrap();
        let (state, res) = self
            .shared
            .frame_ready
            .wait_timeout_while(state, timeout, |s| s.seq < min_seq)
            .unwrap();
        if res.timed_out() && state.seq < min_seq {
            return None;
        }
        let seq = state.seq;
        let slot = self.shared.slots[state.active].lock().unwrap();
        drop(state);
        Some(f(&slot, seq))
    }

    /// JPEG-encode the latest frame with sequence ≥ `min_seq`.
    ///
    /// Returns the encoded bytes and the frame's sequence number, which a
    /// long-polling consumer feeds back as `min_seq + 1` to wait for the
    /// next frame.
    pub fn latest_jpeg(&self, min_seq: u64, quality: u8) -> Result<(Vec<u8>, u64), EncodeError> {
        self.wait_latest(min_seq, |frame, seq| {
            let mut buf = Vec::new();
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            encoder.encode(
                &frame.data,
                frame.width as u32,
                frame.height as u32,
                ExtendedColorType::Rgb8,
            )?;
            Ok((buf, seq))
        })
    }
}

impl FrameWriter {
    /// Fill the next non-active slot via `fill`, then publish it as the
    /// new active frame and wake all waiters.
    ///
    /// If `fill` fails nothing is published: the previously active slot
    /// stays current and the sequence number does not advance. Returns
    /// the sequence number assigned to the published frame.
    pub fn publish_with<E>(
        &mut self,
        fill: impl FnOnce(&mut Frame) -> Result<(), E>,
    ) -> Result<u64, E> {
        let next = {
            let state = self.shared.state.lock().unwrap();
            (state.active + 1) % self.shared.slots.len()
        };

        {
            let mut slot = self.shared.slots[next].lock().unwrap();
            fill(&mut slot)?;
        }

        let mut state = self.shared.state.lock().unwrap();
        state.active = next;
        state.seq += 1;
        self.shared.frame_ready.notify_all();
        Ok(state.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn fill_bytes(value: u8) -> impl FnOnce(&mut Frame) -> Result<(), CaptureTestError> {
        move |frame| {
            frame.data.fill(value);
            Ok(())
        }
    }

    #[derive(Debug, PartialEq)]
    struct CaptureTestError;

    #[test]
    fn reader_sees_latest_published_frame() {
        let (pool, mut writer) = FramePool::with_writer(3, 4, 4);
        for v in 1..=5u8 {
            writer.publish_with(fill_bytes(v)).unwrap();
        }
        let (value, seq) = pool.wait_latest(0, |frame, seq| (frame.data[0], seq));
        assert_eq!(value, 5);
        assert_eq!(seq, 5);
    }

    #[test]
    fn wait_honors_min_sequence() {
        let (pool, mut writer) = FramePool::with_writer(2, 2, 2);
        writer.publish_with(fill_bytes(1)).unwrap();

        let reader = {
            let pool = pool.clone();
            thread::spawn(move || pool.wait_latest(3, |frame, seq| (frame.data[0], seq)))
        };

        writer.publish_with(fill_bytes(2)).unwrap();
        writer.publish_with(fill_bytes(3)).unwrap();
        let (value, seq) = reader.join().unwrap();
        assert!(seq >= 3);
        assert_eq!(value, 3);
    }

    #[test]
    fn sequence_numbers_never_decrease_for_a_polling_reader() {
        let (pool, mut writer) = FramePool::with_writer(3, 2, 2);
        let producer = thread::spawn(move || {
            for v in 1..=40u8 {
                writer.publish_with(fill_bytes(v)).unwrap();
            }
        });

        let mut last = 0u64;
        while last < 40 {
            let seq = pool.wait_latest(last + 1, |_, seq| seq);
            assert!(seq > last, "sequence went {last} -> {seq}");
            last = seq;
        }
        producer.join().unwrap();
    }

    #[test]
    fn failed_fill_leaves_active_frame_untouched() {
        let (pool, mut writer) = FramePool::with_writer(3, 2, 2);
        writer.publish_with(fill_bytes(7)).unwrap();

        let result = writer.publish_with(|frame| {
            frame.data.fill(9); // partial write into a non-active slot
            Err::<(), _>(CaptureTestError)
        });
        assert_eq!(result, Err(CaptureTestError));

        let (value, seq) = pool.wait_latest(0, |frame, seq| (frame.data[0], seq));
        assert_eq!(value, 7, "failed capture must not replace the active frame");
        assert_eq!(seq, 1, "failed capture must not advance the sequence");
    }

    #[test]
    fn timeout_expires_when_no_frame_qualifies() {
        let (pool, mut writer) = FramePool::with_writer(2, 2, 2);
        writer.publish_with(fill_bytes(1)).unwrap();
        let got = pool.wait_latest_timeout(10, Duration::from_millis(20), |_, seq| seq);
        assert_eq!(got, None);
    }

    #[test]
    fn latest_jpeg_returns_decodable_bytes() {
        let (pool, mut writer) = FramePool::with_writer(2, 8, 6);
        writer.publish_with(fill_bytes(128)).unwrap();
        let (bytes, seq) = pool.latest_jpeg(1, 90).expect("encode");
        assert_eq!(seq, 1);
        let decoded = image::load_from_memory(&bytes).expect("valid jpeg");
        assert_eq!(decoded.width(), 8);
        assert_eq!(decoded.height(), 6);
    }
}
