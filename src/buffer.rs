//! Latest-frame hand-off between the reader task and consumers
//!
//! The buffer is a mailbox, not a queue: every publish throws away whatever is
//! still waiting, so a consumer always gets the newest frame and a slow
//! consumer never makes the reader fall behind.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, Notify};
use tokio::time::{Duration, Instant, timeout, timeout_at};
use tracing::{trace, warn};

use crate::types::Frame;
use crate::{CaptureError, Result};

/// How long a publish may wait for the buffer before the frame is dropped
pub const PUBLISH_TIMEOUT: Duration = Duration::from_millis(100);

/// Default wait for [`FrameBuffer::take`] callers
pub const DEFAULT_TAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Counters describing what happened to published frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameBufferStats {
    /// Frames inserted into the buffer
    pub published: u64,
    /// Frames thrown away unread because a newer one arrived
    pub discarded: u64,
    /// Frames dropped because the buffer could not be locked in time
    pub dropped: u64,
    /// Frames handed to consumers
    pub taken: u64,
}

/// Bounded latest-value hand-off slot.
#[derive(Debug)]
pub struct FrameBuffer {
    slots: Mutex<VecDeque<Frame>>,
    capacity: usize,
    available: Notify,
    published: AtomicU64,
    discarded: AtomicU64,
    dropped: AtomicU64,
    taken: AtomicU64,
}

impl FrameBuffer {
    /// Create a buffer; a capacity of zero is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            available: Notify::new(),
            published: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            taken: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replace any waiting frames with `frame`, giving up after [`PUBLISH_TIMEOUT`]
    pub async fn publish(&self, frame: Frame) -> Result<()> {
        self.publish_within(frame, PUBLISH_TIMEOUT).await
    }

    /// Replace any waiting frames with `frame`, giving up after `wait`.
    ///
    /// On timeout the frame is dropped and [`CaptureError::BufferFull`] is returned.
    pub async fn publish_within(&self, frame: Frame, wait: Duration) -> Result<()> {
        let Ok(mut slots) = timeout(wait, self.slots.lock()).await else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(sequence = frame.sequence, "Frame buffer busy, dropping frame");
            return Err(CaptureError::BufferFull { waited: wait });
        };

        let stale = slots.len() as u64;
        slots.clear();
        slots.push_back(frame);
        drop(slots);

        if stale > 0 {
            self.discarded.fetch_add(stale, Ordering::Relaxed);
            trace!("Discarded {} stale frame(s)", stale);
        }
        self.published.fetch_add(1, Ordering::Relaxed);
        self.available.notify_one();
        Ok(())
    }

    /// Wait up to `wait` for a frame.
    ///
    /// Returns [`CaptureError::TakeTimeout`] if nothing is published in time.
    pub async fn take(&self, wait: Duration) -> Result<Frame> {
        let deadline = Instant::now() + wait;
        loop {
            // Register interest before checking so a publish in between is not missed
            let notified = self.available.notified();

            let Ok(mut slots) = timeout_at(deadline, self.slots.lock()).await else {
                return Err(CaptureError::TakeTimeout { waited: wait });
            };
            if let Some(frame) = slots.pop_front() {
                drop(slots);
                self.taken.fetch_add(1, Ordering::Relaxed);
                return Ok(frame);
            }
            drop(slots);

            if timeout_at(deadline, notified).await.is_err() {
                return Err(CaptureError::TakeTimeout { waited: wait });
            }
        }
    }

    /// Take a frame only if one is waiting and the buffer is not busy
    pub fn try_take(&self) -> Option<Frame> {
        let frame = self.slots.try_lock().ok()?.pop_front()?;
        self.taken.fetch_add(1, Ordering::Relaxed);
        Some(frame)
    }

    /// Number of waiting frames (0 while the buffer is busy)
    pub fn len(&self) -> usize {
        self.slots.try_lock().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard any waiting frames
    pub async fn clear(&self) {
        let cleared = {
            let mut slots = self.slots.lock().await;
            let cleared = slots.len() as u64;
            slots.clear();
            cleared
        };
        self.discarded.fetch_add(cleared, Ordering::Relaxed);
    }

    pub fn stats(&self) -> FrameBufferStats {
        FrameBufferStats {
            published: self.published.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            taken: self.taken.load(Ordering::Relaxed),
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(1)
    }
}
