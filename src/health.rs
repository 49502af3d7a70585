//! Liveness tracking shared by the reader task and callers

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tokio::time::{Duration, Instant};

use crate::types::{ConnectionState, HealthRecord, StreamInfo};

/// Health monitor for one capture client.
///
/// The current [`HealthRecord`] lives in a watch channel: the reader task
/// replaces it as a whole and readers clone it out, so queries never see a
/// half-updated record and never block the reader.
#[derive(Debug)]
pub struct HealthMonitor {
    record: watch::Sender<HealthRecord>,
    stale_timeout: Duration,
    disconnect_requested: AtomicBool,
}

impl HealthMonitor {
    pub fn new(stale_timeout: Duration) -> Self {
        let (record, _) = watch::channel(HealthRecord::new(Instant::now()));
        Self { record, stale_timeout, disconnect_requested: AtomicBool::new(false) }
    }

    pub fn stale_timeout(&self) -> Duration {
        self.stale_timeout
    }

    /// Copy of the current record
    pub fn snapshot(&self) -> HealthRecord {
        self.record.borrow().clone()
    }

    /// Receiver that observes every published record
    pub fn subscribe(&self) -> watch::Receiver<HealthRecord> {
        self.record.subscribe()
    }

    /// Connected and a frame arrived within the stale timeout
    pub fn is_active(&self) -> bool {
        self.is_active_at(Instant::now())
    }

    pub fn is_active_at(&self, now: Instant) -> bool {
        let record = self.record.borrow();
        record.is_connected() && record.frame_age(now) < self.stale_timeout
    }

    /// How long the stream has gone without frames, if that exceeds the stale timeout
    pub fn stale_for(&self, now: Instant) -> Option<Duration> {
        let age = self.record.borrow().frame_age(now);
        (age > self.stale_timeout).then_some(age)
    }

    /// Stream information, or `None` while disconnected
    pub fn info(&self) -> Option<StreamInfo> {
        self.info_at(Instant::now())
    }

    pub fn info_at(&self, now: Instant) -> Option<StreamInfo> {
        let record = self.record.borrow();
        record.is_connected().then(|| StreamInfo::from_record(&record, now))
    }

    /// Report the stream as dead from the consumer side.
    ///
    /// The record shows `Disconnected` immediately; the reader applies the
    /// request to the connection at the start of its next iteration.
    pub fn request_disconnect(&self) {
        self.disconnect_requested.store(true, Ordering::Release);
        self.record.send_modify(|record| record.state = ConnectionState::Disconnected);
    }

    /// Check staleness at `now` from the consumer side.
    ///
    /// Returns how long the stream has been silent if that exceeds the stale
    /// timeout. A stale but still connected record is flipped to `Disconnected`
    /// and a disconnect request is queued for the reader, all under one update
    /// so a reconnection racing with the check is never torn down.
    pub fn report_stale(&self, now: Instant) -> Option<Duration> {
        let mut stale = None;
        self.record.send_if_modified(|record| {
            let age = record.frame_age(now);
            if age <= self.stale_timeout {
                return false;
            }
            stale = Some(age);
            if !record.is_connected() {
                return false;
            }
            self.disconnect_requested.store(true, Ordering::Release);
            record.state = ConnectionState::Disconnected;
            true
        });
        stale
    }

    /// Consume a pending disconnect request
    pub(crate) fn take_disconnect_request(&self) -> bool {
        self.disconnect_requested.swap(false, Ordering::AcqRel)
    }

    /// Mutate the record in place and notify subscribers
    pub(crate) fn update<F>(&self, modify: F)
    where
        F: FnOnce(&mut HealthRecord),
    {
        self.record.send_modify(modify);
    }

    /// Stamp a successfully read frame
    pub(crate) fn record_frame(&self, now: Instant) {
        self.record.send_modify(|record| {
            record.last_frame_at = now;
            record.consecutive_failures = 0;
            record.frames_received += 1;
        });
    }
}
