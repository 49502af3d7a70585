//! Driver spawns and runs the background stream reader
//!
//! The reader owns the [`ConnectionManager`] and is the only writer of connection
//! state. It never ends on its own: read hiccups are retried in place, sustained
//! failure escalates to reconnection, and reconnection is retried forever at a
//! throttled pace. Only cancellation stops it.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::buffer::FrameBuffer;
use crate::connection::{ConnectionManager, ReconnectOutcome};
use crate::decoder::Decoder;
use crate::health::HealthMonitor;
use crate::types::Frame;
use crate::Result;

/// Consecutive read failures that force a reconnection
pub const MAX_CONSECUTIVE_FAILURES: u32 = 10;

/// Pause between in-place read retries
pub const READ_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Handle to a spawned reader task
pub struct DriverHandle {
    /// The reader task
    pub task: JoinHandle<()>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

/// Driver spawns and manages the stream reader task
pub struct Driver;

impl Driver {
    /// Spawn the reader for an already constructed connection manager
    pub fn spawn<D>(
        manager: ConnectionManager<D>,
        buffer: Arc<FrameBuffer>,
        health: Arc<HealthMonitor>,
    ) -> DriverHandle
    where
        D: Decoder,
    {
        let cancel = CancellationToken::new();
        let reader = StreamReader {
            manager,
            buffer,
            health,
            cancel: cancel.clone(),
            consecutive_failures: 0,
            frame_count: 0,
        };

        let task = tokio::spawn(reader.run());
        DriverHandle { task, cancel }
    }
}

enum Step {
    Continue,
    Cancelled,
}

struct StreamReader<D> {
    manager: ConnectionManager<D>,
    buffer: Arc<FrameBuffer>,
    health: Arc<HealthMonitor>,
    cancel: CancellationToken,
    consecutive_failures: u32,
    frame_count: u64,
}

impl<D: Decoder> StreamReader<D> {
    async fn run(mut self) {
        info!(endpoint = %self.manager.endpoint(), "Stream reader started");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            // Decoder panics are contained here the same way as errors
            let failure = match AssertUnwindSafe(self.step()).catch_unwind().await {
                Ok(Ok(Step::Continue)) => continue,
                Ok(Ok(Step::Cancelled)) => break,
                Ok(Err(e)) => e.to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            };

            error!("Unexpected error in stream reader: {}", failure);
            self.set_failures(0);
            self.manager.mark_disconnected();
            if !pause(&self.cancel, self.manager.reconnect_delay()).await {
                break;
            }
        }

        self.manager.disconnect().await;
        info!("Stream reader stopped (read {} frames)", self.frame_count);
    }

    async fn step(&mut self) -> Result<Step> {
        if self.health.take_disconnect_request() && self.manager.is_connected() {
            warn!("Stream reported stale, forcing reconnection");
            self.manager.mark_disconnected();
        }

        if !self.manager.is_connected() {
            return Ok(self.reconnect().await);
        }

        let result = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(Step::Cancelled),
            result = self.manager.read_frame() => result,
        };

        match result {
            Ok(Some(frame)) => {
                self.on_frame(frame).await;
                Ok(Step::Continue)
            }
            Ok(None) => Ok(self.on_read_failure("no frame returned").await),
            Err(e) if e.is_transient_read() => Ok(self.on_read_failure(&e.to_string()).await),
            Err(e) => Err(e),
        }
    }

    async fn reconnect(&mut self) -> Step {
        let outcome = tokio::select! {
            _ = self.cancel.cancelled() => return Step::Cancelled,
            outcome = self.manager.reconnect() => outcome,
        };

        match outcome {
            ReconnectOutcome::Connected => {
                self.set_failures(0);
                Step::Continue
            }
            ReconnectOutcome::Failed => Step::Continue,
            ReconnectOutcome::Exhausted => {
                // Throttle, then start another cycle; the reader never gives up
                if !pause(&self.cancel, self.manager.reconnect_delay()).await {
                    return Step::Cancelled;
                }
                self.manager.reset_retry_cycle();
                Step::Continue
            }
        }
    }

    async fn on_frame(&mut self, frame: Frame) {
        self.frame_count += 1;
        self.consecutive_failures = 0;
        self.health.record_frame(Instant::now());

        trace!("Frame {}: sequence={}, {} bytes", self.frame_count, frame.sequence, frame.len());

        if let Err(e) = self.buffer.publish(frame).await {
            debug!("Frame not published: {}", e);
        }
    }

    async fn on_read_failure(&mut self, reason: &str) -> Step {
        let failures = self.consecutive_failures + 1;
        warn!(failures, "Failed to read frame: {}", reason);

        if failures >= MAX_CONSECUTIVE_FAILURES {
            error!("Too many consecutive frame read failures, attempting reconnection");
            self.manager.mark_disconnected();
            self.set_failures(0);
            return Step::Continue;
        }

        self.set_failures(failures);
        if pause(&self.cancel, READ_RETRY_INTERVAL).await { Step::Continue } else { Step::Cancelled }
    }

    fn set_failures(&mut self, failures: u32) {
        self.consecutive_failures = failures;
        self.health.update(|record| record.consecutive_failures = failures);
    }
}

/// Sleep unless cancelled first; returns false on cancellation
async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("decoder panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("decoder panicked: {}", message)
    } else {
        "decoder panicked".to_string()
    }
}
