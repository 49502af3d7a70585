//! Connection manager: owns the decoder handle and the reconnection policy
//!
//! The manager never loops on its own. Each call to [`ConnectionManager::reconnect`]
//! is exactly one attempt; the reader task decides what happens between attempts.

use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::CaptureConfig;
use crate::decoder::{Decoder, StreamProperty, TransportOptions};
use crate::health::HealthMonitor;
use crate::types::{ConnectionState, Frame, StreamEndpoint, StreamMetadata};
use crate::{CaptureError, Result};

#[cfg(test)]
mod tests;

/// Result of a single reconnection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectOutcome {
    /// The stream is open again
    Connected,
    /// The attempt was made and failed
    Failed,
    /// The retry cycle is used up; no attempt was made
    Exhausted,
}

/// Owns the stream handle and its connection state.
pub struct ConnectionManager<D> {
    decoder: D,
    endpoint: StreamEndpoint,
    options: TransportOptions,
    max_attempts: u32,
    reconnect_delay: Duration,
    state: ConnectionState,
    retry_count: u32,
    has_connected: bool,
    health: Arc<HealthMonitor>,
}

impl<D: Decoder> ConnectionManager<D> {
    /// Create a manager for a validated config. Nothing is opened yet.
    pub fn new(decoder: D, config: &CaptureConfig, health: Arc<HealthMonitor>) -> Self {
        Self {
            decoder,
            endpoint: config.stream_endpoint(),
            options: config.transport_options(),
            max_attempts: config.max_reconnect_attempts,
            reconnect_delay: config.reconnect_delay(),
            state: ConnectionState::Disconnected,
            retry_count: 0,
            has_connected: false,
            health,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    pub fn endpoint(&self) -> &StreamEndpoint {
        &self.endpoint
    }

    /// Open the stream, closing any existing handle first.
    ///
    /// Returns whether the stream is now connected.
    pub async fn connect(&mut self) -> bool {
        self.close_handle().await;
        self.set_state(ConnectionState::Connecting);

        info!(endpoint = %self.endpoint, "Attempting to connect to stream");
        match self.decoder.open(&self.endpoint, &self.options).await {
            Ok(()) => {
                let metadata = self.read_metadata();
                let reconnected = self.has_connected;
                self.has_connected = true;
                self.retry_count = 0;
                self.state = ConnectionState::Connected;
                self.health.update(|record| {
                    record.state = ConnectionState::Connected;
                    record.retry_count = 0;
                    record.consecutive_failures = 0;
                    record.last_frame_at = Instant::now();
                    record.metadata = metadata;
                    if reconnected {
                        record.reconnects += 1;
                    }
                });
                info!(
                    fps = metadata.fps,
                    width = metadata.width,
                    height = metadata.height,
                    "Stream connection established"
                );
                true
            }
            Err(e) => {
                error!("Failed to establish stream connection: {}", e);
                self.set_state(ConnectionState::Disconnected);
                false
            }
        }
    }

    /// One reconnection attempt: wait the reconnect delay, then connect.
    ///
    /// Skipped without waiting once the retry cycle is exhausted.
    pub async fn reconnect(&mut self) -> ReconnectOutcome {
        if self.retry_count >= self.max_attempts {
            error!("Maximum reconnection attempts ({}) reached", self.max_attempts);
            return ReconnectOutcome::Exhausted;
        }

        self.retry_count += 1;
        let attempt = self.retry_count;
        self.health.update(|record| record.retry_count = attempt);
        warn!(attempt, max_attempts = self.max_attempts, "Stream reconnection attempt");

        tokio::time::sleep(self.reconnect_delay).await;
        if self.connect().await { ReconnectOutcome::Connected } else { ReconnectOutcome::Failed }
    }

    /// Start a fresh retry cycle after an exhausted one
    pub fn reset_retry_cycle(&mut self) {
        self.retry_count = 0;
        self.health.update(|record| record.retry_count = 0);
    }

    /// Read one frame from the open stream
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        if !self.is_connected() {
            return Err(CaptureError::read_failed("stream is not connected"));
        }
        self.decoder.read_frame().await
    }

    /// Mark the connection broken without touching the handle.
    ///
    /// The next [`connect`](Self::connect) releases the old handle.
    pub fn mark_disconnected(&mut self) {
        self.set_state(ConnectionState::Disconnected);
    }

    /// Release the handle if one is open. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        self.close_handle().await;
        self.set_state(ConnectionState::Disconnected);
    }

    async fn close_handle(&mut self) {
        if !self.decoder.is_open() {
            return;
        }
        if let Err(e) = self.decoder.close().await {
            warn!("Error releasing stream handle: {}", e);
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        self.health.update(|record| record.state = state);
    }

    fn read_metadata(&self) -> StreamMetadata {
        let positive = |property| self.decoder.property(property).filter(|v| v.is_finite() && *v > 0.0);

        let metadata = StreamMetadata {
            fps: positive(StreamProperty::Fps),
            width: positive(StreamProperty::FrameWidth).map(|v| v as u32),
            height: positive(StreamProperty::FrameHeight).map(|v| v as u32),
        };
        if metadata.fps.is_none() || metadata.width.is_none() || metadata.height.is_none() {
            warn!("Stream properties incomplete: {:?}", metadata);
        }
        metadata
    }
}
