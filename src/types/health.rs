//! Health snapshot types shared between the reader and callers

use tokio::time::{Duration, Instant};

use super::ConnectionState;

/// Stream properties reported by the decoder after a successful open.
///
/// Every field is best-effort: decoders are free to leave any of them unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamMetadata {
    pub fps: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Complete health state of a capture client.
///
/// Written only by the background reader and published as a whole, so every
/// observer sees a consistent record.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthRecord {
    /// Connection state as last set by the connection manager
    pub state: ConnectionState,

    /// When the last frame was read (or the connection was opened)
    pub last_frame_at: Instant,

    /// Read failures since the last successful frame
    pub consecutive_failures: u32,

    /// Reconnection attempts in the current retry cycle
    pub retry_count: u32,

    /// Stream properties from the current connection
    pub metadata: StreamMetadata,

    /// Frames read since the client was created
    pub frames_received: u64,

    /// Successful connections after the first one
    pub reconnects: u64,
}

impl HealthRecord {
    /// A fresh, disconnected record stamped at `now`
    pub fn new(now: Instant) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            last_frame_at: now,
            consecutive_failures: 0,
            retry_count: 0,
            metadata: StreamMetadata::default(),
            frames_received: 0,
            reconnects: 0,
        }
    }

    /// Whether the connection is open
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Time since the last frame, as of `now`
    pub fn frame_age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_frame_at)
    }
}

/// Stream information returned by [`VideoCapture::info`](crate::VideoCapture::info).
///
/// Unknown metadata is reported as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub retry_count: u32,
    pub last_frame_at: Instant,
    pub last_frame_age: Duration,
    pub is_connected: bool,
}

impl StreamInfo {
    /// Build an info snapshot from a health record, substituting absent metadata
    pub fn from_record(record: &HealthRecord, now: Instant) -> Self {
        Self {
            fps: record.metadata.fps.unwrap_or(0.0),
            width: record.metadata.width.unwrap_or(0),
            height: record.metadata.height.unwrap_or(0),
            retry_count: record.retry_count,
            last_frame_at: record.last_frame_at,
            last_frame_age: record.frame_age(now),
            is_connected: record.is_connected(),
        }
    }
}
