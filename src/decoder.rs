//! Decoder trait for video stream backends

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{Frame, StreamEndpoint};
use crate::Result;

/// Preferred network transport for the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportProtocol {
    /// Interleaved over the control connection; survives lossy networks
    #[default]
    Tcp,

    /// Separate datagram channel; lower latency, drops under loss
    Udp,
}

/// Tuning applied by the decoder when opening a stream
#[derive(Debug, Clone, PartialEq)]
pub struct TransportOptions {
    /// Frames the decoder may buffer internally (keep minimal for low latency)
    pub buffer_frames: usize,

    /// Upper bound on how long an open may take
    pub open_timeout: Duration,

    /// Preferred transport
    pub protocol: TransportProtocol,

    /// Expected codec, e.g. `H264`
    pub codec_hint: Option<String>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            buffer_frames: 1,
            open_timeout: Duration::from_secs(30),
            protocol: TransportProtocol::Tcp,
            codec_hint: Some(crate::config::DEFAULT_CODEC_HINT.to_string()),
        }
    }
}

/// Stream properties a decoder can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamProperty {
    Fps,
    FrameWidth,
    FrameHeight,
}

/// Trait for video stream backends
///
/// A decoder owns the native stream handle. It is driven exclusively by the
/// background reader, so implementations need `Send` but not `Sync`.
///
/// Backends wrapping blocking native libraries should move the blocking calls
/// onto `tokio::task::spawn_blocking` so the reader stays cancellable.
#[async_trait::async_trait]
pub trait Decoder: Send + 'static {
    /// Open the stream, replacing any handle that is already open
    ///
    /// Returns [`CaptureError::Connect`](crate::CaptureError::Connect) if the
    /// endpoint cannot be opened.
    async fn open(&mut self, endpoint: &StreamEndpoint, options: &TransportOptions) -> Result<()>;

    /// Read the next decoded frame
    ///
    /// Returns:
    /// - `Ok(Some(frame))` - A new frame was decoded
    /// - `Ok(None)` - No frame was available this time
    /// - `Err(CaptureError::Read)` - A transient read failure
    /// - `Err(_)` - Anything else is treated as a broken connection
    async fn read_frame(&mut self) -> Result<Option<Frame>>;

    /// Query a stream property; `None` when the backend does not know it
    fn property(&self, property: StreamProperty) -> Option<f64>;

    /// Whether a stream handle is currently open
    fn is_open(&self) -> bool;

    /// Release the stream handle. Must be safe to call when nothing is open.
    async fn close(&mut self) -> Result<()>;
}
