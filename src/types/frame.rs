//! Decoded frame type handed from the reader to consumers

use std::sync::Arc;
use tokio::time::{Duration, Instant};

/// A decoded video frame.
///
/// This is the unit that flows from the decoder through the
/// [`FrameBuffer`](crate::FrameBuffer) to the caller. Pixel data is immutable and
/// shared via `Arc`, so handing a frame over never copies the image and no two
/// holders can mutate it.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Pixel data in the decoder's output layout (packed RGB for the bundled decoders)
    pub data: Arc<[u8]>,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Decoder-assigned sequence number, monotonic within one connection
    pub sequence: u64,

    /// When the frame was captured
    pub captured_at: Instant,
}

impl Frame {
    /// Create a new frame captured now
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self { data: data.into(), width, height, sequence, captured_at: Instant::now() }
    }

    /// Time elapsed since capture
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.captured_at)
    }

    /// Size of the pixel data in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the frame carries no pixel data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
