//! Synthetic decoder producing generated frames for `stub://` endpoints

use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::decoder::{Decoder, StreamProperty, TransportOptions};
use crate::types::{Frame, StreamEndpoint};
use crate::{CaptureError, Result};

/// Endpoint scheme handled by [`SyntheticDecoder`]
pub const SYNTHETIC_SCHEME: &str = "stub";

/// Shape and pacing of generated frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    pub fps: f64,

    /// After this many frames per connection, reads return `Ok(None)` until reopened
    pub stall_after: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self { width: 640, height: 480, fps: 25.0, stall_after: None }
    }
}

impl SyntheticConfig {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_stall_after(mut self, frames: u64) -> Self {
        self.stall_after = Some(frames);
        self
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.clamp(0.1, 1000.0))
    }
}

/// Decoder that paces RGB test-pattern frames at a fixed rate
#[derive(Debug)]
pub struct SyntheticDecoder {
    config: SyntheticConfig,
    interval: Option<Interval>,
    sequence: u64,
    frames_since_open: u64,
}

impl SyntheticDecoder {
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config, interval: None, sequence: 0, frames_since_open: 0 }
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    /// Frames generated over the decoder's lifetime
    pub fn frames_generated(&self) -> u64 {
        self.sequence
    }

    fn render(&self, sequence: u64) -> Vec<u8> {
        let (width, height) = (self.config.width as usize, self.config.height as usize);
        let shift = sequence as usize;
        let mut data = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                data.push((x + shift) as u8);
                data.push((y + shift) as u8);
                data.push((x ^ y) as u8);
            }
        }
        data
    }
}

impl Default for SyntheticDecoder {
    fn default() -> Self {
        Self::new(SyntheticConfig::default())
    }
}

#[async_trait::async_trait]
impl Decoder for SyntheticDecoder {
    async fn open(&mut self, endpoint: &StreamEndpoint, options: &TransportOptions) -> Result<()> {
        if endpoint.scheme() != Some(SYNTHETIC_SCHEME) {
            return Err(CaptureError::connect_failed(
                endpoint.redacted(),
                format!("synthetic decoder only serves {}:// endpoints", SYNTHETIC_SCHEME),
            ));
        }
        if self.config.width == 0 || self.config.height == 0 {
            return Err(CaptureError::connect_failed(endpoint.redacted(), "frame size is zero"));
        }
        if !self.config.fps.is_finite() || self.config.fps <= 0.0 {
            return Err(CaptureError::connect_failed(
                endpoint.redacted(),
                format!("frame rate must be a positive number (got {})", self.config.fps),
            ));
        }

        let mut pacing = interval(self.config.frame_interval());
        pacing.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(pacing);
        self.frames_since_open = 0;

        info!(
            width = self.config.width,
            height = self.config.height,
            fps = self.config.fps,
            buffer_frames = options.buffer_frames,
            "Synthetic stream opened"
        );
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<Frame>> {
        let stalled = self.config.stall_after.is_some_and(|limit| self.frames_since_open >= limit);
        let Some(pacing) = self.interval.as_mut() else {
            return Err(CaptureError::read_failed("synthetic stream is not open"));
        };
        pacing.tick().await;

        if stalled {
            trace!("Synthetic stream stalled");
            return Ok(None);
        }

        self.sequence += 1;
        self.frames_since_open += 1;
        let data = self.render(self.sequence);
        Ok(Some(Frame::new(data, self.config.width, self.config.height, self.sequence)))
    }

    fn property(&self, property: StreamProperty) -> Option<f64> {
        self.interval.as_ref()?;
        match property {
            StreamProperty::Fps => Some(self.config.fps),
            StreamProperty::FrameWidth => Some(f64::from(self.config.width)),
            StreamProperty::FrameHeight => Some(f64::from(self.config.height)),
        }
    }

    fn is_open(&self) -> bool {
        self.interval.is_some()
    }

    async fn close(&mut self) -> Result<()> {
        if self.interval.take().is_some() {
            debug!("Synthetic stream closed after {} frames", self.sequence);
        }
        Ok(())
    }
}
