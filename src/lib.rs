//! Resilient, low-latency video stream capture.
//!
//! freshframe keeps a live video source connected and hands callers the newest
//! decoded frame. A background reader pulls frames continuously, absorbs read
//! hiccups, reconnects broken streams with a bounded retry cycle, and detects
//! streams that silently stop producing frames.
//!
//! # Features
//!
//! - **Freshness over completeness**: a single-slot buffer keeps only the latest frame
//! - **Self-healing**: transient failures are retried, dead streams are reopened forever
//! - **Liveness**: `is_active()` and `info()` answer from a snapshot, never from the network
//! - **Pluggable backends**: anything implementing [`Decoder`] can be captured
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use freshframe::{CaptureConfig, VideoCapture};
//! use freshframe::decoders::SyntheticDecoder;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> freshframe::Result<()> {
//!     let config = CaptureConfig::new("stub://front-door")
//!         .with_max_reconnect_attempts(5)
//!         .with_stale_timeout(std::time::Duration::from_secs(30));
//!
//!     let capture = VideoCapture::connect(config, SyntheticDecoder::default()).await?;
//!     let mut frames = Box::pin(capture.frames());
//!
//!     while let Some(frame) = frames.next().await {
//!         println!("frame #{} ({} bytes)", frame.sequence, frame.len());
//!         if frame.sequence >= 100 {
//!             break;
//!         }
//!     }
//!
//!     capture.release().await;
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Capture pipeline
pub mod buffer;
pub mod capture;
pub mod connection;
pub mod decoder;
pub mod decoders;
pub mod driver;
pub mod health;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use buffer::{FrameBuffer, FrameBufferStats};
pub use capture::VideoCapture;
pub use config::{CaptureConfig, TransportConfig};
pub use connection::{ConnectionManager, ReconnectOutcome};
pub use decoder::{Decoder, StreamProperty, TransportOptions, TransportProtocol};
pub use health::HealthMonitor;
