//! Core types for stream capture.
//!
//! - [`Frame`] is a decoded image with zero-copy pixel data
//! - [`StreamEndpoint`] is the source address, logged with credentials masked
//! - [`ConnectionState`] tracks the connection lifecycle
//! - [`HealthRecord`] and [`StreamInfo`] describe liveness and stream properties

mod endpoint;
mod frame;
mod health;
mod state;

pub use endpoint::StreamEndpoint;
pub use frame::Frame;
pub use health::{HealthRecord, StreamInfo, StreamMetadata};
pub use state::ConnectionState;
