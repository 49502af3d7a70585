//! Connection state machine states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the stream connection.
///
/// Only the connection manager (driven by the background reader) moves
/// between states; everyone else observes them through health snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No open stream handle
    #[default]
    Disconnected,

    /// An open attempt is in flight
    Connecting,

    /// The stream is open and frames can be read
    Connected,
}

impl ConnectionState {
    /// Whether frames can be read in this state
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}
