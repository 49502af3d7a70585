//! Error types for stream capture.
//!
//! Every failure the capture client can encounter is described by [`CaptureError`].
//! Most of them never reach callers: the background reader absorbs connection and
//! read failures and turns them into state transitions. Callers see errors only
//! from construction (bad configuration) and from the lower-level building blocks
//! ([`FrameBuffer`](crate::FrameBuffer), [`Decoder`](crate::Decoder)).
//!
//! ## Error Categories
//!
//! - **Connect**: the decoder could not open the endpoint
//! - **Read**: a transient frame read failure, retried in place
//! - **StaleStream**: no frame arrived within the stale timeout
//! - **BufferFull / TakeTimeout**: hand-off between reader and consumer timed out
//! - **Config / File / Parse**: configuration could not be loaded or is invalid
//! - **Decoder**: the decoder backend failed in an unexpected way
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use freshframe::CaptureError;
//!
//! let error = CaptureError::connect_failed("rtsp://camera.local/stream", "connection refused");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for capture operations.
pub type Result<T, E = CaptureError> = std::result::Result<T, E>;

/// Main error type for capture operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CaptureError {
    #[error("Failed to connect to {endpoint}: {reason}")]
    Connect {
        endpoint: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Frame read failed: {reason}")]
    Read { reason: String },

    #[error("No frame received for {elapsed:?} (stale timeout {timeout:?})")]
    StaleStream { elapsed: Duration, timeout: Duration },

    #[error("Frame buffer busy for {waited:?}, frame dropped")]
    BufferFull { waited: Duration },

    #[error("No frame available after {waited:?}")]
    TakeTimeout { waited: Duration },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Config file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Decoder error during {operation}")]
    Decoder {
        operation: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Capture client has been released")]
    Released,
}

impl CaptureError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            CaptureError::Connect { .. } => true,
            CaptureError::Read { .. } => true,
            CaptureError::StaleStream { .. } => true,
            CaptureError::BufferFull { .. } => true,
            CaptureError::TakeTimeout { .. } => true,
            CaptureError::Decoder { .. } => true,
            CaptureError::Config { .. } => false,
            CaptureError::File { .. } => false,
            CaptureError::Parse { .. } => false,
            CaptureError::Released => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            CaptureError::Connect { .. } => vec![
                "Check the camera is powered and reachable on the network",
                "Verify the endpoint URL, port and credentials",
                "Confirm the transport (TCP/UDP) is allowed by firewalls",
            ],
            CaptureError::Read { .. } => vec![
                "Check network stability between client and camera",
                "Lower the stream bitrate or resolution on the camera",
            ],
            CaptureError::StaleStream { .. } => vec![
                "Check whether the camera stopped streaming",
                "Increase the stale timeout for slow or bursty sources",
            ],
            CaptureError::BufferFull { .. } => vec![
                "Consume frames faster or accept dropped frames",
                "Check for a consumer holding the buffer lock",
            ],
            CaptureError::TakeTimeout { .. } => vec![
                "Check whether the stream is connected",
                "Retry the read later",
            ],
            CaptureError::Config { .. } => vec![
                "Check configuration values against their documented ranges",
                "Provide a non-empty endpoint",
            ],
            CaptureError::File { .. } => vec![
                "Check the config file exists and is readable",
                "Check file permissions",
            ],
            CaptureError::Parse { .. } => vec![
                "Check the config file is valid YAML",
                "Check environment overrides hold numeric values",
            ],
            CaptureError::Decoder { .. } => vec![
                "Check the decoder backend is installed and supports the stream codec",
                "Restart the capture client",
            ],
            CaptureError::Released => vec!["Create a new capture client"],
        }
    }

    /// Helper constructor for connection errors.
    pub fn connect_failed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        CaptureError::Connect { endpoint: endpoint.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connect_failed_with_source(
        endpoint: impl Into<String>,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        CaptureError::Connect {
            endpoint: endpoint.into(),
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// Helper constructor for transient read errors.
    pub fn read_failed(reason: impl Into<String>) -> Self {
        CaptureError::Read { reason: reason.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        CaptureError::Config { reason: reason.into() }
    }

    /// Helper constructor for config file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        CaptureError::File { path, source }
    }

    /// Helper constructor for unexpected decoder failures.
    pub fn decoder(operation: impl Into<String>) -> Self {
        CaptureError::Decoder { operation: operation.into(), source: None }
    }

    /// Helper constructor for unexpected decoder failures with source.
    pub fn decoder_with_source(
        operation: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        CaptureError::Decoder { operation: operation.into(), source: Some(source) }
    }

    /// Whether the reader loop should count this as an in-place read failure
    /// rather than an unexpected error.
    pub(crate) fn is_transient_read(&self) -> bool {
        matches!(self, CaptureError::Read { .. })
    }
}

impl From<serde_yaml_ng::Error> for CaptureError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        CaptureError::Parse { context: "capture config".to_string(), details: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            endpoint in "[a-z]{1,12}://[a-z0-9.]{1,20}",
            reason in ".*",
            waited_ms in 1u64..60_000u64,
          ) {
            let connect = CaptureError::connect_failed(endpoint.clone(), reason.clone());
            let msg = connect.to_string();
            prop_assert!(msg.contains(&endpoint));
            prop_assert!(msg.contains(&reason));

            let read = CaptureError::read_failed(reason.clone());
            prop_assert!(read.to_string().contains(&reason));

            let waited = Duration::from_millis(waited_ms);
            let full = CaptureError::BufferFull { waited };
            let timeout = CaptureError::TakeTimeout { waited };
            let waited_text = format!("{:?}", waited);
            prop_assert!(full.to_string().contains(&waited_text));
            prop_assert!(timeout.to_string().contains(&waited_text));
          }

          #[test]
          fn source_chain_is_preserved(base_message in ".+") {
            let source: Box<dyn std::error::Error + Send + Sync> =
              Box::new(std::io::Error::other(base_message.clone()));
            let error = CaptureError::connect_failed_with_source("stub://cam", "open", source);

            let inner = std::error::Error::source(&error).map(|s| s.to_string());
            prop_assert_eq!(inner, Some(base_message));
          }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<CaptureError>();

        let error = CaptureError::read_failed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retry_classification() {
        assert!(CaptureError::connect_failed("stub://cam", "refused").is_retryable());
        assert!(CaptureError::read_failed("eof").is_retryable());
        assert!(CaptureError::TakeTimeout { waited: Duration::from_secs(5) }.is_retryable());
        assert!(!CaptureError::config("empty endpoint").is_retryable());
        assert!(!CaptureError::Released.is_retryable());

        assert!(CaptureError::read_failed("eof").is_transient_read());
        assert!(!CaptureError::decoder("read_frame").is_transient_read());
    }

    #[test]
    fn every_variant_has_suggestions() {
        let errors = [
            CaptureError::connect_failed("stub://cam", "refused"),
            CaptureError::read_failed("eof"),
            CaptureError::StaleStream {
                elapsed: Duration::from_secs(31),
                timeout: Duration::from_secs(30),
            },
            CaptureError::BufferFull { waited: Duration::from_millis(100) },
            CaptureError::TakeTimeout { waited: Duration::from_secs(5) },
            CaptureError::config("bad"),
            CaptureError::file_error(
                PathBuf::from("/missing.yaml"),
                std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            ),
            CaptureError::Parse { context: "x".into(), details: "y".into() },
            CaptureError::decoder("open"),
            CaptureError::Released,
        ];

        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "no suggestions for {error}");
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn yaml_errors_convert_to_parse() {
        let err = serde_yaml_ng::from_str::<u32>("not: [a number").unwrap_err();
        let converted: CaptureError = err.into();
        assert!(matches!(converted, CaptureError::Parse { .. }));
    }
}
