//! Error types for SimCapture
//!
//! Every fallible operation in the core returns [`CaptureResult`]. Errors are
//! surfaced to the immediate caller and never retried internally.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for capture operations
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Destination or session name cannot be used as a file name
    #[error("invalid destination name {0:?}")]
    InvalidName(String),

    /// Record is missing a field or a field is out of range
    #[error("invalid record field: {0}")]
    InvalidField(String),

    /// Operation attempted after the logger was closed
    #[error("logger '{0}' is closed")]
    LoggerClosed(String),

    /// Destination could not be opened, written or read
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A destination name matches files in more than one format
    #[error("destination '{0}' exists in several formats ({1}); pick one")]
    AmbiguousDestination(String, String),

    /// Encoding or decoding of a record failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias used throughout the crate
pub type CaptureResult<T> = Result<T, CaptureError>;

impl CaptureError {
    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CaptureError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that leave buffered data intact and may succeed on retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, CaptureError::Io { .. })
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for CaptureError {
    fn from(err: serde_json::Error) -> Self {
        CaptureError::Serialization(format!("json: {}", err))
    }
}

impl From<bincode::Error> for CaptureError {
    fn from(err: bincode::Error) -> Self {
        CaptureError::Serialization(format!("bincode: {}", err))
    }
}

impl From<serde_yaml::Error> for CaptureError {
    fn from(err: serde_yaml::Error) -> Self {
        CaptureError::Config(format!("yaml: {}", err))
    }
}
