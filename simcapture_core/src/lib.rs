//! # SimCapture Core
//!
//! Buffered, append-only capture of simulation observations.
//!
//! - **Records**: immutable, validated observations ([`CapturedRecord`])
//! - **Logger**: buffers records and appends them to a named destination on demand ([`RecordLogger`])
//! - **Config**: where destinations live (`<base_dir>/<attempt_id>/<name>.<ext>`)
//! - **Sessions**: discovery and cleanup of captured attempts ([`CaptureStore`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use simcapture_core::{CaptureConfig, CapturedRecord, RecordLogger, Vector3};
//!
//! let config = CaptureConfig::default();
//! println!("{}", config.display_location());
//!
//! let logger = RecordLogger::with_config("DataCapture", &config)?;
//! let position = CapturedRecord::position(Vector3::new(0.0, 1.0, 2.0), "ExampleObjectName")?;
//! logger.submit(position)?;
//! logger.flush_all()?;
//! # Ok::<(), simcapture_core::CaptureError>(())
//! ```

pub mod config;
pub mod error;
pub mod logger;
pub mod messages;
pub mod record;
pub mod session;

// Re-export commonly used types for easy access
pub use config::CaptureConfig;
pub use error::{CaptureError, CaptureResult};
pub use logger::{validate_name, LoggerState, RecordLogger};
pub use messages::{LogSummary, Quaternion, Vector3};
pub use record::{decode_all, CapturedRecord, RecordData, RecordFormat};
pub use session::{read_destination, CaptureStore, DestinationInfo};
