//! Buffered record logger
//!
//! A [`RecordLogger`] is bound to one named destination file. Records are
//! buffered in submission order by [`RecordLogger::submit`] and written in a
//! single append by [`RecordLogger::flush_all`]:
//!
//! ```rust,no_run
//! use simcapture_core::{CapturedRecord, RecordLogger};
//!
//! let logger = RecordLogger::create("DataCapture")?;
//! logger.submit(CapturedRecord::position([0.0, 1.0, 2.0], "ExampleObjectName")?)?;
//! logger.flush_all()?;
//! logger.close()?;
//! # Ok::<(), simcapture_core::CaptureError>(())
//! ```
//!
//! Guarantees:
//! - entries appear in the destination in submission order
//! - a record is written at most once; the buffer is cleared only after the
//!   whole batch reached the file
//! - a failed flush keeps the buffer and rolls the file back to its previous
//!   length, so a retry writes the same batch without duplicates

use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::messages::LogSummary;
use crate::record::{CapturedRecord, RecordFormat};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Longest accepted file name, in bytes. A destination name must also leave
/// room for its `.<ext>` suffix.
pub const MAX_NAME_LEN: usize = 255;

/// Characters that are not portable in file names
const RESERVED_CHARS: &[char] = &['/', '\\', '<', '>', ':', '"', '|', '?', '*'];

/// Lifecycle of a logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerState {
    /// Accepting submissions and flushes
    Open,
    /// Finalized; every further submission or flush fails
    Closed,
}

struct LoggerInner {
    pending: Vec<CapturedRecord>,
    state: LoggerState,
    flushed_total: u64,
}

/// Writes one encoded batch to an open destination
type BatchWriter = fn(&mut File, &[u8], bool) -> io::Result<()>;

/// Buffers records and appends them to a named destination on demand
pub struct RecordLogger {
    name: String,
    destination: PathBuf,
    format: RecordFormat,
    sync_on_flush: bool,
    writer: BatchWriter,
    inner: Mutex<LoggerInner>,
}

impl RecordLogger {
    /// Create a logger using the default configuration.
    ///
    /// Loggers created this way in one process share the same attempt
    /// directory, so two loggers with the same name append to one file.
    pub fn create(name: &str) -> CaptureResult<Self> {
        Self::with_config(name, &CaptureConfig::default())
    }

    /// Create a logger writing to `config.destination(name)`.
    ///
    /// Nothing is created on disk until the first non-empty flush. Fails with
    /// `InvalidName` if either the name or the attempt id cannot be used as a
    /// file name, or if `<name>.<ext>` is longer than [`MAX_NAME_LEN`].
    pub fn with_config(name: &str, config: &CaptureConfig) -> CaptureResult<Self> {
        validate_name(name)?;
        validate_name(&config.attempt_id)?;
        if name.len() + 1 + config.format.extension().len() > MAX_NAME_LEN {
            return Err(CaptureError::InvalidName(name.to_string()));
        }

        let destination = config.destination(name);
        log::info!(
            "capture logger '{}' bound to {}",
            name,
            destination.display()
        );

        Ok(Self {
            name: name.to_string(),
            destination,
            format: config.format,
            sync_on_flush: config.sync_on_flush,
            writer: write_batch,
            inner: Mutex::new(LoggerInner {
                pending: Vec::new(),
                state: LoggerState::Open,
                flushed_total: 0,
            }),
        })
    }

    /// Buffer one record. No I/O happens here.
    pub fn submit(&self, record: CapturedRecord) -> CaptureResult<()> {
        let mut inner = self.inner.lock();
        if inner.state == LoggerState::Closed {
            return Err(CaptureError::LoggerClosed(self.name.clone()));
        }

        log::debug!("[{}] submit {}", self.name, record.log_summary());
        inner.pending.push(record);
        Ok(())
    }

    /// Append every buffered record to the destination and clear the buffer.
    ///
    /// Returns the number of entries written; an empty buffer writes nothing
    /// and does not touch the filesystem.
    pub fn flush_all(&self) -> CaptureResult<usize> {
        let mut inner = self.inner.lock();
        if inner.state == LoggerState::Closed {
            return Err(CaptureError::LoggerClosed(self.name.clone()));
        }
        self.flush_locked(&mut inner)
    }

    /// Final flush, then stop accepting records.
    ///
    /// If the flush fails the logger stays open so the caller can retry.
    /// Closing an already closed logger is a no-op.
    pub fn close(&self) -> CaptureResult<usize> {
        let mut inner = self.inner.lock();
        if inner.state == LoggerState::Closed {
            return Ok(0);
        }

        let written = self.flush_locked(&mut inner)?;
        inner.state = LoggerState::Closed;
        log::info!(
            "capture logger '{}' closed after {} entries",
            self.name,
            inner.flushed_total
        );
        Ok(written)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn format(&self) -> RecordFormat {
        self.format
    }

    /// Number of records waiting for a flush
    pub fn pending(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn state(&self) -> LoggerState {
        self.inner.lock().state
    }

    pub fn is_closed(&self) -> bool {
        self.state() == LoggerState::Closed
    }

    /// Entries written by this logger so far
    pub fn flushed_total(&self) -> u64 {
        self.inner.lock().flushed_total
    }

    fn flush_locked(&self, inner: &mut LoggerInner) -> CaptureResult<usize> {
        if inner.pending.is_empty() {
            return Ok(0);
        }

        let mut batch = Vec::new();
        for record in &inner.pending {
            batch.extend(record.serialize(self.format)?);
        }

        if let Err(e) = self.append_batch(&batch) {
            log::warn!(
                "[{}] flush of {} records failed, keeping them buffered: {}",
                self.name,
                inner.pending.len(),
                e
            );
            return Err(e);
        }

        let written = inner.pending.len();
        inner.pending.clear();
        inner.flushed_total += written as u64;
        log::debug!(
            "[{}] flushed {} records ({} bytes) to {}",
            self.name,
            written,
            batch.len(),
            self.destination.display()
        );
        Ok(written)
    }

    fn append_batch(&self, batch: &[u8]) -> CaptureResult<()> {
        let path = &self.destination;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CaptureError::io(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| CaptureError::io(path, e))?;
        let previous_len = file
            .metadata()
            .map_err(|e| CaptureError::io(path, e))?
            .len();

        if let Err(e) = (self.writer)(&mut file, batch, self.sync_on_flush) {
            // Drop the partial tail so a retry does not duplicate entries
            if let Err(truncate_err) = file.set_len(previous_len) {
                log::warn!(
                    "[{}] could not roll back {} to {} bytes: {}",
                    self.name,
                    path.display(),
                    previous_len,
                    truncate_err
                );
            }
            return Err(CaptureError::io(path, e));
        }
        Ok(())
    }
}

fn write_batch(file: &mut File, batch: &[u8], sync: bool) -> io::Result<()> {
    file.write_all(batch)?;
    file.flush()?;
    if sync {
        file.sync_data()?;
    }
    Ok(())
}

impl Drop for RecordLogger {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if !inner.pending.is_empty() {
            log::warn!(
                "capture logger '{}' dropped with {} unflushed records for {}",
                self.name,
                inner.pending.len(),
                self.destination.display()
            );
        }
    }
}

impl std::fmt::Debug for RecordLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RecordLogger")
            .field("name", &self.name)
            .field("destination", &self.destination)
            .field("format", &self.format)
            .field("pending", &inner.pending.len())
            .field("state", &inner.state)
            .finish()
    }
}

/// Check that `name` can be used as a destination (or session) file name
pub fn validate_name(name: &str) -> CaptureResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.len() > MAX_NAME_LEN
        || name.ends_with(' ')
        || name.ends_with('.')
        || name
            .chars()
            .any(|c| c.is_control() || RESERVED_CHARS.contains(&c));

    if invalid {
        return Err(CaptureError::InvalidName(name.to_string()));
    }
    Ok(())
}
