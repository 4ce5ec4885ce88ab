//! Discovery of captured sessions on disk
//!
//! Each attempt writes into its own directory under the base directory;
//! [`CaptureStore`] lists those sessions, reads destinations back, and
//! removes sessions that are no longer needed.

use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::logger::validate_name;
use crate::record::{decode_all, CapturedRecord, RecordFormat};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One capture file inside a session
#[derive(Debug, Clone)]
pub struct DestinationInfo {
    /// Destination name (file stem)
    pub name: String,
    pub path: PathBuf,
    pub format: RecordFormat,
    pub size_bytes: u64,
    pub modified: Option<SystemTime>,
}

/// Manager for session discovery
pub struct CaptureStore {
    base_dir: PathBuf,
}

impl CaptureStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(config.base_dir.clone())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// All session (attempt) directories, sorted by name
    pub fn list_sessions(&self) -> CaptureResult<Vec<String>> {
        let mut sessions = Vec::new();

        if self.base_dir.exists() {
            let entries = fs::read_dir(&self.base_dir).map_err(|e| self.io_err(e))?;
            for entry in entries {
                let entry = entry.map_err(|e| self.io_err(e))?;
                if entry.file_type().map_err(|e| self.io_err(e))?.is_dir() {
                    if let Some(name) = entry.file_name().to_str() {
                        sessions.push(name.to_string());
                    }
                }
            }
        }

        sessions.sort();
        Ok(sessions)
    }

    /// Capture files of a session, sorted by name
    pub fn destinations(&self, session: &str) -> CaptureResult<Vec<DestinationInfo>> {
        let session_dir = self.session_dir(session)?;
        let mut destinations = Vec::new();

        if !session_dir.exists() {
            return Ok(destinations);
        }

        let entries = fs::read_dir(&session_dir).map_err(|e| CaptureError::io(&session_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| CaptureError::io(&session_dir, e))?;
            let path = entry.path();
            let (Some(name), Some(format)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(RecordFormat::from_extension),
            ) else {
                continue;
            };

            let metadata = entry.metadata().map_err(|e| CaptureError::io(&path, e))?;
            if !metadata.is_file() {
                continue;
            }

            destinations.push(DestinationInfo {
                name: name.to_string(),
                format,
                size_bytes: metadata.len(),
                modified: metadata.modified().ok(),
                path,
            });
        }

        destinations.sort_by(|a, b| a.name.cmp(&b.name).then(a.path.cmp(&b.path)));
        Ok(destinations)
    }

    /// Find a destination by name within a session.
    ///
    /// With `format` set only that encoding is considered. Without it, a name
    /// present as both `.jsonl` and `.bin` fails with `AmbiguousDestination`.
    pub fn find_destination(
        &self,
        session: &str,
        name: &str,
        format: Option<RecordFormat>,
    ) -> CaptureResult<Option<DestinationInfo>> {
        validate_name(name)?;
        let mut matches: Vec<DestinationInfo> = self
            .destinations(session)?
            .into_iter()
            .filter(|d| d.name == name && format.map_or(true, |f| d.format == f))
            .collect();

        if matches.len() > 1 {
            let formats: Vec<String> = matches.iter().map(|d| d.format.to_string()).collect();
            return Err(CaptureError::AmbiguousDestination(
                name.to_string(),
                formats.join(", "),
            ));
        }
        Ok(matches.pop())
    }

    /// Read every record of a destination file in file order
    pub fn read_destination(&self, path: &Path) -> CaptureResult<Vec<CapturedRecord>> {
        read_destination(path)
    }

    /// Delete a session and all its destinations. Missing sessions are ignored.
    pub fn delete_session(&self, session: &str) -> CaptureResult<()> {
        let session_dir = self.session_dir(session)?;
        if session_dir.exists() {
            fs::remove_dir_all(&session_dir).map_err(|e| CaptureError::io(&session_dir, e))?;
            log::info!("deleted capture session {}", session_dir.display());
        }
        Ok(())
    }

    /// Total size of all capture files, in bytes
    pub fn total_size(&self) -> CaptureResult<u64> {
        let mut total = 0;
        for session in self.list_sessions()? {
            for destination in self.destinations(&session)? {
                total += destination.size_bytes;
            }
        }
        Ok(total)
    }

    fn session_dir(&self, session: &str) -> CaptureResult<PathBuf> {
        validate_name(session)?;
        Ok(self.base_dir.join(session))
    }

    fn io_err(&self, source: std::io::Error) -> CaptureError {
        CaptureError::io(&self.base_dir, source)
    }
}

/// Read a destination file, inferring the format from its extension
pub fn read_destination(path: &Path) -> CaptureResult<Vec<CapturedRecord>> {
    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(RecordFormat::from_extension)
        .ok_or_else(|| {
            CaptureError::Serialization(format!(
                "cannot infer record format of {}",
                path.display()
            ))
        })?;

    let bytes = fs::read(path).map_err(|e| CaptureError::io(path, e))?;
    decode_all(format, &bytes)
}
