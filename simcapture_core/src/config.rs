//! Capture configuration
//!
//! Resolves where destinations live on disk:
//! `<base_dir>/<attempt_id>/<name>.<ext>`.
//!
//! Values come from (lowest to highest precedence) built-in defaults, an
//! optional YAML file, and the `SIMCAPTURE_ATTEMPT_ID` environment variable.
//!
//! Without the variable, the default attempt id is a UUID generated once per
//! process, so every default-configured logger shares one session directory.

use crate::error::{CaptureError, CaptureResult};
use crate::logger::validate_name;
use crate::record::RecordFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name under the platform data directory
const DATA_DIR_NAME: &str = "simcapture";

/// Project-local configuration file picked up by [`CaptureConfig::discover`]
pub const CONFIG_FILE: &str = ".simcapture/config.yaml";

/// Environment variable overriding the attempt identifier
pub const ATTEMPT_ID_ENV: &str = "SIMCAPTURE_ATTEMPT_ID";

lazy_static::lazy_static! {
    /// Attempt id used when neither the environment nor a file names one
    static ref PROCESS_ATTEMPT_ID: String = uuid::Uuid::new_v4().to_string();
}

/// Where and how captured records are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Persistent storage root
    pub base_dir: PathBuf,
    /// Run/attempt identifier; names the session directory
    pub attempt_id: String,
    /// Entry encoding for new destinations
    pub format: RecordFormat,
    /// Call `sync_data` after every flush
    pub sync_on_flush: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            attempt_id: default_attempt_id(),
            format: RecordFormat::default(),
            sync_on_flush: true,
        }
    }
}

impl CaptureConfig {
    /// Load from a YAML file. A missing file yields the defaults.
    ///
    /// Fails with `Config` when the attempt id cannot name a session directory.
    pub fn load(path: &Path) -> CaptureResult<Self> {
        let mut config = if path.exists() {
            let yaml = std::fs::read_to_string(path).map_err(|e| CaptureError::io(path, e))?;
            let config: CaptureConfig = serde_yaml::from_str(&yaml).map_err(|e| {
                CaptureError::Config(format!("failed to parse {}: {}", path.display(), e))
            })?;
            log::debug!("loaded capture config from {}", path.display());
            config
        } else {
            log::debug!("no capture config at {}, using defaults", path.display());
            Self::default()
        };

        // The environment still wins over the file
        if let Some(id) = attempt_id_from_env() {
            config.attempt_id = id;
        }
        if config.attempt_id.trim().is_empty() {
            config.attempt_id = default_attempt_id();
        }

        validate_name(&config.attempt_id).map_err(|_| {
            CaptureError::Config(format!(
                "attempt id {:?} cannot be used as a session directory name",
                config.attempt_id
            ))
        })?;
        Ok(config)
    }

    /// Load `.simcapture/config.yaml` from the current directory if present
    pub fn discover() -> CaptureResult<Self> {
        Self::load(Path::new(CONFIG_FILE))
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_attempt_id(mut self, attempt_id: impl Into<String>) -> Self {
        self.attempt_id = attempt_id.into();
        self
    }

    pub fn with_format(mut self, format: RecordFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_sync_on_flush(mut self, sync: bool) -> Self {
        self.sync_on_flush = sync;
        self
    }

    /// Directory holding every destination of this attempt
    pub fn session_dir(&self) -> PathBuf {
        self.base_dir.join(&self.attempt_id)
    }

    /// File a destination named `name` is written to
    pub fn destination(&self, name: &str) -> PathBuf {
        self.session_dir()
            .join(format!("{}.{}", name, self.format.extension()))
    }

    /// Location announced to the user before capturing
    pub fn display_location(&self) -> String {
        format!("{}/{}", self.base_dir.display(), self.attempt_id)
    }

    /// Write this configuration as YAML, creating parent directories
    pub fn save(&self, path: &Path) -> CaptureResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CaptureError::io(parent, e))?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml).map_err(|e| CaptureError::io(path, e))
    }
}

fn default_base_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

fn attempt_id_from_env() -> Option<String> {
    std::env::var(ATTEMPT_ID_ENV)
        .ok()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

fn default_attempt_id() -> String {
    attempt_id_from_env().unwrap_or_else(|| PROCESS_ATTEMPT_ID.clone())
}
