use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::domain::publish_policy::PublishPolicy;
use crate::shared::constants::{
    DEFAULT_MAX_LEN_MS, DEFAULT_MIN_LEN_MS, REMOTE_STT_MODEL_ID, REMOTE_STT_URL,
    WHISPER_MODEL_NAME, WHISPER_MODEL_URL,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Worker and front end tuning, stored as `settings.json` in the storage root.
///
/// Missing fields take their defaults, so an older file keeps loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scan_interval_ms: u64,
    pub relay_tick_ms: u64,
    pub await_tick_ms: u64,
    pub publish: PublishPolicy,
    pub min_len_ms: u64,
    pub max_len_ms: u64,
    pub whisper_model: String,
    pub whisper_model_url: String,
    pub whisper_language: Option<String>,
    pub remote_stt_url: String,
    pub remote_stt_model_id: String,
    /// Directory searched for model files before downloading.
    pub models_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scan_interval_ms: 1000,
            relay_tick_ms: 1000,
            await_tick_ms: 500,
            publish: PublishPolicy::default(),
            min_len_ms: DEFAULT_MIN_LEN_MS,
            max_len_ms: DEFAULT_MAX_LEN_MS,
            whisper_model: WHISPER_MODEL_NAME.to_string(),
            whisper_model_url: WHISPER_MODEL_URL.to_string(),
            whisper_language: None,
            remote_stt_url: REMOTE_STT_URL.to_string(),
            remote_stt_model_id: REMOTE_STT_MODEL_ID.to_string(),
            models_dir: None,
        }
    }
}

impl Settings {
    /// Load from `path`, falling back to defaults when missing or unparsable.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("Ignoring unparsable settings {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, json).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms.max(1))
    }

    pub fn relay_tick(&self) -> Duration {
        Duration::from_millis(self.relay_tick_ms.max(1))
    }

    pub fn await_tick(&self) -> Duration {
        Duration::from_millis(self.await_tick_ms.max(1))
    }
}
