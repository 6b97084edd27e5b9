use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::shared::constants::{DEFAULT_MAX_LEN_MS, DEFAULT_MIN_LEN_MS};

pub const DEFAULT_TRANSCRIPT_NAME: &str = "transcription.csv";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unsupported task type: {0}")]
    UnknownType(String),
    #[error("invalid {kind} payload: {message}")]
    Malformed { kind: TaskKind, message: String },
    #[error("{0}")]
    MissingField(String),
    #[error("unsupported {field}: '{value}'")]
    Unsupported { field: &'static str, value: String },
    #[error("{0}")]
    Invalid(String),
    #[error("input folder not found: {0}")]
    FolderNotFound(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Scrape,
    Split,
    Transcribe,
}

impl TaskKind {
    /// Accepts both the short tags and the longer names older front ends send.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim().to_lowercase().as_str() {
            "scrape" | "scrape_youtube" => Ok(Self::Scrape),
            "split" | "split_audio" => Ok(Self::Split),
            "transcribe" | "transcribe_audio" => Ok(Self::Transcribe),
            other => Err(ValidationError::UnknownType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Scrape => "scrape",
            TaskKind::Split => "split",
            TaskKind::Transcribe => "transcribe",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitSource {
    /// A scrape manifest name inside the datasets directory.
    CsvFilename(String),
    /// A folder of recordings, absolute or relative to the storage root.
    AudioFolder(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMethod {
    #[default]
    Vad,
    Semantic,
}

impl SplitMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitMethod::Vad => "vad",
            SplitMethod::Semantic => "semantic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRequest {
    pub source: SplitSource,
    #[serde(default)]
    pub method: SplitMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_len: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscribeMethod {
    #[default]
    Local,
    Remote,
}

impl TranscribeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscribeMethod::Local => "local",
            TranscribeMethod::Remote => "remote",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscribeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_folder: Option<String>,
    pub output_name: String,
    #[serde(default)]
    pub method: TranscribeMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

// Keep credentials out of logs.
impl fmt::Debug for TranscribeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscribeRequest")
            .field("audio_folder", &self.audio_folder)
            .field("output_name", &self.output_name)
            .field("method", &self.method)
            .field("credential", &self.credential.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Strongly typed task request, validated at the submission boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum TaskRequest {
    Scrape(ScrapeRequest),
    Split(SplitRequest),
    Transcribe(TranscribeRequest),
}

impl TaskRequest {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskRequest::Scrape(_) => TaskKind::Scrape,
            TaskRequest::Split(_) => TaskKind::Split,
            TaskRequest::Transcribe(_) => TaskKind::Transcribe,
        }
    }

    /// Build a typed request from a type tag and a loose key/value payload.
    pub fn parse(kind: &str, payload: Value) -> Result<Self, ValidationError> {
        let kind = TaskKind::parse(kind)?;
        Self::parse_kind(kind, payload)
    }

    pub fn parse_kind(kind: TaskKind, payload: Value) -> Result<Self, ValidationError> {
        let payload = if payload.is_null() {
            Value::Object(Default::default())
        } else {
            payload
        };
        let request = match kind {
            TaskKind::Scrape => TaskRequest::Scrape(decode::<RawScrape>(kind, payload)?.validate()?),
            TaskKind::Split => TaskRequest::Split(decode::<RawSplit>(kind, payload)?.validate()?),
            TaskKind::Transcribe => {
                TaskRequest::Transcribe(decode::<RawTranscribe>(kind, payload)?.validate()?)
            }
        };
        Ok(request)
    }

    /// Run the submission checks again on a request read back from storage.
    pub fn revalidate(&self) -> Result<Self, ValidationError> {
        let request = match self {
            TaskRequest::Scrape(r) => TaskRequest::Scrape(
                RawScrape {
                    source_url: Some(r.source_url.clone()),
                    label: r.label.clone(),
                }
                .validate()?,
            ),
            TaskRequest::Split(r) => {
                let (csv_filename, audio_folder) = match &r.source {
                    SplitSource::CsvFilename(name) => (Some(name.clone()), None),
                    SplitSource::AudioFolder(folder) => (None, Some(folder.clone())),
                };
                TaskRequest::Split(
                    RawSplit {
                        csv_filename,
                        audio_folder,
                        method: Some(r.method.as_str().to_string()),
                        min_len: r.min_len,
                        max_len: r.max_len,
                    }
                    .validate()?,
                )
            }
            TaskRequest::Transcribe(r) => TaskRequest::Transcribe(
                RawTranscribe {
                    audio_folder: r.audio_folder.clone(),
                    output_name: Some(r.output_name.clone()),
                    method: Some(r.method.as_str().to_string()),
                    credential: r.credential.clone(),
                }
                .validate()?,
            ),
        };
        Ok(request)
    }
}

fn decode<T: for<'de> Deserialize<'de>>(kind: TaskKind, payload: Value) -> Result<T, ValidationError> {
    serde_json::from_value(payload).map_err(|e| ValidationError::Malformed {
        kind,
        message: e.to_string(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Deserialize)]
struct RawScrape {
    #[serde(alias = "playlist_url", alias = "channel_url")]
    source_url: Option<String>,
    #[serde(alias = "voice_name")]
    label: Option<String>,
}

impl RawScrape {
    fn validate(self) -> Result<ScrapeRequest, ValidationError> {
        let source_url = non_empty(self.source_url)
            .ok_or_else(|| ValidationError::MissingField("source_url is required".to_string()))?;
        if !(source_url.starts_with("http://") || source_url.starts_with("https://")) {
            return Err(ValidationError::Invalid(format!(
                "source_url must be an http(s) URL, got '{source_url}'"
            )));
        }
        Ok(ScrapeRequest {
            source_url,
            label: non_empty(self.label),
        })
    }
}

#[derive(Deserialize)]
struct RawSplit {
    csv_filename: Option<String>,
    audio_folder: Option<String>,
    #[serde(alias = "splitting_method")]
    method: Option<String>,
    #[serde(alias = "min_audio_len")]
    min_len: Option<u64>,
    #[serde(alias = "max_audio_len")]
    max_len: Option<u64>,
}

impl RawSplit {
    fn validate(self) -> Result<SplitRequest, ValidationError> {
        let source = match (non_empty(self.csv_filename), non_empty(self.audio_folder)) {
            (Some(csv), _) => SplitSource::CsvFilename(csv),
            (None, Some(folder)) => SplitSource::AudioFolder(folder),
            (None, None) => {
                return Err(ValidationError::MissingField(
                    "Either csv_filename or audio_folder must be provided".to_string(),
                ))
            }
        };

        let method = match non_empty(self.method).as_deref().map(str::to_lowercase).as_deref() {
            None | Some("vad") => SplitMethod::Vad,
            Some("semantic") => SplitMethod::Semantic,
            Some(other) => {
                return Err(ValidationError::Unsupported {
                    field: "split method",
                    value: other.to_string(),
                })
            }
        };

        let min_len = self.min_len.unwrap_or(DEFAULT_MIN_LEN_MS);
        let max_len = self.max_len.unwrap_or(DEFAULT_MAX_LEN_MS);
        if max_len == 0 {
            return Err(ValidationError::Invalid("max_len must be positive".to_string()));
        }
        if min_len > max_len {
            return Err(ValidationError::Invalid(format!(
                "min_len ({min_len} ms) must not exceed max_len ({max_len} ms)"
            )));
        }

        Ok(SplitRequest {
            source,
            method,
            min_len: self.min_len,
            max_len: self.max_len,
        })
    }
}

#[derive(Deserialize)]
struct RawTranscribe {
    audio_folder: Option<String>,
    #[serde(alias = "output_csv_name")]
    output_name: Option<String>,
    method: Option<String>,
    #[serde(alias = "api_key")]
    credential: Option<String>,
}

impl RawTranscribe {
    fn validate(self) -> Result<TranscribeRequest, ValidationError> {
        let method = match non_empty(self.method).as_deref().map(str::to_lowercase).as_deref() {
            None | Some("local") => TranscribeMethod::Local,
            Some("remote") | Some("elevenlabs") => TranscribeMethod::Remote,
            Some(other) => {
                return Err(ValidationError::Unsupported {
                    field: "transcription method",
                    value: other.to_string(),
                })
            }
        };

        let credential = non_empty(self.credential);
        if method == TranscribeMethod::Remote && credential.is_none() {
            return Err(ValidationError::MissingField(
                "A credential is required for remote transcription".to_string(),
            ));
        }

        let output_name = manifest_file_name(
            &non_empty(self.output_name).unwrap_or_else(|| DEFAULT_TRANSCRIPT_NAME.to_string()),
        )?;

        Ok(TranscribeRequest {
            audio_folder: non_empty(self.audio_folder),
            output_name,
            method,
            credential,
        })
    }
}

/// Manifest names are plain file names inside a datasets directory; `.csv`
/// is appended when missing.
pub fn manifest_file_name(name: &str) -> Result<String, ValidationError> {
    if name.contains('/') || name.contains('\\') || name == ".." || name == "." {
        return Err(ValidationError::Invalid(format!(
            "output_name must be a plain file name, got '{name}'"
        )));
    }
    if name.to_lowercase().ends_with(".csv") {
        Ok(name.to_string())
    } else {
        Ok(format!("{name}.csv"))
    }
}
