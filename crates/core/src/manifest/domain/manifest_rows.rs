use serde::{Deserialize, Serialize};

/// Row of `<collection>_metadata.csv`, one per scraped recording.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScrapeRow {
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub video_title: String,
    #[serde(default)]
    pub video_link: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub voice: String,
    /// Stem of the downloaded file under `audios/`; empty when the download failed.
    #[serde(default)]
    pub audio_filename: Option<String>,
}

/// Row of `<collection>_splitted.csv`, one per exported clip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRow {
    pub collection: String,
    pub source_title: String,
    pub source_name: String,
    pub clip_name: String,
    pub voice: String,
}

/// Row of `semantic_split_<folder>.csv`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SemanticRow {
    pub original_file: String,
    pub audio_filename: String,
    pub text: String,
    pub duration_sec: f64,
    pub speaker: String,
}

/// Prefix of the text recorded for a file that could not be transcribed.
pub const TRANSCRIPT_ERROR_PREFIX: &str = "[ERROR: ";

/// Row of a transcription manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRow {
    pub filename: String,
    pub text: String,
}

impl TranscriptRow {
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            text: text.into(),
        }
    }

    /// Placeholder row `[ERROR: <message>]`.
    pub fn failed(filename: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::new(filename, format!("{TRANSCRIPT_ERROR_PREFIX}{message}]"))
    }

    pub fn is_error(&self) -> bool {
        self.text.starts_with(TRANSCRIPT_ERROR_PREFIX)
    }
}
