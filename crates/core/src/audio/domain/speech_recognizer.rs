use thiserror::Error;

use super::audio_segment::AudioSegment;
use super::transcript::Transcript;

#[derive(Error, Debug)]
pub enum RecognizeError {
    #[error("speech recognizer unavailable: {0}")]
    Unavailable(String),
    #[error("transcription failed: {0}")]
    Failed(String),
    /// Credential rejected or usage quota used up; no later file can succeed.
    #[error("quota or credential exhausted: {0}")]
    QuotaExhausted(String),
}

impl RecognizeError {
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, Self::QuotaExhausted(_))
    }
}

/// Domain interface for speech-to-text transcription.
///
/// Implementations receive mono audio at the rate they ask for through
/// `sample_rate` and return the recognised text with optional word timings.
pub trait SpeechRecognizer: Send {
    fn sample_rate(&self) -> u32 {
        crate::shared::constants::VAD_SAMPLE_RATE
    }

    fn transcribe(&self, audio: &AudioSegment) -> Result<Transcript, RecognizeError>;
}
