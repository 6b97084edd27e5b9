use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::audio::domain::audio_segment::AudioSegment;
use crate::audio::domain::speech_recognizer::{RecognizeError, SpeechRecognizer};
use crate::audio::domain::transcript::{Transcript, TranscriptWord};

use super::wav_clip_writer::encode_wav;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Hosted speech-to-text over HTTP (ElevenLabs-compatible API).
///
/// Audio is uploaded as a WAV multipart field `file` with `model_id`,
/// authenticated with the `xi-api-key` header.
pub struct RemoteRecognizer {
    client: reqwest::blocking::Client,
    url: String,
    model_id: String,
    credential: String,
}

#[derive(Deserialize)]
struct SpeechToTextResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    words: Vec<ResponseWord>,
}

#[derive(Deserialize)]
struct ResponseWord {
    text: String,
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl RemoteRecognizer {
    pub fn new(
        url: impl Into<String>,
        model_id: impl Into<String>,
        credential: impl Into<String>,
    ) -> Result<Self, RecognizeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RecognizeError::Unavailable(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            model_id: model_id.into(),
            credential: credential.into(),
        })
    }
}

impl SpeechRecognizer for RemoteRecognizer {
    fn transcribe(&self, audio: &AudioSegment) -> Result<Transcript, RecognizeError> {
        let wav = encode_wav(audio)
            .map_err(|e| RecognizeError::Failed(format!("Failed to encode audio: {e}")))?;
        let file = Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| RecognizeError::Failed(e.to_string()))?;
        let form = Form::new()
            .text("model_id", self.model_id.clone())
            .part("file", file);

        let response = self
            .client
            .post(&self.url)
            .header("xi-api-key", &self.credential)
            .multipart(form)
            .send()
            .map_err(|e| RecognizeError::Failed(format!("Request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| RecognizeError::Failed(format!("Failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        let parsed: SpeechToTextResponse = serde_json::from_str(&body)
            .map_err(|e| RecognizeError::Failed(format!("Unexpected response: {e}")))?;
        let words = parsed
            .words
            .into_iter()
            .filter(|w| w.kind.as_deref().map_or(true, |k| k == "word"))
            .map(|w| TranscriptWord {
                word: w.text.trim().to_string(),
                start_time: w.start,
                end_time: w.end,
                confidence: 1.0,
            })
            .collect();
        Ok(Transcript {
            text: parsed.text.trim().to_string(),
            words,
        })
    }
}

/// Rejected credentials and used-up quota end the whole run; anything else
/// only fails the current file.
fn classify_failure(status: StatusCode, body: &str) -> RecognizeError {
    let lowered = body.to_lowercase();
    let message = format!("HTTP {status}: {}", body.trim());
    let exhausted = matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::PAYMENT_REQUIRED
    ) || lowered.contains("quota")
        || lowered.contains("credits");
    if exhausted {
        RecognizeError::QuotaExhausted(message)
    } else {
        RecognizeError::Failed(message)
    }
}
