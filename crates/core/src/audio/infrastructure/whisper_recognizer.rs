use std::path::Path;

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::domain::audio_segment::AudioSegment;
use crate::audio::domain::speech_recognizer::{RecognizeError, SpeechRecognizer};
use crate::audio::domain::transcript::{Transcript, TranscriptWord};
use crate::shared::constants::VAD_SAMPLE_RATE;

/// On-device speech recognizer using whisper.cpp via whisper-rs.
///
/// The model is loaded once and reused for every call. Tokens are stitched
/// back into whole words with token-level timestamps.
pub struct WhisperRecognizer {
    ctx: WhisperContext,
    language: Option<String>,
}

impl WhisperRecognizer {
    pub fn new(model_path: &Path, language: Option<String>) -> Result<Self, RecognizeError> {
        if !model_path.exists() {
            return Err(RecognizeError::Unavailable(format!(
                "Whisper model not found at: {}",
                model_path.display()
            )));
        }
        let path = model_path
            .to_str()
            .ok_or_else(|| RecognizeError::Unavailable("Invalid model path".to_string()))?;
        let ctx = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .map_err(|e| RecognizeError::Unavailable(format!("Failed to load Whisper model: {e}")))?;
        Ok(Self { ctx, language })
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn transcribe(&self, audio: &AudioSegment) -> Result<Transcript, RecognizeError> {
        if audio.sample_rate() != VAD_SAMPLE_RATE {
            return Err(RecognizeError::Failed(format!(
                "Whisper needs {VAD_SAMPLE_RATE} Hz audio, got {} Hz",
                audio.sample_rate()
            )));
        }

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| RecognizeError::Failed(format!("Failed to create Whisper state: {e}")))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(self.language.as_deref().unwrap_or("auto")));
        params.set_translate(false);
        params.set_token_timestamps(true);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_n_threads(num_cpus().min(4) as i32);

        state
            .full(params, audio.samples())
            .map_err(|e| RecognizeError::Failed(format!("Whisper inference failed: {e}")))?;

        let mut text = String::new();
        let mut words: Vec<TranscriptWord> = Vec::new();

        for seg_idx in 0..state.full_n_segments() {
            let Some(segment) = state.get_segment(seg_idx) else {
                continue;
            };
            for tok_idx in 0..segment.n_tokens() {
                let Some(token) = segment.get_token(tok_idx) else {
                    continue;
                };
                let Ok(raw) = token.to_str() else {
                    continue;
                };
                // Special tokens look like [_BEG_] or <|endoftext|>.
                let trimmed = raw.trim();
                if trimmed.is_empty() || trimmed.starts_with('[') || trimmed.starts_with('<') {
                    continue;
                }
                text.push_str(raw);

                // Token timestamps are in centiseconds (10ms units)
                let data = token.token_data();
                let start_time = data.t0 as f64 / 100.0;
                let end_time = data.t1 as f64 / 100.0;
                let confidence = token.token_probability();

                let continues_word = !raw.starts_with(' ') && !words.is_empty();
                match words.last_mut() {
                    Some(last) if continues_word => {
                        last.word.push_str(trimmed);
                        if end_time > last.end_time {
                            last.end_time = end_time;
                        }
                        last.confidence = last.confidence.min(confidence);
                    }
                    _ if end_time > start_time => words.push(TranscriptWord {
                        word: trimmed.to_string(),
                        start_time,
                        end_time,
                        confidence,
                    }),
                    _ => {}
                }
            }
        }

        Ok(Transcript {
            text: text.trim().to_string(),
            words,
        })
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
