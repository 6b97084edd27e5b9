//! Silero VAD (v5) voice-activity detector using ONNX Runtime via `ort`.
use std::path::Path;

use ndarray::{Array0, Array2, Array3, Ix3};

use crate::audio::domain::audio_segment::AudioSegment;
use crate::audio::domain::speech_segment::SpeechSegment;
use crate::audio::domain::voice_activity_detector::VoiceActivityDetector;
use crate::shared::constants::VAD_SAMPLE_RATE;

/// Samples per inference window at 16 kHz.
const WINDOW_SAMPLES: usize = 512;

/// Trailing samples of the previous window fed back as context.
const CONTEXT_SAMPLES: usize = 64;

/// Tunables of the probability-to-interval conversion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VadParams {
    pub threshold: f32,
    pub min_silence_ms: u64,
    pub min_speech_ms: u64,
    pub speech_pad_ms: u64,
}

impl Default for VadParams {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_silence_ms: 100,
            min_speech_ms: 250,
            speech_pad_ms: 30,
        }
    }
}

pub struct SileroVadDetector {
    session: ort::session::Session,
    params: VadParams,
}

impl SileroVadDetector {
    pub fn new(model_path: &Path, params: VadParams) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;
        Ok(Self { session, params })
    }

    /// Speech probability of every 512-sample window.
    fn window_probabilities(&mut self, samples: &[f32]) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let mut state = Array3::<f32>::zeros((2, 1, 128));
        let mut context = vec![0.0f32; CONTEXT_SAMPLES];
        let mut probabilities = Vec::with_capacity(samples.len() / WINDOW_SAMPLES + 1);

        for chunk in samples.chunks(WINDOW_SAMPLES) {
            let mut window = Vec::with_capacity(CONTEXT_SAMPLES + WINDOW_SAMPLES);
            window.extend_from_slice(&context);
            window.extend_from_slice(chunk);
            window.resize(CONTEXT_SAMPLES + WINDOW_SAMPLES, 0.0);
            context.copy_from_slice(&window[WINDOW_SAMPLES..]);

            let input = Array2::from_shape_vec((1, window.len()), window)?;
            let sr = Array0::from_elem((), VAD_SAMPLE_RATE as i64);
            let outputs = self.session.run(ort::inputs![
                "input" => ort::value::Tensor::from_array(input)?,
                "state" => ort::value::Tensor::from_array(state.clone())?,
                "sr" => ort::value::Tensor::from_array(sr)?,
            ])?;

            if outputs.len() < 2 {
                return Err(format!("Silero VAD expected 2 outputs, got {}", outputs.len()).into());
            }
            let prob = outputs[0].try_extract_array::<f32>()?;
            let probability = *prob.iter().next().ok_or("Empty VAD probability output")?;
            let next_state = outputs[1]
                .try_extract_array::<f32>()?
                .to_owned()
                .into_dimensionality::<Ix3>()?;
            drop(outputs);

            probabilities.push(probability);
            state = next_state;
        }
        Ok(probabilities)
    }
}

impl VoiceActivityDetector for SileroVadDetector {
    fn detect(
        &mut self,
        audio: &AudioSegment,
    ) -> Result<Vec<SpeechSegment>, Box<dyn std::error::Error>> {
        if audio.sample_rate() != VAD_SAMPLE_RATE || audio.channels() != 1 {
            return Err(format!(
                "Silero VAD needs mono {VAD_SAMPLE_RATE} Hz audio, got {} Hz x{}",
                audio.sample_rate(),
                audio.channels()
            )
            .into());
        }
        let probabilities = self.window_probabilities(audio.samples())?;
        let spans = speech_spans(
            &probabilities,
            WINDOW_SAMPLES,
            audio.samples().len(),
            VAD_SAMPLE_RATE,
            &self.params,
        );
        let rate = VAD_SAMPLE_RATE as u64;
        Ok(spans
            .into_iter()
            .map(|(start, end)| {
                SpeechSegment::new(start as u64 * 1000 / rate, end as u64 * 1000 / rate)
            })
            .collect())
    }
}

/// Convert per-window speech probabilities into padded speech spans in
/// samples.
///
/// Speech starts when a window reaches `threshold` and ends once the
/// probability has stayed below `threshold - 0.15` for `min_silence_ms`.
/// Spans shorter than `min_speech_ms` are dropped, then each span is
/// widened by `speech_pad_ms` without overlapping its neighbours.
pub fn speech_spans(
    probabilities: &[f32],
    window: usize,
    total_samples: usize,
    sample_rate: u32,
    params: &VadParams,
) -> Vec<(usize, usize)> {
    let per_ms = sample_rate as usize / 1000;
    let min_silence = params.min_silence_ms as usize * per_ms;
    let min_speech = params.min_speech_ms as usize * per_ms;
    let pad = params.speech_pad_ms as usize * per_ms;
    let neg_threshold = (params.threshold - 0.15).max(0.01);

    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut triggered = false;
    let mut start = 0usize;
    let mut temp_end = 0usize;

    for (i, &p) in probabilities.iter().enumerate() {
        let position = i * window;
        if p >= params.threshold && temp_end != 0 {
            temp_end = 0;
        }
        if p >= params.threshold && !triggered {
            triggered = true;
            start = position;
            continue;
        }
        if p < neg_threshold && triggered {
            if temp_end == 0 {
                temp_end = position;
            }
            if position - temp_end < min_silence {
                continue;
            }
            if temp_end - start > min_speech {
                spans.push((start, temp_end));
            }
            temp_end = 0;
            triggered = false;
        }
    }
    if triggered && total_samples.saturating_sub(start) > min_speech {
        spans.push((start, total_samples));
    }

    let count = spans.len();
    for i in 0..count {
        if i == 0 {
            spans[i].0 = spans[i].0.saturating_sub(pad);
        }
        if i + 1 < count {
            let silence = spans[i + 1].0.saturating_sub(spans[i].1);
            if silence < 2 * pad {
                spans[i].1 += silence / 2;
                spans[i + 1].0 = spans[i + 1].0.saturating_sub(silence / 2);
            } else {
                spans[i].1 = (spans[i].1 + pad).min(total_samples);
                spans[i + 1].0 = spans[i + 1].0.saturating_sub(pad);
            }
        } else {
            spans[i].1 = (spans[i].1 + pad).min(total_samples);
        }
    }
    spans
}
