use super::audio_segment::{db_to_amplitude, ms_to_frames, AudioSegment};
use super::speech_segment::SpeechSegment;
use crate::shared::constants::{FALLBACK_MIN_SILENCE_MS, FALLBACK_SILENCE_THRESH_DBFS};

/// Energy-threshold splitter used when no voice-activity model is available.
///
/// A window of `min_silence_ms` slides over the audio in 1 ms steps; windows
/// whose RMS is at or below `silence_thresh_dbfs` are silent, and everything
/// between silent runs is returned as sound.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SilenceSplitter {
    pub min_silence_ms: u64,
    pub silence_thresh_dbfs: f64,
}

impl Default for SilenceSplitter {
    fn default() -> Self {
        Self {
            min_silence_ms: FALLBACK_MIN_SILENCE_MS,
            silence_thresh_dbfs: FALLBACK_SILENCE_THRESH_DBFS,
        }
    }
}

impl SilenceSplitter {
    pub fn detect_nonsilent(&self, audio: &AudioSegment) -> Vec<SpeechSegment> {
        let len_ms = audio.duration_ms();
        let silent = self.detect_silence(audio);
        if silent.is_empty() {
            return vec![SpeechSegment::new(0, len_ms)];
        }
        if silent[0] == SpeechSegment::new(0, len_ms) {
            return Vec::new();
        }

        let mut out = Vec::with_capacity(silent.len() + 1);
        let mut prev_end = 0;
        for range in &silent {
            if range.start_ms > prev_end {
                out.push(SpeechSegment::new(prev_end, range.start_ms));
            }
            prev_end = range.end_ms;
        }
        if prev_end < len_ms {
            out.push(SpeechSegment::new(prev_end, len_ms));
        }
        out
    }

    pub fn detect_silence(&self, audio: &AudioSegment) -> Vec<SpeechSegment> {
        let len_ms = audio.duration_ms();
        let window = self.min_silence_ms;
        if window == 0 || len_ms < window {
            return Vec::new();
        }

        let channels = audio.channels() as usize;
        let rate = audio.sample_rate();
        // Prefix sums of squared samples per frame.
        let mut energy = Vec::with_capacity(audio.frames() + 1);
        energy.push(0.0f64);
        let mut acc = 0.0f64;
        for frame in audio.samples().chunks_exact(channels) {
            acc += frame.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>();
            energy.push(acc);
        }

        let threshold = db_to_amplitude(self.silence_thresh_dbfs);
        let frames = audio.frames();
        let is_silent = |start_ms: u64| {
            let a = ms_to_frames(start_ms, rate).min(frames);
            let b = ms_to_frames(start_ms + window, rate).min(frames);
            if b <= a {
                return true;
            }
            let count = ((b - a) * channels) as f64;
            ((energy[b] - energy[a]) / count).sqrt() <= threshold
        };

        let mut ranges = Vec::new();
        let mut run: Option<(u64, u64)> = None;
        for start in 0..=(len_ms - window) {
            if !is_silent(start) {
                continue;
            }
            run = match run {
                Some((first, prev)) if start <= prev + window => Some((first, start)),
                Some((first, prev)) => {
                    ranges.push(SpeechSegment::new(first, prev + window));
                    Some((start, start))
                }
                None => Some((start, start)),
            };
        }
        if let Some((first, prev)) = run {
            ranges.push(SpeechSegment::new(first, prev + window));
        }
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16000;

    /// Alternating loud/silent blocks, durations in ms.
    fn blocks(pattern: &[(bool, u64)]) -> AudioSegment {
        let mut samples = Vec::new();
        for &(loud, ms) in pattern {
            let n = ms_to_frames(ms, RATE);
            samples.extend((0..n).map(|i| if loud { if i % 2 == 0 { 0.5 } else { -0.5 } } else { 0.0 }));
        }
        AudioSegment::new(samples, RATE, 1)
    }

    #[test]
    fn test_all_loud_is_one_range() {
        let audio = blocks(&[(true, 3000)]);
        assert_eq!(
            SilenceSplitter::default().detect_nonsilent(&audio),
            vec![SpeechSegment::new(0, 3000)]
        );
    }

    #[test]
    fn test_all_silent_is_empty() {
        let audio = blocks(&[(false, 3000)]);
        assert!(SilenceSplitter::default().detect_nonsilent(&audio).is_empty());
    }

    #[test]
    fn test_long_pause_splits() {
        let audio = blocks(&[(true, 2000), (false, 1000), (true, 1500)]);
        let ranges = SilenceSplitter::default().detect_nonsilent(&audio);
        assert_eq!(
            ranges,
            vec![SpeechSegment::new(0, 2000), SpeechSegment::new(3000, 4500)]
        );
    }

    #[test]
    fn test_short_pause_does_not_split() {
        let audio = blocks(&[(true, 2000), (false, 300), (true, 1500)]);
        let ranges = SilenceSplitter::default().detect_nonsilent(&audio);
        assert_eq!(ranges, vec![SpeechSegment::new(0, 3800)]);
    }

    #[test]
    fn test_leading_and_trailing_silence_trimmed() {
        let audio = blocks(&[(false, 800), (true, 2000), (false, 700)]);
        let ranges = SilenceSplitter::default().detect_nonsilent(&audio);
        assert_eq!(ranges, vec![SpeechSegment::new(800, 2800)]);
    }

    #[test]
    fn test_audio_shorter_than_window_is_sound() {
        let audio = blocks(&[(false, 200)]);
        assert_eq!(
            SilenceSplitter::default().detect_nonsilent(&audio),
            vec![SpeechSegment::new(0, 200)]
        );
    }
}
