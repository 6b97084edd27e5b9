use super::audio_segment::AudioSegment;
use super::speech_segment::SpeechSegment;

/// Domain interface for voice-activity detection.
///
/// Input is mono audio at `sample_rate`; output intervals are in
/// milliseconds from the start of that audio.
pub trait VoiceActivityDetector: Send {
    fn sample_rate(&self) -> u32 {
        crate::shared::constants::VAD_SAMPLE_RATE
    }

    fn detect(
        &mut self,
        audio: &AudioSegment,
    ) -> Result<Vec<SpeechSegment>, Box<dyn std::error::Error>>;
}
