use std::path::Path;

use super::audio_segment::AudioSegment;

/// Domain interface for decoding audio from any media container.
pub trait AudioReader: Send {
    /// Decode the audio track to a mono PCM AudioSegment at the given sample rate.
    /// Returns None if the file has no audio track.
    fn read_audio(
        &self,
        path: &Path,
        target_sample_rate: u32,
    ) -> Result<Option<AudioSegment>, Box<dyn std::error::Error>>;

    /// Return the original audio sample rate and channel count without decoding.
    fn audio_metadata(&self, path: &Path)
        -> Result<Option<(u32, u16)>, Box<dyn std::error::Error>>;

    /// Decode to mono at the file's own sample rate.
    fn read_audio_native(
        &self,
        path: &Path,
    ) -> Result<Option<AudioSegment>, Box<dyn std::error::Error>> {
        match self.audio_metadata(path)? {
            Some((rate, _)) => self.read_audio(path, rate),
            None => Ok(None),
        }
    }
}
