use std::path::Path;

use super::audio_segment::AudioSegment;

/// Domain interface for exporting a clip to disk.
pub trait ClipWriter: Send {
    fn write_clip(&self, path: &Path, audio: &AudioSegment) -> Result<(), Box<dyn std::error::Error>>;
}
