use crate::audio::domain::audio_reader::AudioReader;
use crate::audio::domain::clip_writer::ClipWriter;
use crate::audio::domain::speech_recognizer::SpeechRecognizer;
use crate::audio::domain::voice_activity_detector::VoiceActivityDetector;
use crate::pipeline::task_error::TaskError;
use crate::sources::domain::source_lister::SourceLister;

/// Factory for the external collaborators a task needs.
///
/// Collaborators are built per task so heavy models are only loaded by the
/// task kinds that use them.
pub trait Collaborators: Send {
    fn audio_reader(&self) -> Box<dyn AudioReader>;

    fn clip_writer(&self) -> Box<dyn ClipWriter>;

    /// `None` when no detector can be loaded; segmentation then falls back
    /// to the silence splitter.
    fn voice_detector(&self) -> Option<Box<dyn VoiceActivityDetector>>;

    fn local_recognizer(&self) -> Result<Box<dyn SpeechRecognizer>, TaskError>;

    fn remote_recognizer(&self, credential: &str) -> Result<Box<dyn SpeechRecognizer>, TaskError>;

    fn source_lister(&self) -> Box<dyn SourceLister>;
}
