use crate::audio::domain::audio_reader::AudioReader;
use crate::audio::domain::clip_writer::ClipWriter;
use crate::audio::domain::speech_recognizer::SpeechRecognizer;
use crate::audio::domain::voice_activity_detector::VoiceActivityDetector;
use crate::audio::infrastructure::ffmpeg_audio_reader::FfmpegAudioReader;
use crate::audio::infrastructure::remote_recognizer::RemoteRecognizer;
use crate::audio::infrastructure::silero_vad_detector::{SileroVadDetector, VadParams};
use crate::audio::infrastructure::wav_clip_writer::WavClipWriter;
use crate::audio::infrastructure::whisper_recognizer::WhisperRecognizer;
use crate::pipeline::task_error::TaskError;
use crate::shared::constants::{SILERO_VAD_MODEL_NAME, SILERO_VAD_MODEL_URL};
use crate::shared::model_resolver::ModelResolver;
use crate::shared::settings::Settings;
use crate::sources::domain::source_lister::SourceLister;
use crate::sources::infrastructure::yt_dlp_lister::YtDlpLister;
use crate::worker::collaborators::Collaborators;

/// Production wiring: ffmpeg decoding, WAV export, Silero VAD, whisper,
/// the hosted recognizer and yt-dlp.
pub struct DefaultCollaborators {
    settings: Settings,
    resolver: ModelResolver,
}

impl DefaultCollaborators {
    pub fn new(settings: Settings, resolver: ModelResolver) -> Self {
        Self { settings, resolver }
    }

    /// Resolver at the platform cache dir, also searching `settings.models_dir`.
    pub fn from_settings(settings: Settings) -> Result<Self, TaskError> {
        let resolver = ModelResolver::platform(settings.models_dir.clone())?;
        Ok(Self::new(settings, resolver))
    }
}

impl Collaborators for DefaultCollaborators {
    fn audio_reader(&self) -> Box<dyn AudioReader> {
        Box::new(FfmpegAudioReader)
    }

    fn clip_writer(&self) -> Box<dyn ClipWriter> {
        Box::new(WavClipWriter)
    }

    fn voice_detector(&self) -> Option<Box<dyn VoiceActivityDetector>> {
        let model = match self
            .resolver
            .resolve(SILERO_VAD_MODEL_NAME, SILERO_VAD_MODEL_URL, None)
        {
            Ok(path) => path,
            Err(e) => {
                log::warn!("VAD model unavailable, using silence splitter: {e}");
                return None;
            }
        };
        match SileroVadDetector::new(&model, VadParams::default()) {
            Ok(detector) => Some(Box::new(detector)),
            Err(e) => {
                log::warn!("Failed to load VAD model, using silence splitter: {e}");
                None
            }
        }
    }

    fn local_recognizer(&self) -> Result<Box<dyn SpeechRecognizer>, TaskError> {
        let model = self.resolver.resolve(
            &self.settings.whisper_model,
            &self.settings.whisper_model_url,
            Some(Box::new(|done, total| {
                if total > 0 {
                    log::debug!("whisper model: {done}/{total} bytes");
                }
            })),
        )?;
        let recognizer = WhisperRecognizer::new(&model, self.settings.whisper_language.clone())?;
        Ok(Box::new(recognizer))
    }

    fn remote_recognizer(&self, credential: &str) -> Result<Box<dyn SpeechRecognizer>, TaskError> {
        let recognizer = RemoteRecognizer::new(
            &self.settings.remote_stt_url,
            &self.settings.remote_stt_model_id,
            credential,
        )?;
        Ok(Box::new(recognizer))
    }

    fn source_lister(&self) -> Box<dyn SourceLister> {
        Box::new(YtDlpLister::default())
    }
}
