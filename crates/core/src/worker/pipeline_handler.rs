use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::audio::domain::segment_planner::SegmentPlanner;
use crate::pipeline::progress_reporter::ProgressReporter;
use crate::pipeline::scrape_use_case::ScrapeUseCase;
use crate::pipeline::semantic_split_use_case::SemanticSplitUseCase;
use crate::pipeline::split_audio_use_case::SplitAudioUseCase;
use crate::pipeline::split_sources::SplitJob;
use crate::pipeline::task_error::TaskError;
use crate::pipeline::transcribe_use_case::TranscribeUseCase;
use crate::queue::domain::task::Task;
use crate::queue::domain::task_request::{
    ScrapeRequest, SplitMethod, SplitRequest, SplitSource, TaskRequest, TranscribeMethod,
    TranscribeRequest, ValidationError,
};
use crate::shared::constants::SPLIT_SOURCE_EXTENSIONS;
use crate::shared::settings::Settings;
use crate::shared::storage_layout::StorageLayout;
use crate::worker::collaborators::Collaborators;
use crate::worker::task_handler::TaskHandler;

/// Dispatches each task kind to its use case.
pub struct PipelineHandler {
    layout: StorageLayout,
    settings: Settings,
    collaborators: Box<dyn Collaborators>,
}

impl PipelineHandler {
    pub fn new(
        layout: StorageLayout,
        settings: Settings,
        collaborators: Box<dyn Collaborators>,
    ) -> Self {
        Self {
            layout,
            settings,
            collaborators,
        }
    }

    fn scrape(
        &self,
        request: &ScrapeRequest,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Value, TaskError> {
        let use_case = ScrapeUseCase::new(
            self.collaborators.source_lister(),
            self.layout.audios_dir(),
            self.layout.datasets_dir(),
        );
        let outcome = use_case.run(request, progress)?;
        Ok(json!({ "csv_filename": outcome.csv_filename }))
    }

    fn split(
        &self,
        request: &SplitRequest,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Value, TaskError> {
        let min_len = request.min_len.unwrap_or(self.settings.min_len_ms);
        let max_len = request.max_len.unwrap_or(self.settings.max_len_ms);
        if min_len > max_len {
            return Err(ValidationError::Invalid(format!(
                "min_len ({min_len} ms) must not exceed max_len ({max_len} ms)"
            ))
            .into());
        }

        let clips_dir = self.layout.clips_dir();
        let manifest_path = match request.method {
            SplitMethod::Vad => {
                let job = match &request.source {
                    SplitSource::CsvFilename(name) => SplitJob::from_scrape_manifest(
                        &self.layout.datasets_dir().join(name),
                        &self.layout.audios_dir(),
                    )?,
                    SplitSource::AudioFolder(folder) => SplitJob::from_folder(
                        &self.layout.resolve(folder),
                        SPLIT_SOURCE_EXTENSIONS,
                    )?,
                };
                let manifest_path = self.layout.audio_datasets_dir().join(job.manifest_name());
                let mut use_case = SplitAudioUseCase::new(
                    self.collaborators.audio_reader(),
                    self.collaborators.clip_writer(),
                    self.collaborators.voice_detector(),
                    SegmentPlanner::new(min_len, max_len),
                    &clips_dir,
                );
                use_case.run(&job, &manifest_path, progress)?.manifest_path
            }
            SplitMethod::Semantic => {
                let folder = self.semantic_folder(&request.source)?;
                let manifest_path = self
                    .layout
                    .audio_datasets_dir()
                    .join(SemanticSplitUseCase::manifest_name(&folder));
                let mut use_case = SemanticSplitUseCase::new(
                    self.collaborators.audio_reader(),
                    self.collaborators.clip_writer(),
                    self.collaborators.local_recognizer()?,
                    &clips_dir,
                );
                use_case.run(&folder, &manifest_path, progress)?.manifest_path
            }
        };

        Ok(json!({
            "output_csv": file_name(&manifest_path),
            "audio_dir": clips_dir.display().to_string(),
        }))
    }

    /// Folder the semantic splitter reads. A scrape manifest stands for the
    /// folder its recordings were downloaded to.
    fn semantic_folder(&self, source: &SplitSource) -> Result<PathBuf, TaskError> {
        let folder = match source {
            SplitSource::AudioFolder(folder) => self.layout.resolve(folder),
            SplitSource::CsvFilename(name) => {
                let manifest = self.layout.datasets_dir().join(name);
                if !manifest.is_file() {
                    return Err(ValidationError::Invalid(format!(
                        "Manifest not found: {}",
                        manifest.display()
                    ))
                    .into());
                }
                self.layout.audios_dir()
            }
        };
        // Checked before a model is loaded.
        if !folder.is_dir() {
            return Err(ValidationError::FolderNotFound(folder).into());
        }
        Ok(folder)
    }

    fn transcribe(
        &self,
        request: &TranscribeRequest,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Value, TaskError> {
        let folder = request
            .audio_folder
            .as_deref()
            .map(|f| self.layout.resolve(f))
            .unwrap_or_else(|| self.layout.clips_dir());
        if !folder.is_dir() {
            return Err(ValidationError::FolderNotFound(folder).into());
        }

        let recognizer = match request.method {
            TranscribeMethod::Local => self.collaborators.local_recognizer()?,
            TranscribeMethod::Remote => {
                let credential = request.credential.as_deref().ok_or_else(|| {
                    ValidationError::MissingField(
                        "A credential is required for remote transcription".to_string(),
                    )
                })?;
                self.collaborators.remote_recognizer(credential)?
            }
        };

        let manifest_path: PathBuf = self.layout.text_datasets_dir().join(&request.output_name);
        let mut use_case = TranscribeUseCase::new(self.collaborators.audio_reader(), recognizer);
        let outcome = use_case.run(&folder, &manifest_path, progress)?;
        log::info!(
            "Transcribed {} file(s), skipped {}, failed {}",
            outcome.transcribed,
            outcome.skipped,
            outcome.failed
        );

        Ok(json!({
            "output_csv": request.output_name,
            "method": request.method.as_str(),
        }))
    }
}

impl TaskHandler for PipelineHandler {
    fn handle(
        &mut self,
        task: &Task,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Value, TaskError> {
        match task.request.revalidate()? {
            TaskRequest::Scrape(request) => self.scrape(&request, progress),
            TaskRequest::Split(request) => self.split(&request, progress),
            TaskRequest::Transcribe(request) => self.transcribe(&request, progress),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}
