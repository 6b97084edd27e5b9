use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::domain::audio_reader::AudioReader;
use crate::audio::domain::clip_writer::ClipWriter;
use crate::audio::domain::speech_recognizer::{RecognizeError, SpeechRecognizer};
use crate::manifest::domain::manifest_rows::SemanticRow;
use crate::manifest::infrastructure::csv_manifest::write_rows;
use crate::pipeline::progress_reporter::{percent, ProgressReporter};
use crate::pipeline::split_sources::{audio_files, file_stem};
use crate::pipeline::task_error::TaskError;
use crate::queue::domain::task_request::ValidationError;
use crate::shared::constants::{SEMANTIC_MIN_SENTENCE_MS, TRANSCRIBE_EXTENSIONS};

#[derive(Clone, Debug, PartialEq)]
pub struct SemanticOutcome {
    pub manifest_path: PathBuf,
    pub rows: Vec<SemanticRow>,
}

/// Cuts recordings at sentence boundaries found by a speech recognizer.
pub struct SemanticSplitUseCase {
    reader: Box<dyn AudioReader>,
    writer: Box<dyn ClipWriter>,
    recognizer: Box<dyn SpeechRecognizer>,
    clips_dir: PathBuf,
    min_sentence_ms: u64,
}

impl SemanticSplitUseCase {
    pub fn new(
        reader: Box<dyn AudioReader>,
        writer: Box<dyn ClipWriter>,
        recognizer: Box<dyn SpeechRecognizer>,
        clips_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            reader,
            writer,
            recognizer,
            clips_dir: clips_dir.into(),
            min_sentence_ms: SEMANTIC_MIN_SENTENCE_MS,
        }
    }

    /// `semantic_split_<folder name>.csv`
    pub fn manifest_name(folder: &Path) -> String {
        let name = folder
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio");
        format!("semantic_split_{name}.csv")
    }

    pub fn run(
        &mut self,
        folder: &Path,
        manifest_path: &Path,
        progress: &mut dyn ProgressReporter,
    ) -> Result<SemanticOutcome, TaskError> {
        if !folder.is_dir() {
            return Err(ValidationError::FolderNotFound(folder.to_path_buf()).into());
        }
        let files = audio_files(folder, TRANSCRIBE_EXTENSIONS)?;
        if files.is_empty() {
            return Err(ValidationError::Invalid(format!(
                "No audio files found in {}",
                folder.display()
            ))
            .into());
        }
        fs::create_dir_all(&self.clips_dir).map_err(|e| TaskError::io(&self.clips_dir, e))?;

        let total = files.len();
        let mut rows = Vec::new();
        for (i, path) in files.iter().enumerate() {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            progress.report(
                &format!("Processing {file_name}..."),
                Some(percent(i, total)),
            );

            match self.split_file(path, &file_name) {
                Ok(file_rows) => rows.extend(file_rows),
                Err(TaskError::Recognize(e @ RecognizeError::Failed(_))) => {
                    log::error!("Error processing {file_name}: {e}");
                }
                Err(e @ TaskError::Recognize(_)) => return Err(e),
                Err(e) => log::error!("Error processing {file_name}: {e}"),
            }
        }

        progress.report("Finalizing...", Some(100));
        write_rows(manifest_path, &rows)?;
        Ok(SemanticOutcome {
            manifest_path: manifest_path.to_path_buf(),
            rows,
        })
    }

    fn split_file(&mut self, path: &Path, file_name: &str) -> Result<Vec<SemanticRow>, TaskError> {
        let Some(source) = self
            .reader
            .read_audio_native(path)
            .map_err(TaskError::collaborator)?
        else {
            return Ok(Vec::new());
        };
        let speech = match self
            .reader
            .read_audio(path, self.recognizer.sample_rate())
            .map_err(TaskError::collaborator)?
        {
            Some(a) => a,
            None => return Ok(Vec::new()),
        };
        let transcript = self.recognizer.transcribe(&speech)?;

        let base = file_stem(path);
        let mut rows = Vec::new();
        for sentence in transcript.sentences() {
            let start_ms = (sentence.start_time * 1000.0).round() as u64;
            let end_ms = (sentence.end_time * 1000.0).round() as u64;
            let duration_ms = end_ms.saturating_sub(start_ms);
            if duration_ms < self.min_sentence_ms {
                continue;
            }
            let clip_name = format!("{base}_seg_{:04}.wav", rows.len());
            let clip = source.slice_ms(start_ms, end_ms);
            self.writer
                .write_clip(&self.clips_dir.join(&clip_name), &clip)
                .map_err(TaskError::collaborator)?;
            rows.push(SemanticRow {
                original_file: file_name.to_string(),
                audio_filename: clip_name,
                text: sentence.text.trim().to_string(),
                duration_sec: duration_ms as f64 / 1000.0,
                speaker: "unknown".to_string(),
            });
        }
        Ok(rows)
    }
}
