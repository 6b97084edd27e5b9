use std::path::{Path, PathBuf};

use crate::audio::domain::audio_reader::AudioReader;
use crate::audio::domain::speech_recognizer::{RecognizeError, SpeechRecognizer};
use crate::manifest::domain::manifest_rows::TranscriptRow;
use crate::manifest::infrastructure::csv_manifest::IncrementalManifest;
use crate::pipeline::progress_reporter::{percent, ProgressReporter};
use crate::pipeline::split_sources::audio_files;
use crate::pipeline::task_error::TaskError;
use crate::queue::domain::task_request::ValidationError;
use crate::shared::constants::TRANSCRIBE_EXTENSIONS;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranscribeOutcome {
    pub manifest_path: PathBuf,
    pub transcribed: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct TranscribeUseCase {
    reader: Box<dyn AudioReader>,
    recognizer: Box<dyn SpeechRecognizer>,
}

impl TranscribeUseCase {
    pub fn new(reader: Box<dyn AudioReader>, recognizer: Box<dyn SpeechRecognizer>) -> Self {
        Self { reader, recognizer }
    }

    /// Transcribe every audio file in `folder` in name order, saving the
    /// manifest after each file.
    ///
    /// A file that fails is recorded as an `[ERROR: …]` row. An exhausted
    /// quota or an unavailable recognizer stops the run after saving.
    pub fn run(
        &mut self,
        folder: &Path,
        manifest_path: &Path,
        progress: &mut dyn ProgressReporter,
    ) -> Result<TranscribeOutcome, TaskError> {
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

        let total = files.len();
        progress.report(&format!("Found {total} audio files to transcribe"), Some(0));

        let mut manifest = IncrementalManifest::open(manifest_path)?;
        let mut outcome = TranscribeOutcome {
            manifest_path: manifest_path.to_path_buf(),
            ..Default::default()
        };

        for (i, path) in files.iter().enumerate() {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            if manifest.contains(&name) {
                outcome.skipped += 1;
                progress.report(
                    &format!("Skipping {name} (Already transcribed)"),
                    Some(percent(i, total)),
                );
                continue;
            }
            progress.report(&format!("Transcribing {name}..."), Some(percent(i, total)));

            match self.transcribe_file(path) {
                Ok(text) => {
                    outcome.transcribed += 1;
                    manifest.push(TranscriptRow::new(&name, text));
                }
                Err(e @ (RecognizeError::QuotaExhausted(_) | RecognizeError::Unavailable(_))) => {
                    log::error!("Stopping transcription at {name}: {e}");
                    manifest.save()?;
                    return Err(e.into());
                }
                Err(e) => {
                    log::error!("Error transcribing {name}: {e}");
                    outcome.failed += 1;
                    manifest.push(TranscriptRow::failed(&name, e));
                }
            }
            manifest.save()?;
        }

        progress.report(
            &format!("Transcription complete! Saved to {}", manifest_path.display()),
            Some(100),
        );
        Ok(outcome)
    }

    fn transcribe_file(&self, path: &Path) -> Result<String, RecognizeError> {
        let audio = self
            .reader
            .read_audio(path, self.recognizer.sample_rate())
            .map_err(|e| RecognizeError::Failed(e.to_string()))?
            .ok_or_else(|| RecognizeError::Failed("no audio track".to_string()))?;
        let transcript = self.recognizer.transcribe(&audio)?;
        Ok(transcript.text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::domain::audio_segment::AudioSegment;
    use crate::audio::domain::transcript::Transcript;
    use crate::manifest::infrastructure::csv_manifest::read_rows;
    use crate::pipeline::progress_reporter::LogProgress;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    // ─── Stubs ───

    /// Encodes the file name length into the sample count so the
    /// recognizer stub can tell files apart.
    struct StubAudioReader;

    impl AudioReader for StubAudioReader {
        fn read_audio(
            &self,
            path: &Path,
            rate: u32,
        ) -> Result<Option<AudioSegment>, Box<dyn std::error::Error>> {
            let name = path.file_name().unwrap().to_str().unwrap();
            if name.starts_with("silent") {
                return Ok(None);
            }
            Ok(Some(AudioSegment::new(vec![0.0; name.len()], rate, 1)))
        }

        fn audio_metadata(
            &self,
            _: &Path,
        ) -> Result<Option<(u32, u16)>, Box<dyn std::error::Error>> {
            Ok(Some((16000, 1)))
        }
    }

    type MakeError = fn() -> RecognizeError;

    fn server_error() -> RecognizeError {
        RecognizeError::Failed("HTTP 500".to_string())
    }

    fn out_of_credits() -> RecognizeError {
        RecognizeError::QuotaExhausted("HTTP 401".to_string())
    }

    /// Answers by sample count; counts calls.
    struct StubRecognizer {
        answers: HashMap<usize, Result<&'static str, MakeError>>,
        calls: Arc<Mutex<usize>>,
    }

    impl SpeechRecognizer for StubRecognizer {
        fn transcribe(&self, audio: &AudioSegment) -> Result<Transcript, RecognizeError> {
            *self.calls.lock().unwrap() += 1;
            match self.answers.get(&audio.samples().len()) {
                Some(Ok(text)) => Ok(Transcript {
                    text: format!(" {text} "),
                    words: Vec::new(),
                }),
                Some(Err(make)) => Err(make()),
                None => Ok(Transcript::default()),
            }
        }
    }

    fn setup(files: &[&str]) -> (TempDir, PathBuf, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let folder = tmp.path().join("clips");
        fs::create_dir(&folder).unwrap();
        for f in files {
            fs::write(folder.join(f), b"").unwrap();
        }
        let manifest = tmp.path().join("out").join("transcription.csv");
        (tmp, folder, manifest)
    }

    fn use_case(
        answers: Vec<(usize, Result<&'static str, MakeError>)>,
        calls: Arc<Mutex<usize>>,
    ) -> TranscribeUseCase {
        TranscribeUseCase::new(
            Box::new(StubAudioReader),
            Box::new(StubRecognizer {
                answers: answers.into_iter().collect(),
                calls,
            }),
        )
    }

    #[test]
    fn test_transcribes_in_name_order() {
        let (_tmp, folder, manifest) = setup(&["b.wav", "aa.mp3", "notes.txt"]);
        let mut uc = use_case(vec![(5, Ok("hello")), (6, Ok("world"))], Arc::default());
        let mut progress = LogProgress::new();

        let outcome = uc.run(&folder, &manifest, &mut progress).unwrap();

        assert_eq!(outcome.transcribed, 2);
        let rows: Vec<TranscriptRow> = read_rows(&manifest).unwrap();
        assert_eq!(
            rows,
            vec![TranscriptRow::new("aa.mp3", "world"), TranscriptRow::new("b.wav", "hello")]
        );
        let messages: Vec<_> = progress.messages().iter().map(|(m, _)| m.clone()).collect();
        assert_eq!(messages[0], "Found 2 audio files to transcribe");
        assert_eq!(messages[1], "Transcribing aa.mp3...");
        assert!(messages[3].starts_with("Transcription complete! Saved to"));
    }

    #[test]
    fn test_failures_become_error_rows() {
        let (_tmp, folder, manifest) = setup(&["a.wav", "silent.wav", "cc.wav"]);
        let mut uc = use_case(vec![(5, Err(server_error as MakeError))], Arc::default());

        let outcome = uc.run(&folder, &manifest, &mut LogProgress::new()).unwrap();

        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.transcribed, 1);
        let rows: Vec<TranscriptRow> = read_rows(&manifest).unwrap();
        assert!(rows[0].is_error());
        assert!(rows[0].text.contains("HTTP 500"));
        assert_eq!(rows[2].text, "[ERROR: transcription failed: no audio track]");
    }

    #[test]
    fn test_quota_exhaustion_saves_then_fails() {
        let (_tmp, folder, manifest) = setup(&["a.wav", "bb.wav", "ccc.wav"]);
        let calls = Arc::new(Mutex::new(0));
        let mut uc = use_case(
            vec![
                (5, Ok("first")),
                (6, Err(out_of_credits as MakeError)),
            ],
            calls.clone(),
        );

        let err = uc.run(&folder, &manifest, &mut LogProgress::new()).unwrap_err();

        assert!(matches!(err, TaskError::Recognize(RecognizeError::QuotaExhausted(_))));
        assert_eq!(*calls.lock().unwrap(), 2);
        let rows: Vec<TranscriptRow> = read_rows(&manifest).unwrap();
        assert_eq!(rows, vec![TranscriptRow::new("a.wav", "first")]);
    }

    #[test]
    fn test_rerun_skips_finished_files() {
        let (_tmp, folder, manifest) = setup(&["a.wav", "bb.wav"]);
        fs::create_dir_all(manifest.parent().unwrap()).unwrap();
        fs::write(&manifest, "filename,text\na.wav,done before\n").unwrap();
        let calls = Arc::new(Mutex::new(0));
        let mut uc = use_case(vec![(6, Ok("new"))], calls.clone());

        let outcome = uc.run(&folder, &manifest, &mut LogProgress::new()).unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(*calls.lock().unwrap(), 1);
        let rows: Vec<TranscriptRow> = read_rows(&manifest).unwrap();
        assert_eq!(rows[0].text, "done before");
        assert_eq!(rows[1].text, "new");
    }

    #[test]
    fn test_missing_folder() {
        let (tmp, _folder, manifest) = setup(&[]);
        let mut uc = use_case(Vec::new(), Arc::default());
        let err = uc
            .run(&tmp.path().join("nope"), &manifest, &mut LogProgress::new())
            .unwrap_err();
        assert!(matches!(err, TaskError::Validation(ValidationError::FolderNotFound(_))));
    }
}
