use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::domain::audio_reader::AudioReader;
use crate::audio::domain::audio_segment::AudioSegment;
use crate::audio::domain::clip_writer::ClipWriter;
use crate::audio::domain::segment_planner::SegmentPlanner;
use crate::audio::domain::silence_splitter::SilenceSplitter;
use crate::audio::domain::speech_segment::SpeechSegment;
use crate::audio::domain::voice_activity_detector::VoiceActivityDetector;
use crate::manifest::domain::manifest_rows::ClipRow;
use crate::manifest::infrastructure::csv_manifest::write_rows;
use crate::pipeline::progress_reporter::{percent, ProgressReporter};
use crate::pipeline::split_sources::{SourceEntry, SplitJob};
use crate::pipeline::task_error::TaskError;
use crate::shared::constants::{CLIP_PADDING_MS, TARGET_DBFS};

/// Summary of one segmentation run.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitOutcome {
    pub manifest_path: PathBuf,
    pub rows: Vec<ClipRow>,
    /// Clips exported by this run (resumed sources excluded).
    pub clips_written: usize,
}

pub struct SplitAudioUseCase {
    reader: Box<dyn AudioReader>,
    writer: Box<dyn ClipWriter>,
    detector: Option<Box<dyn VoiceActivityDetector>>,
    planner: SegmentPlanner,
    fallback: SilenceSplitter,
    clips_dir: PathBuf,
}

impl SplitAudioUseCase {
    pub fn new(
        reader: Box<dyn AudioReader>,
        writer: Box<dyn ClipWriter>,
        detector: Option<Box<dyn VoiceActivityDetector>>,
        planner: SegmentPlanner,
        clips_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            reader,
            writer,
            detector,
            planner,
            fallback: SilenceSplitter::default(),
            clips_dir: clips_dir.into(),
        }
    }

    pub fn with_fallback(mut self, fallback: SilenceSplitter) -> Self {
        self.fallback = fallback;
        self
    }

    /// Segment every source of `job` and write the clip manifest once at
    /// the end. A source that fails is logged and left out.
    pub fn run(
        &mut self,
        job: &SplitJob,
        manifest_path: &Path,
        progress: &mut dyn ProgressReporter,
    ) -> Result<SplitOutcome, TaskError> {
        fs::create_dir_all(&self.clips_dir).map_err(|e| TaskError::io(&self.clips_dir, e))?;

        let total = job.sources.len();
        let mut rows = Vec::new();
        let mut clips_written = 0;

        for (i, source) in job.sources.iter().enumerate() {
            progress.report(
                &format!("Processing source {}/{}: {}", i + 1, total, source.title),
                Some(percent(i, total)),
            );

            if self.clip_path(&source.name, 0).exists() {
                progress.report(
                    &format!("Skipping {} (Already processed)", source.title),
                    Some(percent(i, total)),
                );
                let existing = existing_clips(&self.clips_dir, &source.name);
                rows.extend(existing.into_iter().map(|clip| row(job, source, clip)));
                continue;
            }

            let Some(path) = source.path.as_deref() else {
                log::warn!("Audio for '{}' not found, skipping", source.title);
                progress.report(
                    &format!("Skipping {} (Audio file not found)", source.title),
                    Some(percent(i, total)),
                );
                continue;
            };

            match self.split_source(path, &source.name) {
                Ok(clips) => {
                    log::info!("{}: {} clips", source.title, clips.len());
                    clips_written += clips.len();
                    rows.extend(clips.into_iter().map(|clip| row(job, source, clip)));
                }
                Err(e) => log::error!("Failed to split '{}': {e}", path.display()),
            }
        }

        progress.report("Finalizing...", Some(100));
        write_rows(manifest_path, &rows)?;

        Ok(SplitOutcome {
            manifest_path: manifest_path.to_path_buf(),
            rows,
            clips_written,
        })
    }

    /// Export the clips of one recording; returns their stems in order.
    pub fn split_source(&mut self, path: &Path, name: &str) -> Result<Vec<String>, TaskError> {
        let audio = match self
            .reader
            .read_audio_native(path)
            .map_err(TaskError::collaborator)?
        {
            Some(a) => a,
            None => {
                log::warn!("{} has no audio track", path.display());
                return Ok(Vec::new());
            }
        };

        let segments = match self.detect_speech(path).map(|raw| self.planner.plan(&raw)) {
            Some(planned) if !planned.is_empty() => planned,
            detected => {
                if detected.is_some() {
                    log::info!(
                        "No usable speech in {}, using silence splitter",
                        path.display()
                    );
                }
                self.planner
                    .constrain(&self.fallback.detect_nonsilent(&audio))
            }
        };

        let mut clips = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            let clip = export_clip(&audio, segment);
            let clip_path = self.clip_path(name, index);
            self.writer
                .write_clip(&clip_path, &clip)
                .map_err(TaskError::collaborator)?;
            clips.push(clip_name(name, index));
        }
        Ok(clips)
    }

    /// Speech intervals from the detector, or `None` when the fallback
    /// splitter should be used instead.
    fn detect_speech(&mut self, path: &Path) -> Option<Vec<SpeechSegment>> {
        let detector = self.detector.as_mut()?;
        let audio = match self.reader.read_audio(path, detector.sample_rate()) {
            Ok(Some(a)) => a,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Decoding for voice detection failed: {e}");
                return None;
            }
        };
        match detector.detect(&audio) {
            Ok(segments) if !segments.is_empty() => Some(segments),
            Ok(_) => {
                log::info!("No speech detected in {}, using silence splitter", path.display());
                None
            }
            Err(e) => {
                log::warn!("Voice detection failed, using silence splitter: {e}");
                None
            }
        }
    }

    fn clip_path(&self, name: &str, index: usize) -> PathBuf {
        self.clips_dir.join(format!("{}.wav", clip_name(name, index)))
    }
}

fn clip_name(name: &str, index: usize) -> String {
    format!("{name}_chunk_{index}")
}

/// Pad with silence and normalize loudness.
fn export_clip(audio: &AudioSegment, segment: &SpeechSegment) -> AudioSegment {
    audio
        .slice_ms(segment.start_ms, segment.end_ms)
        .padded(CLIP_PADDING_MS)
        .normalized(TARGET_DBFS)
}

fn row(job: &SplitJob, source: &SourceEntry, clip_name: String) -> ClipRow {
    ClipRow {
        collection: job.collection.clone(),
        source_title: source.title.clone(),
        source_name: source.name.clone(),
        clip_name,
        voice: source.voice.clone(),
    }
}

/// Stems of `<name>_chunk_<n>.wav` files already in `dir`, by index.
fn existing_clips(dir: &Path, name: &str) -> Vec<String> {
    let prefix = format!("{name}_chunk_");
    let mut found: Vec<(usize, String)> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| {
                    let file_name = e.file_name().to_str()?.to_string();
                    let stem = file_name.strip_suffix(".wav")?;
                    let index = stem.strip_prefix(&prefix)?.parse().ok()?;
                    Some((index, stem.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();
    found.sort();
    found.into_iter().map(|(_, stem)| stem).collect()
}
