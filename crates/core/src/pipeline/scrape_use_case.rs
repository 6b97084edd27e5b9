use std::path::PathBuf;

use crate::manifest::domain::manifest_rows::ScrapeRow;
use crate::manifest::infrastructure::csv_manifest::write_rows;
use crate::pipeline::progress_reporter::{percent, ProgressReporter};
use crate::pipeline::task_error::TaskError;
use crate::queue::domain::task_request::ScrapeRequest;
use crate::sources::domain::source_item::SourceItem;
use crate::sources::domain::source_lister::SourceLister;
use crate::sources::domain::source_naming::{name_prefix, sanitize};
use crate::sources::infrastructure::yt_dlp_lister::find_with_stem;

#[derive(Clone, Debug, PartialEq)]
pub struct ScrapeOutcome {
    pub manifest_path: PathBuf,
    pub csv_filename: String,
    pub rows: Vec<ScrapeRow>,
}

/// Lists the recordings behind a URL, downloads their audio and writes
/// `<prefix>_metadata.csv`.
pub struct ScrapeUseCase {
    lister: Box<dyn SourceLister>,
    audios_dir: PathBuf,
    datasets_dir: PathBuf,
}

impl ScrapeUseCase {
    pub fn new(
        lister: Box<dyn SourceLister>,
        audios_dir: impl Into<PathBuf>,
        datasets_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            lister,
            audios_dir: audios_dir.into(),
            datasets_dir: datasets_dir.into(),
        }
    }

    pub fn run(
        &self,
        request: &ScrapeRequest,
        progress: &mut dyn ProgressReporter,
    ) -> Result<ScrapeOutcome, TaskError> {
        let prefix = name_prefix(&request.source_url);
        let voice = request
            .label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(prefix.as_str())
            .to_string();

        progress.report(&format!("Collecting sources from {}", request.source_url), Some(0));
        let items = self
            .lister
            .list_sources(&request.source_url)
            .map_err(TaskError::collaborator)?;
        log::info!("{} sources found at {}", items.len(), request.source_url);

        std::fs::create_dir_all(&self.audios_dir).map_err(|e| TaskError::io(&self.audios_dir, e))?;

        let total = items.len();
        let mut rows = Vec::with_capacity(total);
        for (i, item) in items.iter().enumerate() {
            let stem = sanitize(&item.id);
            let audio_filename = if find_with_stem(&self.audios_dir, &stem).is_some() {
                progress.report(
                    &format!("Skipping {} (Already downloaded)", item.title),
                    Some(percent(i, total)),
                );
                Some(stem)
            } else {
                progress.report(
                    &format!("Downloading {}/{}: {}", i + 1, total, item.title),
                    Some(percent(i, total)),
                );
                self.download(item, &stem)
            };

            rows.push(ScrapeRow {
                channel_name: prefix.clone(),
                video_title: item.title.clone(),
                video_link: item.url.clone(),
                duration: item.duration_label(),
                voice: voice.clone(),
                audio_filename,
            });
        }

        progress.report("Finalizing...", Some(100));
        let csv_filename = format!("{prefix}_metadata.csv");
        let manifest_path = self.datasets_dir.join(&csv_filename);
        write_rows(&manifest_path, &rows)?;

        Ok(ScrapeOutcome {
            manifest_path,
            csv_filename,
            rows,
        })
    }

    fn download(&self, item: &SourceItem, stem: &str) -> Option<String> {
        match self.lister.download_audio(item, &self.audios_dir, stem) {
            Ok(path) => {
                log::debug!("Downloaded {}", path.display());
                Some(stem.to_string())
            }
            Err(e) => {
                log::warn!("Download of '{}' failed: {e}", item.url);
                None
            }
        }
    }
}
