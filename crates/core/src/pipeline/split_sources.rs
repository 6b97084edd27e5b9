use std::fs;
use std::path::{Path, PathBuf};

use crate::manifest::domain::manifest_rows::ScrapeRow;
use crate::manifest::infrastructure::csv_manifest::read_rows;
use crate::pipeline::task_error::TaskError;
use crate::queue::domain::task_request::ValidationError;

/// One recording to segment.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceEntry {
    pub title: String,
    /// Stem used for clip names.
    pub name: String,
    /// `None` when the recording could not be found on disk.
    pub path: Option<PathBuf>,
    pub voice: String,
}

/// Everything the segmentation use case needs for one run.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitJob {
    pub collection: String,
    pub sources: Vec<SourceEntry>,
    /// Folder the recordings live in.
    pub audio_dir: PathBuf,
}

impl SplitJob {
    pub fn manifest_name(&self) -> String {
        format!("{}_splitted.csv", self.collection)
    }

    /// Sources from a scrape manifest; audio is looked up in `audio_dir`.
    pub fn from_scrape_manifest(manifest: &Path, audio_dir: &Path) -> Result<Self, TaskError> {
        if !manifest.is_file() {
            return Err(ValidationError::Invalid(format!(
                "Manifest not found: {}",
                manifest.display()
            ))
            .into());
        }
        let file_name = manifest
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let collection = file_name
            .strip_suffix("_metadata.csv")
            .or_else(|| file_name.strip_suffix(".csv"))
            .unwrap_or(file_name)
            .to_string();

        let rows: Vec<ScrapeRow> = read_rows(manifest)?;
        let listing = list_dir(audio_dir);
        let sources = rows
            .into_iter()
            .filter_map(|row| {
                let Some(name) = row.audio_filename.filter(|n| !n.trim().is_empty()) else {
                    log::warn!("No audio file recorded for '{}', skipping", row.video_title);
                    return None;
                };
                let path = locate_audio(audio_dir, &listing, &name);
                Some(SourceEntry {
                    title: if row.video_title.is_empty() {
                        name.clone()
                    } else {
                        row.video_title
                    },
                    path,
                    name,
                    voice: non_empty_or(row.voice, "unknown"),
                })
            })
            .collect();

        Ok(Self {
            collection,
            sources,
            audio_dir: audio_dir.to_path_buf(),
        })
    }

    /// Every audio file with one of `extensions` directly inside `folder`.
    pub fn from_folder(folder: &Path, extensions: &[&str]) -> Result<Self, TaskError> {
        if !folder.is_dir() {
            return Err(ValidationError::FolderNotFound(folder.to_path_buf()).into());
        }
        let files = audio_files(folder, extensions)?;
        if files.is_empty() {
            return Err(ValidationError::Invalid(format!(
                "No audio files found in {}",
                folder.display()
            ))
            .into());
        }
        let collection = folder
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio")
            .to_string();
        let sources = files
            .into_iter()
            .map(|path| {
                let name = file_stem(&path);
                SourceEntry {
                    title: name.clone(),
                    name,
                    path: Some(path),
                    voice: "unknown".to_string(),
                }
            })
            .collect();
        Ok(Self {
            collection,
            sources,
            audio_dir: folder.to_path_buf(),
        })
    }
}

/// Audio files in `folder` (not recursive), sorted by name.
pub fn audio_files(folder: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, TaskError> {
    let entries = fs::read_dir(folder).map_err(|e| TaskError::io(folder, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_extension(p, extensions))
        .collect();
    files.sort();
    Ok(files)
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
}

fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().to_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// `<name>.wav`, then `<name>.mp3`, then the first file starting with `name`.
fn locate_audio(dir: &Path, listing: &[String], name: &str) -> Option<PathBuf> {
    for ext in ["wav", "mp3"] {
        let candidate = dir.join(format!("{name}.{ext}"));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    listing
        .iter()
        .filter(|f| !f.ends_with(".part") && !f.ends_with(".tmp"))
        .find(|f| f.starts_with(name))
        .map(|f| dir.join(f))
        .filter(|p| p.is_file())
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}
