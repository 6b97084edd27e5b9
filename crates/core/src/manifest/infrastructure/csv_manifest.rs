use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::manifest::domain::manifest_error::ManifestError;
use crate::manifest::domain::manifest_rows::TranscriptRow;

/// Write all rows with a header line, replacing `path` atomically.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), ManifestError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ManifestError::io(parent, e))?;
    }
    let staging = sibling(path, "tmp");
    {
        let mut writer =
            csv::Writer::from_path(&staging).map_err(|e| ManifestError::csv(&staging, e))?;
        for row in rows {
            writer
                .serialize(row)
                .map_err(|e| ManifestError::csv(&staging, e))?;
        }
        writer
            .flush()
            .map_err(|e| ManifestError::io(&staging, e))?;
    }
    fs::rename(&staging, path).map_err(|e| ManifestError::io(path, e))
}

/// Read all rows. A leading UTF-8 BOM (spreadsheet exports) is ignored.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ManifestError> {
    let raw = fs::read_to_string(path).map_err(|e| ManifestError::io(path, e))?;
    let content = raw.strip_prefix('\u{feff}').unwrap_or(raw.as_str());
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| ManifestError::csv(path, e))
}

/// Names of every `*.csv` directly inside `dir`, sorted. A missing
/// directory lists as empty.
pub fn list_manifests(dir: &Path) -> Result<Vec<String>, ManifestError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ManifestError::io(dir, e)),
    };
    let mut names = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ManifestError::io(dir, e))?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Transcription manifest saved after every file.
///
/// Each save first copies the previous manifest to `<name>.bak`, so an
/// interrupted write never loses more than the latest row. Rows loaded at
/// open time let a re-run skip files that are already transcribed; error
/// rows do not count as done and are replaced when the file is retried.
pub struct IncrementalManifest {
    path: PathBuf,
    rows: Vec<TranscriptRow>,
    done: HashSet<String>,
}

impl IncrementalManifest {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let path = path.into();
        let rows = if path.exists() {
            match read_rows::<TranscriptRow>(&path) {
                Ok(rows) => rows,
                Err(e) => {
                    log::warn!("{e}; recovering from backup");
                    let backup = Self::backup_path_for(&path);
                    if backup.exists() {
                        read_rows(&backup)?
                    } else {
                        return Err(e);
                    }
                }
            }
        } else {
            Vec::new()
        };
        let done = rows
            .iter()
            .filter(|r| !r.is_error())
            .map(|r| r.filename.clone())
            .collect();
        Ok(Self { path, rows, done })
    }

    fn backup_path_for(path: &Path) -> PathBuf {
        sibling(path, "bak")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        Self::backup_path_for(&self.path)
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.done.contains(filename)
    }

    pub fn rows(&self) -> &[TranscriptRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Record `row`, replacing an earlier row for the same file.
    pub fn push(&mut self, row: TranscriptRow) {
        if !row.is_error() {
            self.done.insert(row.filename.clone());
        }
        match self.rows.iter_mut().find(|r| r.filename == row.filename) {
            Some(existing) => *existing = row,
            None => self.rows.push(row),
        }
    }

    pub fn save(&self) -> Result<(), ManifestError> {
        if self.path.exists() {
            let backup = self.backup_path();
            fs::copy(&self.path, &backup).map_err(|e| ManifestError::io(&backup, e))?;
        }
        write_rows(&self.path, &self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::domain::manifest_rows::{ClipRow, ScrapeRow};
    use tempfile::TempDir;

    fn row(name: &str, text: &str) -> TranscriptRow {
        TranscriptRow {
            filename: name.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_write_then_read_rows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out").join("a_splitted.csv");
        let rows = vec![ClipRow {
            collection: "a".to_string(),
            source_title: "Talk, part 1".to_string(),
            source_name: "talk1".to_string(),
            clip_name: "talk1_chunk_0".to_string(),
            voice: "amy".to_string(),
        }];
        write_rows(&path, &rows).unwrap();

        let header = fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("collection,source_title,source_name,clip_name,voice"));
        assert_eq!(read_rows::<ClipRow>(&path).unwrap(), rows);
    }

    #[test]
    fn test_read_scrape_rows_with_bom_and_missing_columns() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x_metadata.csv");
        fs::write(
            &path,
            "\u{feff}channel_name,video_title,voice,audio_filename\nx,Hello,amy,abc\nx,NoFile,amy,\n",
        )
        .unwrap();

        let rows = read_rows::<ScrapeRow>(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].channel_name, "x");
        assert_eq!(rows[0].audio_filename.as_deref(), Some("abc"));
        assert_eq!(rows[1].audio_filename, None);
        assert_eq!(rows[1].video_link, "");
    }

    #[test]
    fn test_list_manifests_only_csv_sorted() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.csv"), "").unwrap();
        fs::write(tmp.path().join("a.CSV"), "").unwrap();
        fs::write(tmp.path().join("notes.txt"), "").unwrap();
        fs::create_dir(tmp.path().join("audio_datasets")).unwrap();

        assert_eq!(list_manifests(tmp.path()).unwrap(), vec!["a.CSV", "b.csv"]);
    }

    #[test]
    fn test_list_manifests_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(list_manifests(&tmp.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_incremental_save_keeps_backup_of_previous_save() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("transcription.csv");
        let mut manifest = IncrementalManifest::open(&path).unwrap();

        manifest.push(row("a.wav", "one"));
        manifest.save().unwrap();
        assert!(!manifest.backup_path().exists());

        manifest.push(row("b.wav", "two"));
        manifest.save().unwrap();

        assert_eq!(read_rows::<TranscriptRow>(&path).unwrap().len(), 2);
        assert_eq!(read_rows::<TranscriptRow>(&manifest.backup_path()).unwrap().len(), 1);
    }

    #[test]
    fn test_reopen_knows_finished_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("t.csv");
        let mut manifest = IncrementalManifest::open(&path).unwrap();
        manifest.push(row("a.wav", "one"));
        manifest.save().unwrap();

        let reopened = IncrementalManifest::open(&path).unwrap();
        assert!(reopened.contains("a.wav"));
        assert!(!reopened.contains("b.wav"));
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_error_rows_are_retried_in_place() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("t.csv");
        let mut manifest = IncrementalManifest::open(&path).unwrap();
        manifest.push(TranscriptRow::failed("a.wav", "HTTP 500"));
        manifest.push(row("b.wav", "two"));
        manifest.save().unwrap();

        let mut reopened = IncrementalManifest::open(&path).unwrap();
        assert!(!reopened.contains("a.wav"));
        assert!(reopened.contains("b.wav"));

        reopened.push(row("a.wav", "one"));
        assert_eq!(reopened.rows(), &[row("a.wav", "one"), row("b.wav", "two")]);
        assert!(reopened.contains("a.wav"));
    }

    #[test]
    fn test_corrupt_manifest_recovers_from_backup() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("t.csv");
        let mut manifest = IncrementalManifest::open(&path).unwrap();
        manifest.push(row("a.wav", "one"));
        manifest.save().unwrap();
        manifest.push(row("b.wav", "two"));
        manifest.save().unwrap();

        fs::write(&path, "filename,text\n\"unterminated").unwrap();
        let recovered = IncrementalManifest::open(&path).unwrap();
        assert_eq!(recovered.rows(), &[row("a.wav", "one")]);
    }
}
