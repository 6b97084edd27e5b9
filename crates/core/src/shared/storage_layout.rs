use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory layout of a storage root shared by the front end and the worker.
///
/// ```text
/// <root>/jobs/                        pending task descriptors
/// <root>/progress/                    progress records (overwritten)
/// <root>/results/                     result records (write-once)
/// <root>/audios/                      scraped source audio
/// <root>/audios/splitted_audios/      exported clips
/// <root>/datasets_csv/                scrape manifests
/// <root>/datasets_csv/audio_datasets/ split manifests
/// <root>/datasets_csv/audio_text_datasets/ transcription manifests
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Platform data directory, e.g. `~/.local/share/speechset` on Linux.
    pub fn default_root() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("speechset"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.root.join("jobs")
    }

    pub fn progress_dir(&self) -> PathBuf {
        self.root.join("progress")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join("results")
    }

    pub fn audios_dir(&self) -> PathBuf {
        self.root.join("audios")
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.audios_dir().join("splitted_audios")
    }

    pub fn datasets_dir(&self) -> PathBuf {
        self.root.join("datasets_csv")
    }

    pub fn audio_datasets_dir(&self) -> PathBuf {
        self.datasets_dir().join("audio_datasets")
    }

    pub fn text_datasets_dir(&self) -> PathBuf {
        self.datasets_dir().join("audio_text_datasets")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    /// Resolve a payload folder: absolute paths are kept, relative ones are
    /// taken relative to the storage root.
    pub fn resolve(&self, folder: &str) -> PathBuf {
        let path = Path::new(folder);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Create every directory of the layout.
    pub fn ensure(&self) -> io::Result<()> {
        for dir in [
            self.jobs_dir(),
            self.progress_dir(),
            self.results_dir(),
            self.clips_dir(),
            self.audio_datasets_dir(),
            self.text_datasets_dir(),
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
