use std::path::{Path, PathBuf};

use super::source_item::SourceItem;

/// Domain interface for enumerating and fetching recordings behind a URL
/// (single video, playlist or channel).
pub trait SourceLister: Send {
    fn list_sources(&self, url: &str) -> Result<Vec<SourceItem>, Box<dyn std::error::Error>>;

    /// Download the audio of `item` into `dest_dir` as `<stem>.<ext>` and
    /// return the written path.
    fn download_audio(
        &self,
        item: &SourceItem,
        dest_dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, Box<dyn std::error::Error>>;
}
