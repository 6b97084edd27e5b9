use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

use crate::sources::domain::source_item::SourceItem;
use crate::sources::domain::source_lister::SourceLister;

/// Lists and downloads sources by shelling out to `yt-dlp`.
#[derive(Debug, Clone)]
pub struct YtDlpLister {
    program: PathBuf,
}

impl Default for YtDlpLister {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlpLister {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String, Box<dyn std::error::Error>> {
        log::debug!("Running {} {}", self.program.display(), args.join(" "));
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| format!("Failed to run {}: {e}", self.program.display()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl SourceLister for YtDlpLister {
    fn list_sources(&self, url: &str) -> Result<Vec<SourceItem>, Box<dyn std::error::Error>> {
        let stdout = self.run(&["--flat-playlist", "--dump-json", "--no-warnings", url])?;
        Ok(parse_listing(&stdout))
    }

    fn download_audio(
        &self,
        item: &SourceItem,
        dest_dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        fs::create_dir_all(dest_dir)?;
        let template = dest_dir.join(format!("{stem}.%(ext)s"));
        let template = template.to_str().ok_or("Non UTF-8 download path")?;
        self.run(&[
            "--no-playlist",
            "--no-warnings",
            "-f",
            "bestaudio/best",
            "-x",
            "--audio-format",
            "wav",
            "-o",
            template,
            &item.url,
        ])?;

        let expected = dest_dir.join(format!("{stem}.wav"));
        if expected.exists() {
            return Ok(expected);
        }
        find_with_stem(dest_dir, stem)
            .ok_or_else(|| format!("yt-dlp produced no file for {}", item.url).into())
    }
}

/// Parse `--dump-json` output: one JSON object per line.
fn parse_listing(stdout: &str) -> Vec<SourceItem> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<Value>(line) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Skipping unparsable yt-dlp entry: {e}");
                None
            }
        })
        .filter_map(|entry| {
            let id = entry.get("id")?.as_str()?.to_string();
            let url = entry
                .get("webpage_url")
                .or_else(|| entry.get("url"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={id}"));
            let title = entry
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(id.as_str())
                .to_string();
            Some(SourceItem {
                id,
                title,
                url,
                duration_secs: entry.get("duration").and_then(Value::as_f64),
            })
        })
        .collect()
}

/// Finished download named `<stem>.<ext>` in `dir`, ignoring partial files.
pub fn find_with_stem(dir: &Path, stem: &str) -> Option<PathBuf> {
    let mut matches: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_stem().and_then(|s| s.to_str()) == Some(stem)
                && p.extension().is_some_and(|ext| ext != "part")
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}
