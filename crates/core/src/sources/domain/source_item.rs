/// One downloadable recording found behind a source URL.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub duration_secs: Option<f64>,
}

impl SourceItem {
    /// Duration as `m:ss` (or `h:mm:ss`), `0:00` when unknown.
    pub fn duration_label(&self) -> String {
        let total = self.duration_secs.unwrap_or(0.0).max(0.0).round() as u64;
        let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
        if h > 0 {
            format!("{h}:{m:02}:{s:02}")
        } else {
            format!("{m}:{s:02}")
        }
    }
}
