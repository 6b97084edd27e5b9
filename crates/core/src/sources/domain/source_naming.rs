/// Collection name derived from a source URL.
///
/// - `…/watch?v=<id>` → `video_<id>`
/// - `…list=<id>` → `playlist_<id>`
/// - `…/@<handle>/…` → `<handle>`
/// - anything else → `scraped_data`
pub fn name_prefix(url: &str) -> String {
    if url.contains("/watch?v=") {
        let id = query_value(url, "v=");
        if !id.is_empty() {
            return format!("video_{id}");
        }
    }
    if url.contains("list=") {
        let id = query_value(url, "list=");
        if !id.is_empty() {
            return format!("playlist_{id}");
        }
    }
    if let Some((_, rest)) = url.rsplit_once('@') {
        let handle = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if !handle.is_empty() {
            return sanitize(handle);
        }
    }
    "scraped_data".to_string()
}

/// Make `raw` safe as a file-name component.
pub fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(['.', '_']);
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

fn query_value<'a>(url: &'a str, key: &str) -> &'a str {
    url.rsplit(key)
        .next()
        .and_then(|v| v.split(['&', '#']).next())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::video("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42", "video_dQw4w9WgXcQ")]
    #[case::playlist("https://www.youtube.com/playlist?list=PLabc123", "playlist_PLabc123")]
    #[case::video_in_playlist("https://www.youtube.com/watch?v=abc&list=PLxyz", "video_abc")]
    #[case::channel("https://www.youtube.com/@SomeChannel/videos", "SomeChannel")]
    #[case::other("https://example.com/audio", "scraped_data")]
    fn test_name_prefix(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(name_prefix(url), expected);
    }

    #[rstest]
    #[case::spaces("My Talk: Part 1", "My_Talk__Part_1")]
    #[case::path("../etc/passwd", "etc_passwd")]
    #[case::empty("///", "untitled")]
    fn test_sanitize(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(sanitize(raw), expected);
    }
}
