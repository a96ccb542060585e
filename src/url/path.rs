use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

/// File name used for the site root and directory-like paths
const INDEX_FILE: &str = "index.html";

/// Maps a page or asset URL to a relative path inside a job directory
///
/// # Mapping Rules
///
/// 1. Take the URL path and drop the leading `/`
/// 2. Empty path → `index.html`
/// 3. Path ending in `/` → `<path>/index.html`
/// 4. Last segment without an extension → append `.html`
/// 5. Query string and fragment are ignored
///
/// Empty, `.` and `..` segments are dropped and backslashes/NUL are replaced,
/// so the result never escapes the job directory.
///
/// The function is total: input that does not parse as a URL gets a
/// content-addressed name `page-<sha256>.html`.
///
/// # Examples
///
/// ```
/// use site_mirror::url::resolve_path;
/// use std::path::PathBuf;
///
/// assert_eq!(resolve_path("https://example.com/"), PathBuf::from("index.html"));
/// assert_eq!(resolve_path("https://example.com/about"), PathBuf::from("about.html"));
/// assert_eq!(resolve_path("https://example.com/css/site.css"), PathBuf::from("css/site.css"));
/// ```
pub fn resolve_path(url: &str) -> PathBuf {
    match Url::parse(url) {
        Ok(parsed) => path_from_url(&parsed),
        Err(e) => {
            tracing::debug!("Using hashed filename for unparseable URL {:?}: {}", url, e);
            hashed_path(url)
        }
    }
}

fn path_from_url(url: &Url) -> PathBuf {
    let raw = url.path();
    let directory_like = raw.ends_with('/');

    let mut segments: Vec<String> = raw
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(sanitize_segment)
        .collect();

    if segments.is_empty() {
        return PathBuf::from(INDEX_FILE);
    }

    if directory_like {
        segments.push(INDEX_FILE.to_string());
    } else if let Some(last) = segments.last_mut() {
        if Path::new(last.as_str()).extension().is_none() {
            last.push_str(".html");
        }
    }

    segments.iter().collect()
}

/// Replaces characters that could be read as separators or terminators
fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| match c {
            '\\' | '\0' => '_',
            other => other,
        })
        .collect()
}

fn hashed_path(input: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    PathBuf::from(format!("page-{}.html", hex::encode(hasher.finalize())))
}
