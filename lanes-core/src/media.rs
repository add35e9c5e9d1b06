/// Upload and content-type helpers shared by the storage layer and the API.
use std::path::{Path, PathBuf};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Generate a unique filename by appending a counter if the file already exists.
pub fn dedup_filename(dir: &Path, filename: &str) -> PathBuf {
    let path = dir.join(filename);
    if !path.exists() {
        return path;
    }

    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let ext = Path::new(filename).extension().and_then(|s| s.to_str());

    for i in 1..1000 {
        let new_name = match ext {
            Some(e) => format!("{}-{}.{}", stem, i, e),
            None => format!("{}-{}", stem, i),
        };
        let new_path = dir.join(&new_name);
        if !new_path.exists() {
            return new_path;
        }
    }

    // Fallback: timestamp-based
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let new_name = match ext {
        Some(e) => format!("{}-{}.{}", stem, ts, e),
        None => format!("{}-{}", stem, ts),
    };
    dir.join(&new_name)
}

/// Lowercased extension of a path, if any.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_ascii_lowercase())
}

/// Map a file extension to its MIME content type.
pub fn content_type_for_ext(ext: Option<&str>) -> &'static str {
    match ext {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        Some("json") => "application/json",
        Some("md") | Some("markdown") => "text/markdown; charset=utf-8",
        Some("txt") | Some("log") => "text/plain; charset=utf-8",
        Some("csv") => "text/csv",
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Content type for a path, inferred from its extension.
pub fn content_type_for_path(path: &Path) -> &'static str {
    content_type_for_ext(extension_of(path).as_deref())
}

/// Whether a declared MIME type is an image type.
pub fn is_image_mime(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with("image/")
}

/// Characters left as-is in a URL path segment.
const URL_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode one path segment (a file name) for use in a URL.
pub fn url_segment(name: &str) -> String {
    utf8_percent_encode(name, URL_SEGMENT).to_string()
}

/// Reduce a client-supplied filename to a bare, non-hidden file name.
/// Returns `None` if nothing safe remains.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(|c| c == '/' || c == '\\').next()?.trim();
    if base.is_empty() || base.starts_with('.') || base.contains('\0') {
        return None;
    }
    Some(base.to_string())
}
