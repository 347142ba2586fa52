//! MIME type guessing for submitted files.
//!
//! Only the extension is consulted; file contents are never sniffed.

use std::path::Path;

/// Extensions the upload panel advertises. Advisory only: other files are still accepted.
pub const ACCEPT_HINTS: [&str; 5] = ["tiff", "tif", "png", "csv", "json"];

const FALLBACK: &str = "application/octet-stream";

/// Guess a MIME type from a file name's extension.
pub fn guess_from_name(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("geojson") => "application/geo+json",
        Some("txt") | Some("log") => "text/plain",
        Some("xml") => "application/xml",
        _ => FALLBACK,
    }
}

pub fn is_image(mime_type: &str) -> bool {
    mime_type.trim().to_ascii_lowercase().starts_with("image/")
}

/// Whether `name` matches one of the advertised accept hints.
pub fn matches_accept_hint(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| ACCEPT_HINTS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
