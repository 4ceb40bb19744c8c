//! Input validation and sanitization helpers.

/// File extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    ".mp4", ".avi", ".mov", ".mkv", ".wmv", ".flv", ".webm", ".m4v",
];

/// Check that an uploaded filename carries a supported media extension.
pub fn is_supported_media(filename: &str) -> bool {
    media_extension(filename).is_some()
}

/// The matching extension (with dot, lowercase) of a supported filename.
pub fn media_extension(filename: &str) -> Option<&'static str> {
    let lower = filename.to_lowercase();
    ALLOWED_EXTENSIONS
        .iter()
        .copied()
        .find(|ext| lower.ends_with(ext))
}

/// Derive the attachment filename for a finished conversion.
///
/// Client names are untrusted: anything resembling a path component is
/// stripped before the `.mp3` suffix is attached, so a hostile name can
/// never influence where the browser writes or header parsing.
pub fn download_filename(original: &str) -> String {
    let name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original);

    let stem = name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name);

    let clean: String = stem
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();

    if clean.is_empty() {
        return "download.mp3".to_string();
    }
    format!("{clean}.mp3")
}
