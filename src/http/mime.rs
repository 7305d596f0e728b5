//! MIME type detection module
//!
//! A fixed table for common web assets is consulted first; everything else
//! falls back to extension-based inference from `mime_guess`.

use std::path::Path;

/// Content types that take precedence over default inference
///
/// Default inference labels `.js` as `text/javascript` and some platforms
/// register odd types for the others.
pub const WEB_ASSET_OVERRIDES: [(&str, &str); 4] = [
    ("js", "application/javascript"),
    ("css", "text/css"),
    ("json", "application/json"),
    ("ico", "image/x-icon"),
];

/// Look up an extension in the override table (case-insensitive)
pub fn override_for(extension: Option<&str>) -> Option<&'static str> {
    let extension = extension?;
    WEB_ASSET_OVERRIDES
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, content_type)| *content_type)
}

/// Default extension-based inference, `application/octet-stream` when unknown
pub fn default_content_type(path: &Path) -> &'static str {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
}

/// Get the Content-Type for a file path
///
/// # Examples
/// ```
/// use devserve::http::mime::get_content_type;
/// use std::path::Path;
/// assert_eq!(get_content_type(Path::new("app.js"), true), "application/javascript");
/// assert_eq!(get_content_type(Path::new("index.html"), true), "text/html");
/// ```
pub fn get_content_type(path: &Path, use_overrides: bool) -> &'static str {
    if use_overrides {
        if let Some(content_type) = override_for(path.extension().and_then(|e| e.to_str())) {
            return content_type;
        }
    }
    default_content_type(path)
}
