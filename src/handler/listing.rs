//! Directory listing page

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt::Write;
use std::path::Path;

/// Characters escaped in a single path segment of a link
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/');

/// Generate HTML directory listing
///
/// Entries are sorted case-insensitively; directories get a trailing `/`.
pub async fn generate_listing(dir: &Path, display_path: &str) -> std::io::Result<String> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
        names.push((name, is_dir));
    }
    names.sort_by_key(|(name, _)| name.to_lowercase());

    let title = escape_html(display_path);
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Directory listing for {title}</title>\n</head>\n<body>\n\
         <h1>Directory listing for {title}</h1>\n<hr>\n<ul>\n"
    );

    if display_path != "/" {
        html.push_str("<li><a href=\"../\">../</a></li>\n");
    }

    for (name, is_dir) in &names {
        let suffix = if *is_dir { "/" } else { "" };
        let _ = writeln!(
            html,
            "<li><a href=\"{}{suffix}\">{}{suffix}</a></li>",
            utf8_percent_encode(name, SEGMENT),
            escape_html(name),
        );
    }

    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    Ok(html)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
