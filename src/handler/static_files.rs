//! Static file serving module
//!
//! Maps request paths onto the serving root and builds file, redirect,
//! listing and error responses.

use crate::config::AppState;
use crate::handler::listing;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use percent_encoding::percent_decode_str;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Serve a GET/HEAD request from the serving root
pub async fn serve(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    let fs_path = resolve_path(&state.root, ctx.path);
    let wants_directory = ctx.path.ends_with('/');

    let metadata = match fs::metadata(&fs_path).await {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return read_error_response(&e, &fs_path, ctx.is_head);
        }
        // Missing files, and paths running through a regular file
        Err(_) => return http::build_404_response(ctx.is_head),
    };

    if metadata.is_dir() {
        if !wants_directory {
            return http::build_redirect_response(&directory_redirect_target(ctx.path, ctx.query));
        }
        return serve_directory(ctx, state, &fs_path).await;
    }

    if wants_directory {
        return http::build_404_response(ctx.is_head);
    }
    serve_file(ctx, state, &fs_path).await
}

/// Serve an index file from a directory, or list it
async fn serve_directory(
    ctx: &RequestContext<'_>,
    state: &AppState,
    dir: &Path,
) -> Response<Full<Bytes>> {
    for index_file in &state.config.http.index_files {
        let index_path = dir.join(index_file);
        if fs::metadata(&index_path).await.is_ok_and(|m| m.is_file()) {
            return serve_file(ctx, state, &index_path).await;
        }
    }

    if !state.config.http.directory_listing {
        return http::build_403_response(ctx.is_head);
    }

    match listing::generate_listing(dir, &decode_path(ctx.path)).await {
        Ok(html) => http::build_html_response(html, ctx.is_head),
        Err(e) => {
            logger::log_warning(&format!("Cannot list directory '{}': {e}", dir.display()));
            http::build_403_response(ctx.is_head)
        }
    }
}

/// Serve a single regular file
async fn serve_file(ctx: &RequestContext<'_>, state: &AppState, file_path: &Path) -> Response<Full<Bytes>> {
    let modified = fs::metadata(file_path).await.ok().and_then(|m| m.modified().ok());
    let last_modified = modified.map(cache::format_http_date);

    if let (Some(modified), Some(last_modified)) = (modified, last_modified.as_deref()) {
        if cache::is_not_modified(
            ctx.if_modified_since.as_deref(),
            ctx.if_none_match.as_deref(),
            modified,
        ) {
            return http::build_304_response(last_modified);
        }
    }

    let content = match fs::read(file_path).await {
        Ok(c) => c,
        Err(e) => return read_error_response(&e, file_path, ctx.is_head),
    };

    let content_type = mime::get_content_type(file_path, state.config.http.mime_overrides);
    http::build_file_response(
        Bytes::from(content),
        content_type,
        last_modified.as_deref(),
        ctx.is_head,
    )
}

/// Map a failed filesystem access on an existing path to 403 or 500
fn read_error_response(err: &std::io::Error, path: &Path, is_head: bool) -> Response<Full<Bytes>> {
    if err.kind() == ErrorKind::PermissionDenied {
        logger::log_warning(&format!("Permission denied: {}", path.display()));
        http::build_403_response(is_head)
    } else {
        logger::log_error(&format!("Failed to read file '{}': {err}", path.display()));
        http::build_500_response(is_head)
    }
}

/// Percent-decode a URL path (invalid UTF-8 is replaced, not rejected)
pub fn decode_path(url_path: &str) -> String {
    percent_decode_str(url_path).decode_utf8_lossy().into_owned()
}

/// Map a URL path onto the serving root
///
/// The decoded path is normalized first: empty and `.` segments are skipped
/// and `..` removes the previous segment, never climbing above `root`.
pub fn resolve_path(root: &Path, url_path: &str) -> PathBuf {
    let decoded = decode_path(url_path);
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split(is_separator) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    segments
        .into_iter()
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

#[cfg(windows)]
const fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

#[cfg(not(windows))]
const fn is_separator(c: char) -> bool {
    c == '/'
}

/// Same path with a trailing slash, query kept
fn directory_redirect_target(path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) => format!("{path}/?{q}"),
        None => format!("{path}/"),
    }
}
