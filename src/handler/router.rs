//! Request dispatch module
//!
//! Entry point for HTTP request processing: method check, dispatch to the
//! file server, header decoration and access logging.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_modified_since: Option<String>,
    pub if_none_match: Option<String>,
}

impl<'a> RequestContext<'a> {
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };

        Self {
            path: req.uri().path(),
            query: req.uri().query(),
            is_head: req.method() == Method::HEAD,
            if_modified_since: header("if-modified-since"),
            if_none_match: header("if-none-match"),
        }
    }
}

/// Main entry point for HTTP request handling
///
/// The request body is never read, so any body type is accepted.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let ctx = RequestContext::from_request(&req);

    let response = match req.method() {
        &Method::GET | &Method::HEAD => static_files::serve(&ctx, &state).await,
        &Method::OPTIONS => http::build_options_response(),
        method => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            http::build_405_response()
        }
    };

    let response = state.decorator.decorate(response);

    if state.config.logging.access_log {
        let entry = access_log_entry(&req, &response, remote_addr, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Collect the access log fields for a finished exchange
fn access_log_entry<B>(
    req: &Request<B>,
    response: &Response<Full<Bytes>>,
    remote_addr: SocketAddr,
    started: Instant,
) -> AccessLogEntry {
    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().to_string(), ToString::to_string);
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        req.method().to_string(),
        target,
    );
    entry.http_version = format!("{:?}", req.version());
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::BodyExt;

    fn test_state(root: &std::path::Path, config: Config) -> Arc<AppState> {
        Arc::new(AppState::new(config, root.canonicalize().unwrap()).unwrap())
    }

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.logging.access_log = false;
        config
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    async fn get(state: &Arc<AppState>, uri: &str) -> Response<Full<Bytes>> {
        let req = Request::get(uri).body(()).unwrap();
        handle_request(req, Arc::clone(state), peer()).await.unwrap()
    }

    async fn body_string(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn assert_decorated(resp: &Response<Full<Bytes>>) {
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
        let cache = resp.headers()["cache-control"].to_str().unwrap();
        assert!(cache.contains("no-store") && cache.contains("no-cache"), "{cache}");
    }

    #[tokio::test]
    async fn test_serves_js_with_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1);").unwrap();
        let state = test_state(dir.path(), quiet_config());

        let resp = get(&state, "/app.js").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["content-type"], "application/javascript");
        assert!(resp.headers().contains_key("last-modified"));
        assert_decorated(&resp);
        assert_eq!(body_string(resp).await, "console.log(1);");
    }

    #[tokio::test]
    async fn test_missing_file_is_decorated_404() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), quiet_config());

        let resp = get(&state, "/missing.html").await;
        assert_eq!(resp.status(), 404);
        assert_decorated(&resp);
    }

    #[tokio::test]
    async fn test_html_uses_default_inference() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page.html"), "<p>hi</p>").unwrap();
        let state = test_state(dir.path(), quiet_config());

        let resp = get(&state, "/page.html").await;
        assert_eq!(
            resp.headers()["content-type"],
            crate::http::mime::default_content_type(std::path::Path::new("page.html"))
        );
    }

    #[tokio::test]
    async fn test_overrides_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "1").unwrap();
        let mut config = quiet_config();
        config.http.mime_overrides = false;
        let state = test_state(dir.path(), config);

        let resp = get(&state, "/app.js").await;
        assert_eq!(
            resp.headers()["content-type"],
            crate::http::mime::default_content_type(std::path::Path::new("app.js"))
        );
    }

    #[tokio::test]
    async fn test_directory_redirect_and_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/index.html"), "<h1>docs</h1>").unwrap();
        let state = test_state(dir.path(), quiet_config());

        let resp = get(&state, "/docs?x=1").await;
        assert_eq!(resp.status(), 301);
        assert_eq!(resp.headers()["location"], "/docs/?x=1");
        assert_decorated(&resp);

        let resp = get(&state, "/docs/").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body_string(resp).await, "<h1>docs</h1>");
    }

    #[tokio::test]
    async fn test_directory_listing_toggle() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "n").unwrap();

        let state = test_state(dir.path(), quiet_config());
        let resp = get(&state, "/").await;
        assert_eq!(resp.status(), 200);
        assert!(body_string(resp).await.contains("notes.txt"));

        let mut config = quiet_config();
        config.http.directory_listing = false;
        let state = test_state(dir.path(), config);
        let resp = get(&state, "/").await;
        assert_eq!(resp.status(), 403);
        assert_decorated(&resp);
    }

    #[tokio::test]
    async fn test_file_with_trailing_slash_is_404() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        let state = test_state(dir.path(), quiet_config());

        assert_eq!(get(&state, "/a.txt/").await.status(), 404);
    }

    #[tokio::test]
    async fn test_traversal_stays_in_root() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), "secret").unwrap();
        std::fs::create_dir(outer.path().join("site")).unwrap();
        let state = test_state(&outer.path().join("site"), quiet_config());

        let resp = get(&state, "/../secret.txt").await;
        assert_eq!(resp.status(), 404);
        let resp = get(&state, "/%2e%2e/secret.txt").await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("style.css"), "body{}").unwrap();
        let state = test_state(dir.path(), quiet_config());

        let req = Request::head("/style.css").body(()).unwrap();
        let resp = handle_request(req, state, peer()).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["content-type"], "text/css");
        assert_eq!(resp.headers()["content-length"], "6");
        assert_eq!(body_string(resp).await, "");
    }

    #[tokio::test]
    async fn test_if_modified_since_gives_304() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.json"), "{}").unwrap();
        let state = test_state(dir.path(), quiet_config());

        let first = get(&state, "/data.json").await;
        let last_modified = first.headers()["last-modified"].clone();

        let req = Request::get("/data.json")
            .header("If-Modified-Since", last_modified)
            .body(())
            .unwrap();
        let resp = handle_request(req, Arc::clone(&state), peer()).await.unwrap();
        assert_eq!(resp.status(), 304);
        assert_decorated(&resp);
    }

    #[tokio::test]
    async fn test_other_methods() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), quiet_config());

        let req = Request::post("/").body(()).unwrap();
        let resp = handle_request(req, Arc::clone(&state), peer()).await.unwrap();
        assert_eq!(resp.status(), 405);
        assert_decorated(&resp);

        let req = Request::options("/app.js").body(()).unwrap();
        let resp = handle_request(req, state, peer()).await.unwrap();
        assert_eq!(resp.status(), 204);
        assert_decorated(&resp);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_file_is_decorated_403() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locked.js");
        std::fs::write(&path, "secret").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();
        // Root ignores file modes
        if std::fs::read(&path).is_ok() {
            return;
        }
        let state = test_state(dir.path(), quiet_config());

        let req = Request::get("/locked.js").body(()).unwrap();
        let started = Instant::now();
        let resp = get(&state, "/locked.js").await;
        assert_eq!(resp.status(), 403);
        assert_decorated(&resp);
        assert_eq!(
            access_log_entry(&req, &resp, peer(), started).format("status"),
            "[FAIL] GET /locked.js HTTP/1.1 -> 403"
        );

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[tokio::test]
    async fn test_parent_segment_resolves_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        let state = test_state(dir.path(), quiet_config());

        let resp = get(&state, "/a/../b.txt").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body_string(resp).await, "b");
    }

    #[test]
    fn test_access_log_entry_fields() {
        let req = Request::get("/missing.html?v=2").body(()).unwrap();
        let resp = crate::http::build_404_response(false);
        let entry = access_log_entry(&req, &resp, peer(), Instant::now());

        assert_eq!(entry.request_line(), "GET /missing.html?v=2 HTTP/1.1");
        assert_eq!(entry.status, 404);
        assert_eq!(entry.body_bytes, 13);
        assert_eq!(entry.remote_addr, "127.0.0.1");
        assert_eq!(
            entry.format("status"),
            "[FAIL] GET /missing.html?v=2 HTTP/1.1 -> 404"
        );
    }
}
