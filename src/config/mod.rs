// Configuration module entry point
// Loads the server configuration and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::ServerError;

// Re-export public types
pub use state::AppState;
pub use types::{Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig};

/// Config file looked up when no path is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "devserve";

impl Config {
    /// Load configuration from the given file path (extension optional)
    ///
    /// The file is optional; `DEVSERVE_<SECTION>__<KEY>` environment
    /// variables override it, and anything left unset takes the defaults.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let settings = config::Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("server.root", defaults.server.root.to_string_lossy().into_owned())?
            .set_default("server.serve_from_exe_dir", defaults.server.serve_from_exe_dir)?
            .set_default("http.cors_allow_origin", defaults.http.cors_allow_origin)?
            .set_default("http.cache_control", defaults.http.cache_control)?
            .set_default("http.mime_overrides", defaults.http.mime_overrides)?
            .set_default("http.directory_listing", defaults.http.directory_listing)?
            .set_default("http.index_files", defaults.http.index_files)?
            .set_default("logging.access_log", defaults.logging.access_log)?
            .set_default("logging.access_log_format", defaults.logging.access_log_format)?
            .set_default("performance.keep_alive", defaults.performance.keep_alive)?
            .set_default("performance.connection_timeout", defaults.performance.connection_timeout)?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("DEVSERVE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ServerError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ServerError::Config(format!("Invalid address: {e}")))
    }

    /// Resolve the serving root to an absolute, canonical directory
    ///
    /// `exe_dir` is only consulted when `serve_from_exe_dir` is set and the
    /// configured root is relative.
    pub fn resolve_root(&self, exe_dir: Option<&Path>) -> Result<PathBuf, ServerError> {
        let root = &self.server.root;
        let candidate = match exe_dir {
            Some(dir) if self.server.serve_from_exe_dir && root.is_relative() => dir.join(root),
            _ => root.clone(),
        };

        let canonical = candidate
            .canonicalize()
            .map_err(|source| ServerError::Root { path: candidate.clone(), source })?;
        if !canonical.is_dir() {
            return Err(ServerError::Root {
                path: candidate,
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            });
        }
        Ok(canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("definitely-missing-devserve-config").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.http.cors_allow_origin, "*");
        assert!(cfg.http.cache_control.contains("no-store"));
        assert!(cfg.http.mime_overrides);
        assert!(cfg.http.directory_listing);
        assert_eq!(cfg.logging.access_log_format, "status");
        assert_eq!(cfg.performance.connection_timeout, 0);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9001\n\n[http]\nmime_overrides = false\n\n[logging]\naccess_log_format = \"combined\"\n",
        )
        .unwrap();

        let cfg = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9001);
        assert!(!cfg.http.mime_overrides);
        assert_eq!(cfg.logging.access_log_format, "combined");
        // untouched keys keep their defaults
        assert_eq!(cfg.http.index_files, vec!["index.html", "index.htm"]);
    }

    #[test]
    fn test_socket_addr() {
        let cfg = Config::default();
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 8080);

        let mut bad = Config::default();
        bad.server.host = "not a host".to_string();
        assert!(bad.get_socket_addr().is_err());
    }

    #[test]
    fn test_resolve_root_against_exe_dir() {
        let exe_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(exe_dir.path().join("site")).unwrap();

        let mut cfg = Config::default();
        cfg.server.root = PathBuf::from("site");
        cfg.server.serve_from_exe_dir = true;

        let root = cfg.resolve_root(Some(exe_dir.path())).unwrap();
        assert_eq!(root, exe_dir.path().join("site").canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_root_missing_dir() {
        let mut cfg = Config::default();
        cfg.server.root = PathBuf::from("/definitely/not/here");
        assert!(matches!(cfg.resolve_root(None), Err(ServerError::Root { .. })));
    }

    #[test]
    fn test_resolve_root_rejects_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut cfg = Config::default();
        cfg.server.root = file.path().to_path_buf();
        assert!(cfg.resolve_root(None).is_err());
    }
}
