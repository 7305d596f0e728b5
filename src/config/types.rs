// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served as `/`
    pub root: PathBuf,
    /// Resolve a relative `root` against the executable's directory instead of the cwd
    #[serde(default)]
    pub serve_from_exe_dir: bool,
    pub workers: Option<usize>,
}

/// HTTP behavior configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Value of `Access-Control-Allow-Origin` on every response
    pub cors_allow_origin: String,
    /// Value of `Cache-Control` on every response
    pub cache_control: String,
    /// Apply the fixed web-asset MIME table before default inference
    pub mime_overrides: bool,
    /// List directories without an index file (403 otherwise)
    pub directory_listing: bool,
    pub index_files: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub access_log: bool,
    /// Access log format (status, combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "status".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Upper bound on a connection's lifetime in seconds, 0 disables it
    pub connection_timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                root: PathBuf::from("."),
                serve_from_exe_dir: false,
                workers: None,
            },
            http: HttpConfig {
                cors_allow_origin: "*".to_string(),
                cache_control: "no-store, no-cache, must-revalidate, max-age=0".to_string(),
                mime_overrides: true,
                directory_listing: true,
                index_files: vec!["index.html".to_string(), "index.htm".to_string()],
            },
            logging: LoggingConfig {
                access_log: true,
                access_log_format: default_access_log_format(),
                access_log_file: None,
                error_log_file: None,
            },
            performance: PerformanceConfig {
                keep_alive: true,
                connection_timeout: 0,
            },
        }
    }
}
