//! Error types for devserve

use std::path::PathBuf;
use thiserror::Error;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Startup and runtime errors
///
/// Per-request failures never show up here; they are turned into HTTP
/// status codes by the handler.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Listener could not be bound (port in use, permission denied, ...)
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Serving root missing or not a directory
    #[error("Invalid serving root {}: {source}", .path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ServerError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
