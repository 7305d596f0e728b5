// Application state module
// Immutable per-process state shared by every connection task

use std::path::PathBuf;

use super::types::Config;
use crate::error::ServerError;
use crate::http::headers::ResponseDecorator;

/// Application state
///
/// Built once at startup and handed to each connection behind an `Arc`.
/// Nothing in here changes while the server runs.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Config,
    /// Canonical serving root, fixed for the process lifetime
    pub root: PathBuf,
    pub decorator: ResponseDecorator,
}

impl AppState {
    pub fn new(config: Config, root: PathBuf) -> Result<Self, ServerError> {
        let decorator = ResponseDecorator::from_config(&config.http)?;
        Ok(Self {
            config,
            root,
            decorator,
        })
    }
}
