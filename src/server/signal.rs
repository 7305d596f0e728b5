// Signal handling module
//
// Supported signals:
// - SIGINT:  Shutdown (Ctrl+C)
// - SIGTERM: Shutdown (Unix only)

/// Registered shutdown signal handlers
///
/// Handlers are installed when this is created, not when it is first
/// awaited, so an interrupt arriving right after the banner is not lost.
pub struct ShutdownSignal {
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    /// Install the handlers; must run inside the Tokio runtime
    #[cfg(unix)]
    pub fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
        })
    }

    /// Windows fallback - only handles Ctrl+C
    #[cfg(not(unix))]
    pub fn register() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for the first shutdown signal and return its name
    #[cfg(unix)]
    pub async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.sigint.recv() => "SIGINT (Ctrl+C)",
            _ = self.sigterm.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "Ctrl+C",
            Err(e) => {
                crate::logger::log_error(&format!("Failed to listen for Ctrl+C: {e}"));
                std::future::pending().await
            }
        }
    }
}
