// Server loop module
// Accepts connections until the shutdown future resolves

use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::spawn_connection;
use crate::config::AppState;
use crate::logger;

/// Accept and dispatch connections until `shutdown` completes.
///
/// The listener is closed on return. Connections already being served keep
/// their tasks until the runtime goes away.
#[allow(clippy::ignored_unit_patterns)]
pub async fn serve_until<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        spawn_connection(stream, peer_addr, Arc::clone(&state));
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = &mut shutdown => break,
        }
    }

    drop(listener);
}
