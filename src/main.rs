use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use devserve::config::{self, AppState, Config};
use devserve::error::Result;
use devserve::{logger, server};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::log_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_FILE.to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Fix the serving root once; relative lookups no longer depend on where we were started
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let root = cfg.resolve_root(exe_dir.as_deref())?;
    std::env::set_current_dir(&root)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    let state = Arc::new(AppState::new(cfg, root)?);
    runtime.block_on(async_main(state))
}

async fn async_main(state: Arc<AppState>) -> Result<()> {
    let addr = state.config.get_socket_addr()?;
    let listener = server::create_listener(addr)?;
    let shutdown = server::ShutdownSignal::register()?;

    let bound_addr = listener.local_addr()?;
    logger::log_server_start(&bound_addr, &state.root, &state.config);

    server::serve_until(listener, state, async move {
        let signal = shutdown.recv().await;
        logger::log_shutdown_requested(signal);
    })
    .await;

    logger::log_server_stopped();
    Ok(())
}
