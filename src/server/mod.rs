// Server module entry point
// Listener bootstrap, connection handling and shutdown

pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the module goes by server_loop
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::create_listener;
pub use server_loop::serve_until;
pub use signal::ShutdownSignal;
