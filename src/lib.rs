//! devserve - static file development server
//!
//! Serves a directory over plain HTTP/1.x and marks every response as
//! cross-origin readable and uncacheable.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
