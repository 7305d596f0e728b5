//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from the
//! file-serving logic: header decoration, MIME lookup, conditional requests
//! and response builders.

pub mod cache;
pub mod headers;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use headers::ResponseDecorator;
pub use response::{
    build_304_response, build_400_response, build_403_response, build_404_response, build_405_response,
    build_500_response, build_file_response, build_html_response, build_options_response,
    build_redirect_response,
};
