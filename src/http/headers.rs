//! Response header decoration
//!
//! Every response leaving the server gets the CORS allowance and the
//! cache-busting headers, whatever produced it.

use hyper::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, EXPIRES, PRAGMA,
};
use hyper::Response;

use crate::config::HttpConfig;
use crate::error::ServerError;

/// Pre-validated header values applied to each response
#[derive(Debug, Clone)]
pub struct ResponseDecorator {
    allow_origin: HeaderValue,
    cache_control: HeaderValue,
}

impl ResponseDecorator {
    /// Validate the configured header values once, at startup
    pub fn from_config(http: &HttpConfig) -> Result<Self, ServerError> {
        let parse = |name: &str, value: &str| {
            HeaderValue::from_str(value)
                .map_err(|e| ServerError::Config(format!("Invalid {name} header value '{value}': {e}")))
        };

        Ok(Self {
            allow_origin: parse("Access-Control-Allow-Origin", &http.cors_allow_origin)?,
            cache_control: parse("Cache-Control", &http.cache_control)?,
        })
    }

    /// Insert the headers, replacing any value a builder already set
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(CACHE_CONTROL, self.cache_control.clone());
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(EXPIRES, HeaderValue::from_static("0"));
    }

    pub fn decorate<B>(&self, mut response: Response<B>) -> Response<B> {
        self.apply_headers(response.headers_mut());
        response
    }
}
