//! CORS header injection module
//!
//! The whole point of this server is to let a page on another origin (e.g. a
//! GitHub Pages frontend) fetch local files, so every response gets the
//! permissive header set below - error responses included, since browsers
//! hide response details from scripts when the headers are missing.

use hyper::header::{HeaderMap, HeaderValue};

/// Inject the permissive CORS header set into a response's headers
///
/// Called once per response, right before it leaves the handler. `insert`
/// replaces any existing value, so no header is ever emitted twice.
pub fn apply(headers: &mut HeaderMap) {
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, OPTIONS, HEAD"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("X-Requested-With, Content-Type, Range"),
    );
    headers.insert(
        "Access-Control-Expose-Headers",
        HeaderValue::from_static("Accept-Ranges, Content-Range, Content-Length, Content-Type"),
    );
}
