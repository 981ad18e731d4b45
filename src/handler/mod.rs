//! Request handler module
//!
//! Routes incoming requests by method and serves files from the document
//! root with range and CORS support.

pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
