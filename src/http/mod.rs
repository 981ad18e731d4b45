//! HTTP protocol layer module
//!
//! Protocol-level building blocks shared by the request handler: range
//! parsing, MIME detection, CORS decoration, and response builders.

pub mod cors;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used items
pub use range::parse_range_header;
pub use response::{
    build_404_response, build_405_response, build_416_response, build_500_response,
    build_options_response,
};
