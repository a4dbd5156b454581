//! HTTP request parser.
//!
//! Reads requests straight off an async byte stream: a byte-at-a-time CRLF
//! line reader for the header section, then exactly `Content-Length` body bytes.

mod request;
mod method;
mod version;
mod headers;
mod line;
mod error;
mod tests;

// Re-export public items
pub use request::HttpRequest;
pub use method::Method;
pub use version::HttpVersion;
pub use headers::{classify, HeaderKind, Headers};
pub use line::{read_line, LineRead};
pub use error::Error;

// Re-export the parse_request function
pub use request::parse_request;
