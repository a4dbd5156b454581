//! A minimal HTTP/1.1 message layer built directly over TCP byte streams.
//!
//! The crate accepts connections, parses request framing byte by byte with
//! no third-party HTTP parser, dispatches each request to a handler, writes
//! a framed response and keeps the connection alive unless either side asks
//! for `Connection: close`.
//!
//! # Features
//!
//! - CRLF line reader with explicit end-of-stream and malformed-terminator results
//! - Request parser splitting message headers from entity headers, reading
//!   exactly `Content-Length` body bytes through a reusable copy buffer
//! - Response writer that flushes the header block before the body
//! - Keep-alive connection sessions with contained failures
//! - Listener with a session registry and deterministic shutdown
//!
//! # Examples
//!
//! ## Parsing a request
//!
//! ```
//! use tcphttp::{parse_request, HttpVersion, Method};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tcphttp::ParserError> {
//! let mut stream: &[u8] = b"POST /submit HTTP/1.1\r\nHost: example.com\r\nContent-Length: 5\r\n\r\nhello";
//! let mut buf = vec![0u8; 1024];
//!
//! if let Some(request) = parse_request(&mut stream, &mut buf).await? {
//!     assert_eq!(request.method, Method::POST);
//!     assert_eq!(request.path, "/submit");
//!     assert_eq!(request.version, HttpVersion::HTTP_11);
//!     assert_eq!(request.body, b"hello");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Running a server
//!
//! ```no_run
//! use std::sync::Arc;
//! use tcphttp::{root_page, HttpServer, ServerConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), tcphttp::ServerError> {
//! let server = Arc::new(HttpServer::new(
//!     ServerConfig::with_port(8080),
//!     root_page("Home", "Hello"),
//! ));
//!
//! let accept_loop = tokio::spawn({
//!     let server = server.clone();
//!     async move { server.start().await }
//! });
//!
//! // ... later
//! server.request_stop();
//! let _ = accept_loop.await;
//! server.shutdown().await;
//! # Ok(())
//! # }
//! ```

// Export the parser module
pub mod parser;

// Export the server module
pub mod server;

// Re-export commonly used items for convenience
pub use parser::{Error as ParserError, Headers, HttpRequest, HttpVersion, Method, parse_request};
pub use server::{
    Error as ServerError, HttpResponse, HttpServer, ListenerState, Router, ServerConfig, StatusCode, handler_fn,
    root_page,
};
