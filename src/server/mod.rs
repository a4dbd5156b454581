//! HTTP server over raw TCP streams.
//!
//! A listener accepts connections and registers a session for each one. A
//! session reads one request at a time with the crate's own parser, hands it
//! to the configured handler, writes the response and keeps the connection
//! open unless the response says `Connection: close`.

mod response;
mod config;
mod error;
mod handler;
mod writer;
mod session;
mod http_server;

// Re-export public items
pub use response::{Content, HttpResponse, StatusCode};
pub use config::{ServerConfig, DEFAULT_COPY_BUFFER_SIZE, DEFAULT_PORT};
pub use error::Error;
pub use handler::{handler_fn, root_page, HandlerFn, HandlerFuture, Route, Router};
pub use writer::write_response;
pub use session::{DoneNotifier, Session, SessionHandle, SessionId, SessionState};
pub use http_server::{HttpServer, ListenerState};
