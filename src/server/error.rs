//! Error types for the HTTP server.

use thiserror::Error;

use crate::parser::Method;
use crate::server::response::StatusCode;

/// Errors that can occur during HTTP server operation.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// No route matches the request path.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The path is routed, but not for this method. `allow` lists the methods that are.
    #[error("Method {method} not allowed, expected one of: {allow}")]
    MethodNotAllowed { method: Method, allow: String },

    /// Internal server error.
    #[error("Internal server error: {0}")]
    InternalError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The accept loop is already running.
    #[error("Server is already listening")]
    AlreadyListening,

    /// A stop was requested; the server will not bind again.
    #[error("Server has been stopped")]
    Stopped,
}

impl Error {
    /// The status a handler failure is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NotFound,
            Error::MethodNotAllowed { .. } => StatusCode::MethodNotAllowed,
            _ => StatusCode::InternalServerError,
        }
    }
}
