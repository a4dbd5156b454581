//! Error types for the HTTP parser.

use thiserror::Error;

/// Errors that can occur while reading an HTTP request off a stream.
#[derive(Debug, Error)]
pub enum Error {
    /// The request line did not split into exactly three space-separated tokens.
    #[error("Malformed request line: {0}")]
    MalformedRequestLine(String),

    /// The protocol token is not of the form `HTTP/<version>`.
    #[error("Invalid protocol: {0}")]
    InvalidProtocol(String),

    /// The method token contains characters not allowed in an HTTP token.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The request target is empty.
    #[error("Invalid HTTP path")]
    InvalidPath,

    /// The protocol version is not `<major>.<minor>`.
    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    /// A bare CR or bare LF was found in the header section.
    #[error("Unexpected {0} in request header")]
    MalformedLineTerminator(&'static str),

    /// The Content-Length header is not a non-negative integer.
    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// The peer closed the stream in the middle of a request.
    #[error("Connection severed by peer")]
    ConnectionSevered,

    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required header is missing from the request.
    #[error("Required header is missing: {0}")]
    MissingHeader(String),

    /// Error parsing JSON.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    /// Whether the connection is gone and no response can be written.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Error::ConnectionSevered | Error::Io(_))
    }

    /// Whether the request framing itself was malformed (answered with 400).
    ///
    /// Any other parse failure that is not a disconnect is answered with 500.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Error::MalformedRequestLine(_) | Error::InvalidProtocol(_))
    }
}
