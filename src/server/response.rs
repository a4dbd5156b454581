//! HTTP response types and utilities.

use std::fmt;
use serde::Serialize;

use crate::parser::{Headers, HttpVersion};
use crate::server::error::Error;

/// HTML body used for every error status.
const ERROR_TEMPLATE: &str = "<html><head><title>{status}</title></head><body><center><h1>{status}</h1></center><hr><center>{signature}</center></body></html>";

/// HTTP status codes with their standard reason phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 200,
    Created = 201,
    Accepted = 202,
    NoContent = 204,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// The numeric status code.
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::Accepted => "Accepted",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::BadGateway => "Bad Gateway",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }
}

/// `<code> <reason>`, e.g. `404 Not Found`.
impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

/// Response content: the body bytes and the entity headers describing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Content {
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// Represents an HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code
    pub status: StatusCode,
    /// Protocol version; the session mirrors the request's
    pub version: HttpVersion,
    /// Message headers
    pub headers: Headers,
    /// The response content, if any
    pub content: Option<Content>,
}

impl HttpResponse {
    /// Create a new HTTP response with the given status code and no content.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            version: HttpVersion::default(),
            headers: Headers::new(),
            content: None,
        }
    }

    /// The templated HTML page used for error statuses.
    pub fn error_page(status: StatusCode, signature: &str) -> Self {
        let page = ERROR_TEMPLATE
            .replace("{status}", &status.to_string())
            .replace("{signature}", signature);
        Self::new(status).with_html(page)
    }

    /// The error page answering a failed handler.
    ///
    /// # Arguments
    ///
    /// * `error` - The handler's error; [`Error::status`] picks the status
    /// * `signature` - Footer of the page
    ///
    /// # Returns
    ///
    /// The templated page, with an `Allow` header for [`Error::MethodNotAllowed`].
    pub fn from_error(error: &Error, signature: &str) -> Self {
        let response = Self::error_page(error.status(), signature);
        match error {
            Error::MethodNotAllowed { allow, .. } => response.with_header("Allow", allow.as_str()),
            _ => response,
        }
    }

    pub fn with_version(mut self, version: HttpVersion) -> Self {
        self.version = version;
        self
    }

    /// Add or replace a message header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Append a `Connection` token, keeping existing ones.
    pub fn with_connection(mut self, token: impl Into<String>) -> Self {
        self.headers.append("Connection", token);
        self
    }

    /// Set the response body with bytes.
    pub fn with_body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        let content = self.content.get_or_insert_with(Content::default);
        content.body = body.into();
        let content_length = content.body.len().to_string();
        content.headers.insert("Content-Length", content_length);
        self
    }

    /// Set the response body with a string.
    pub fn with_body_string(self, body: impl Into<String>) -> Self {
        self.with_body_bytes(body.into().into_bytes())
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        let content = self.content.get_or_insert_with(Content::default);
        content.headers.remove("Content-Type");
        // Content-Type goes ahead of Content-Length on the wire
        let mut headers = Headers::new();
        headers.append("Content-Type", content_type);
        for (name, value) in content.headers.iter() {
            headers.append(name, value);
        }
        content.headers = headers;
        self
    }

    /// UTF-8 HTML content.
    pub fn with_html(self, html: impl Into<String>) -> Self {
        self.with_content_type("text/html; charset=utf-8")
            .with_body_string(html)
    }

    /// Set the response body with a JSON value.
    pub fn with_json<T: Serialize>(self, value: &T) -> Result<Self, Error> {
        let json = serde_json::to_vec(value).map_err(Error::JsonError)?;
        Ok(self
            .with_content_type("application/json")
            .with_body_bytes(json))
    }

    /// The body bytes, empty when there is no content.
    pub fn body(&self) -> &[u8] {
        self.content
            .as_ref()
            .map(|c| c.body.as_slice())
            .unwrap_or_default()
    }

    /// Whether a `Connection: close` token ends the exchange loop after this response.
    pub fn closes_connection(&self) -> bool {
        self.headers
            .tokens("Connection")
            .any(|t| t.eq_ignore_ascii_case("close"))
    }

    /// The header block: status line, message headers, content headers and the blank line.
    pub fn head(&self) -> String {
        let mut head = format!(
            "HTTP/{} {} {}\r\n",
            self.version,
            self.status.as_u16(),
            self.status.reason_phrase()
        );
        head.push_str(&self.headers.to_string());
        if let Some(content) = &self.content {
            head.push_str(&content.headers.to_string());
        }
        head.push_str("\r\n");
        head
    }
}
