//! HTTP request parsing and representation.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::parser::error::Error;
use crate::parser::headers::{classify, HeaderKind, Headers};
use crate::parser::line::{read_line, LineRead};
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;

/// Represents an HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target, as sent
    pub path: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// Message headers (everything that does not describe the body)
    pub headers: Headers,
    /// Entity headers (Content-Length, Content-Type, ...)
    pub content_headers: Headers,
    /// The request body, exactly Content-Length bytes or fewer on a short read
    pub body: Vec<u8>,
    /// Query parameters parsed from the path
    pub query_params: HashMap<String, String>,
    /// Address of the peer that sent the request, when known
    pub peer_addr: Option<SocketAddr>,
}

impl HttpRequest {
    /// Create a new HTTP request with no headers and an empty body.
    ///
    /// # Arguments
    ///
    /// * `method` - The request method
    /// * `path` - The request target; a `?query` part fills `query_params`
    /// * `version` - The protocol version
    ///
    /// # Returns
    ///
    /// A request with no peer address.
    pub fn new(method: Method, path: impl Into<String>, version: HttpVersion) -> Self {
        let path = path.into();
        // Parse query parameters from the path
        let query_params: HashMap<String, String> = path
            .split_once('?')
            .map(|(_, query)| query
                .split('&')
                .filter(|s| !s.is_empty())
                .map(|pair| {
                    if let Some((k, v)) = pair.split_once('=') {
                        (k.to_string(), v.to_string())
                    } else {
                        (pair.to_string(), String::new())
                    }
                })
                .collect())
            .unwrap_or_default();

        Self {
            method,
            path,
            version,
            headers: Headers::new(),
            content_headers: Headers::new(),
            body: Vec::new(),
            query_params,
            peer_addr: None,
        }
    }

    /// Get a header value from either header set (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .or_else(|| self.content_headers.get(name))
    }

    /// Check if a header exists in either header set.
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// The declared body length.
    ///
    /// # Returns
    ///
    /// * `Ok(0)` - no `Content-Length` header
    /// * `Ok(n)` - the declared length
    /// * `Err(Error::InvalidContentLength)` - a value that is not a non-negative integer
    pub fn content_length(&self) -> Result<u64, Error> {
        match self.content_headers.get("Content-Length") {
            None => Ok(0),
            Some(value) => value
                .parse()
                .map_err(|_| Error::InvalidContentLength(value.to_string())),
        }
    }

    /// Tokens of the `Connection` header(s), e.g. `close` or `keep-alive`.
    pub fn connection_tokens(&self) -> impl Iterator<Item = &str> {
        self.headers.tokens("Connection")
    }

    /// Parse the request body as JSON.
    ///
    /// # Returns
    ///
    /// The deserialized body, [`Error::MissingHeader`] when the request is not
    /// `application/json`, or [`Error::JsonError`] when the body does not parse.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_json() {
            return Err(Error::MissingHeader("Content-Type: application/json".to_string()));
        }

        let json = serde_json::from_slice(&self.body)?;
        Ok(json)
    }

    /// Check if the request has a JSON body.
    pub fn is_json(&self) -> bool {
        self.content_headers
            .get("Content-Type")
            .is_some_and(|ct| ct.starts_with("application/json"))
    }

    /// Get a query parameter value.
    ///
    /// # Arguments
    ///
    /// * `name` - The parameter name, matched exactly
    ///
    /// # Returns
    ///
    /// The value as sent, without percent-decoding; a bare `?flag` yields an empty string.
    pub fn get_query_param(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }

    /// Check if a query parameter exists.
    pub fn has_query_param(&self, name: &str) -> bool {
        self.query_params.contains_key(name)
    }
}

/// Read a header-section line, turning end of stream and bad terminators into errors.
async fn expect_line<R>(reader: &mut R) -> Result<String, Error>
where
    R: AsyncRead + Unpin + ?Sized,
{
    match read_line(reader).await? {
        LineRead::Line(line) => Ok(line),
        LineRead::EndOfStream { .. } => Err(Error::ConnectionSevered),
        LineRead::ProtocolViolation(what) => Err(Error::MalformedLineTerminator(what)),
    }
}

/// Parse `<METHOD> SP <target> SP HTTP/<major>.<minor>`.
fn parse_request_line(line: &str) -> Result<HttpRequest, Error> {
    let tokens: Vec<&str> = line.split(' ').collect();
    let &[method, path, protocol] = tokens.as_slice() else {
        return Err(Error::MalformedRequestLine(line.to_string()));
    };

    // Protocol must be exactly two '/'-separated parts, the first being HTTP
    let protocol_tokens: Vec<&str> = protocol.split('/').collect();
    let &["HTTP", version] = protocol_tokens.as_slice() else {
        return Err(Error::InvalidProtocol(protocol.to_string()));
    };

    let method = Method::from_str(method)?;
    if path.is_empty() {
        return Err(Error::InvalidPath);
    }
    let version = HttpVersion::from_str(version)?;

    Ok(HttpRequest::new(method, path, version))
}

/// Copy up to `count` bytes from `reader` into `body` through `buf`.
///
/// Stops early when the reader reports end of stream; the body is then short.
async fn copy_body<R>(reader: &mut R, body: &mut Vec<u8>, buf: &mut [u8], count: u64) -> Result<(), Error>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut remaining = count;
    while remaining > 0 {
        let chunk = remaining.min(buf.len() as u64) as usize;
        if chunk == 0 {
            break;
        }
        let n = reader.read(&mut buf[..chunk]).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
        remaining -= n as u64;
    }
    Ok(())
}

/// Read one HTTP request from a byte stream.
///
/// `buf` is the copy buffer used for the body; callers reuse it across requests.
///
/// # Returns
///
/// * `Ok(Some(request))` - a complete request; the stream is positioned right after its body
/// * `Ok(None)` - the stream ended cleanly before a new request started
/// * `Err(_)` - see [`Error::is_disconnect`] and [`Error::is_bad_request`]
pub async fn parse_request<R>(reader: &mut R, buf: &mut [u8]) -> Result<Option<HttpRequest>, Error>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let request_line = match read_line(reader).await? {
        LineRead::Line(line) => line,
        LineRead::EndOfStream { partial: false } => return Ok(None),
        LineRead::EndOfStream { partial: true } => return Err(Error::ConnectionSevered),
        LineRead::ProtocolViolation(what) => return Err(Error::MalformedLineTerminator(what)),
    };

    let mut request = parse_request_line(&request_line)?;

    loop {
        let line = expect_line(reader).await?;
        if line.is_empty() {
            break;
        }

        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match classify(name) {
            Some(HeaderKind::Content) => request.content_headers.append(name, value),
            Some(HeaderKind::Message) => request.headers.append(name, value),
            None => {}
        }
    }

    let length = request.content_length()?;
    if length > 0 {
        request.body.reserve(length.min(buf.len() as u64) as usize);
        copy_body(reader, &mut request.body, buf, length).await?;
    }

    Ok(Some(request))
}
