//! Tests for the HTTP parser.

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use serde::Deserialize;
    use tokio::io::{AsyncRead, ReadBuf};

    use crate::parser::{
        classify, parse_request, read_line, Error, HeaderKind, Headers, HttpVersion, LineRead, Method,
    };

    /// Delivers its input in fixed segments, one segment per read call at most.
    struct SegmentedReader {
        segments: VecDeque<Vec<u8>>,
    }

    impl SegmentedReader {
        fn new(input: &[u8], segment: usize) -> Self {
            Self {
                segments: input.chunks(segment).map(<[u8]>::to_vec).collect(),
            }
        }
    }

    impl AsyncRead for SegmentedReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            if let Some(mut segment) = this.segments.pop_front() {
                let n = segment.len().min(buf.remaining());
                buf.put_slice(&segment[..n]);
                if n < segment.len() {
                    this.segments.push_front(segment.split_off(n));
                }
            }
            Poll::Ready(Ok(()))
        }
    }

    async fn parse(input: &[u8]) -> Result<Option<crate::parser::HttpRequest>, Error> {
        let mut reader = input;
        let mut buf = vec![0u8; 64 * 1024];
        parse_request(&mut reader, &mut buf).await
    }

    #[tokio::test]
    async fn test_read_line_crlf() {
        let mut input: &[u8] = b"Host: example.com\r\nrest";
        let line = read_line(&mut input).await.unwrap();
        assert_eq!(line, LineRead::Line("Host: example.com".to_string()));
        assert_eq!(input, b"rest");
    }

    #[tokio::test]
    async fn test_read_line_empty_line() {
        let mut input: &[u8] = b"\r\n";
        assert_eq!(read_line(&mut input).await.unwrap(), LineRead::Line(String::new()));
    }

    #[tokio::test]
    async fn test_read_line_end_of_stream() {
        let mut input: &[u8] = b"";
        assert_eq!(
            read_line(&mut input).await.unwrap(),
            LineRead::EndOfStream { partial: false }
        );

        let mut input: &[u8] = b"GET / HT";
        assert_eq!(
            read_line(&mut input).await.unwrap(),
            LineRead::EndOfStream { partial: true }
        );
    }

    #[tokio::test]
    async fn test_read_line_bare_lf() {
        let mut input: &[u8] = b"Host: x\nmore\r\n";
        assert_eq!(read_line(&mut input).await.unwrap(), LineRead::ProtocolViolation("LF"));
    }

    #[tokio::test]
    async fn test_read_line_double_cr() {
        let mut input: &[u8] = b"Host: x\r\r\n";
        assert_eq!(read_line(&mut input).await.unwrap(), LineRead::ProtocolViolation("CR"));
    }

    #[tokio::test]
    async fn test_read_line_latin1_passthrough() {
        let mut input: &[u8] = b"caf\xe9\r\n";
        assert_eq!(read_line(&mut input).await.unwrap(), LineRead::Line("caf\u{e9}".to_string()));
    }

    #[tokio::test]
    async fn test_parse_simple_get_request() {
        let request = parse(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/index.html");
        assert_eq!(request.version, HttpVersion::HTTP_11);
        assert_eq!(request.get_header("Host"), Some("example.com"));
        assert!(request.body.is_empty());
    }

    #[tokio::test]
    async fn test_parse_version_and_extension_method() {
        let request = parse(b"PURGE /cache HTTP/1.0\r\n\r\n").await.unwrap().unwrap();
        assert_eq!(request.method, Method::Extension("PURGE".to_string()));
        assert_eq!(request.version, HttpVersion { major: 1, minor: 0 });
        assert_eq!(request.method.to_string(), "PURGE");
    }

    #[tokio::test]
    async fn test_case_insensitive_headers() {
        let request = parse(b"GET / HTTP/1.1\r\nhOsT: example.com\r\n\r\n").await.unwrap().unwrap();
        assert!(request.has_header("host"));
        assert!(request.has_header("HOST"));
        assert!(request.has_header("Host"));
    }

    #[tokio::test]
    async fn test_headers_split_into_message_and_content() {
        let input = b"POST /submit HTTP/1.1\r\nHost: a\r\nContent-Type: text/plain\r\nContent-Length: 0\r\nConnection: keep-alive\r\n\r\n";
        let request = parse(input).await.unwrap().unwrap();
        assert_eq!(request.headers.get("Host"), Some("a"));
        assert_eq!(request.headers.get("Connection"), Some("keep-alive"));
        assert!(!request.headers.contains("Content-Type"));
        assert_eq!(request.content_headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(request.content_headers.get("content-length"), Some("0"));
        assert!(!request.content_headers.contains("Host"));
    }

    #[tokio::test]
    async fn test_unknown_headers_dropped() {
        let input = b"GET / HTTP/1.1\r\nX-Custom: 1\r\nNoColonHere\r\nHost: h\r\n\r\n";
        let request = parse(input).await.unwrap().unwrap();
        assert!(!request.has_header("X-Custom"));
        assert_eq!(request.headers.len(), 1);
        assert!(request.content_headers.is_empty());
    }

    #[tokio::test]
    async fn test_parse_body_exact_length() {
        let input = b"POST /data HTTP/1.1\r\nContent-Length: 5\r\n\r\nhelloEXTRA";
        let mut reader: &[u8] = input;
        let mut buf = vec![0u8; 64 * 1024];
        let request = parse_request(&mut reader, &mut buf).await.unwrap().unwrap();
        assert_eq!(request.body, b"hello");
        // Nothing past the declared length is consumed
        assert_eq!(reader, b"EXTRA");
    }

    #[tokio::test]
    async fn test_parse_body_short_read() {
        let request = parse(b"POST /data HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.body, b"abc");
    }

    #[tokio::test]
    async fn test_parse_body_segmented() {
        let body: Vec<u8> = (0..200u8).collect();
        let mut input = format!("POST /upload HTTP/1.1\r\nContent-Length: {}\r\n\r\n", body.len()).into_bytes();
        input.extend_from_slice(&body);
        input.extend_from_slice(b"GET /next HTTP/1.1\r\n\r\n");

        for segment in [1, 3, 7, 64, 1000] {
            let mut reader = SegmentedReader::new(&input, segment);
            // A copy buffer smaller than the body forces several copy rounds
            let mut buf = vec![0u8; 16];
            let request = parse_request(&mut reader, &mut buf).await.unwrap().unwrap();
            assert_eq!(request.body, body, "segment size {segment}");

            let next = parse_request(&mut reader, &mut buf).await.unwrap().unwrap();
            assert_eq!(next.path, "/next");
        }
    }

    #[tokio::test]
    async fn test_no_request_on_clean_eof() {
        assert!(parse(b"").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_severed_mid_request() {
        let result = parse(b"GET / HTTP/1.1\r\nHost: exa").await;
        assert!(matches!(result, Err(Error::ConnectionSevered)));
        assert!(result.unwrap_err().is_disconnect());

        let result = parse(b"GET / HT").await;
        assert!(matches!(result, Err(Error::ConnectionSevered)));
    }

    #[tokio::test]
    async fn test_malformed_request_line() {
        for input in [&b"BADLINE\r\n\r\n"[..], b"GET /\r\n\r\n", b"GET  / HTTP/1.1\r\n\r\n", b"GET / HTTP/1.1 x\r\n\r\n"] {
            let err = parse(input).await.unwrap_err();
            assert!(matches!(err, Error::MalformedRequestLine(_)), "{input:?}");
            assert!(err.is_bad_request());
        }
    }

    #[tokio::test]
    async fn test_invalid_protocol() {
        for input in [&b"GET / HTTPS/1.1\r\n\r\n"[..], b"GET / HTTP\r\n\r\n", b"GET / HTTP/1/1\r\n\r\n"] {
            let err = parse(input).await.unwrap_err();
            assert!(matches!(err, Error::InvalidProtocol(_)), "{input:?}");
            assert!(err.is_bad_request());
        }
    }

    #[tokio::test]
    async fn test_invalid_version_is_not_bad_request() {
        let err = parse(b"GET / HTTP/x.y\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, Error::InvalidVersion(ref v) if v == "x.y"));
        assert!(!err.is_bad_request());
        assert!(!err.is_disconnect());
    }

    #[tokio::test]
    async fn test_invalid_method_and_path() {
        assert!(matches!(parse(b" / HTTP/1.1\r\n\r\n").await, Err(Error::InvalidMethod(_))));
        assert!(matches!(parse(b"G(T / HTTP/1.1\r\n\r\n").await, Err(Error::InvalidMethod(_))));
        assert!(matches!(parse(b"GET  HTTP/1.1\r\n\r\n").await, Err(Error::InvalidPath)));
    }

    #[tokio::test]
    async fn test_bare_lf_in_headers() {
        let err = parse(b"GET / HTTP/1.1\nHost: x\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, Error::MalformedLineTerminator("LF")));
        assert!(!err.is_bad_request());
    }

    #[tokio::test]
    async fn test_invalid_content_length() {
        let err = parse(b"POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, Error::InvalidContentLength(ref v) if v == "abc"));
    }

    #[tokio::test]
    async fn test_query_params() {
        let request = parse(b"GET /search?q=rust&empty&x=1 HTTP/1.1\r\n\r\n").await.unwrap().unwrap();
        assert_eq!(request.get_query_param("q").unwrap(), "rust");
        assert_eq!(request.get_query_param("empty").unwrap(), "");
        assert!(request.has_query_param("x"));
        assert!(!request.has_query_param("missing"));
    }

    #[tokio::test]
    async fn test_connection_tokens() {
        let request = parse(b"GET / HTTP/1.1\r\nConnection: keep-alive, Upgrade\r\nConnection: close\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        let tokens: Vec<&str> = request.connection_tokens().collect();
        assert_eq!(tokens, vec!["keep-alive", "Upgrade", "close"]);
    }

    #[tokio::test]
    async fn test_json_body() {
        #[derive(Deserialize)]
        struct User {
            name: String,
            age: u32,
        }

        let body = br#"{"name":"Ada","age":36}"#;
        let mut input = format!(
            "POST /users HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        input.extend_from_slice(body);

        let request = parse(&input).await.unwrap().unwrap();
        assert!(request.is_json());
        let user: User = request.json().unwrap();
        assert_eq!(user.name, "Ada");
        assert_eq!(user.age, 36);
    }

    #[tokio::test]
    async fn test_json_requires_content_type() {
        let request = parse(b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}").await.unwrap().unwrap();
        let result: Result<serde_json::Value, Error> = request.json();
        assert!(matches!(result, Err(Error::MissingHeader(_))));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("content-length"), Some(HeaderKind::Content));
        assert_eq!(classify("Expires"), Some(HeaderKind::Content));
        assert_eq!(classify("CONNECTION"), Some(HeaderKind::Message));
        assert_eq!(classify("X-Forwarded-For"), None);
    }

    #[test]
    fn test_headers_insert_and_display() {
        let mut headers = Headers::new();
        headers.append("Connection", "keep-alive");
        headers.append("connection", "close");
        headers.insert("CONNECTION", "close");
        assert_eq!(headers.get_all("Connection").collect::<Vec<_>>(), vec!["close"]);
        headers.append("Via", "1.1 proxy");
        assert_eq!(headers.to_string(), "CONNECTION: close\r\nVia: 1.1 proxy\r\n");
        headers.remove("via");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_version_parse_and_display() {
        assert_eq!("1.1".parse::<HttpVersion>().unwrap(), HttpVersion::HTTP_11);
        assert_eq!(HttpVersion::HTTP_10.to_string(), "1.0");
        assert!("1".parse::<HttpVersion>().is_err());
        assert!("1.".parse::<HttpVersion>().is_err());
        assert!("+1.1".parse::<HttpVersion>().is_err());
    }
}
