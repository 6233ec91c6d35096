use core::fmt;

use http::header::CONTENT_TYPE;
use http::{HeaderMap, Response};
use miniserde::json::Value;

use crate::error::TransportError;
use crate::payload::{essence, JSON};

/// The response exactly as the transport received it.
pub type RawResponse = Response<Vec<u8>>;

/// How a response body should be exposed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Text,
    Json,
    Bytes,
}

/// A decoded response body.
pub enum ResponseData {
    Empty,
    Text(String),
    Json(Value),
    Bytes(Vec<u8>),
}

impl ResponseData {
    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseData::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            _ => None,
        }
    }

    /// True for a JSON object body.
    pub fn is_object(&self) -> bool {
        matches!(self, ResponseData::Json(Value::Object(_)))
    }

    /// The body bytes, whatever shape they were decoded into.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ResponseData::Empty => Vec::new(),
            ResponseData::Text(text) => text.as_bytes().to_vec(),
            ResponseData::Json(value) => miniserde::json::to_string(value).into_bytes(),
            ResponseData::Bytes(bytes) => bytes.clone(),
        }
    }
}

impl fmt::Debug for ResponseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseData::Empty => f.write_str("Empty"),
            ResponseData::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ResponseData::Json(value) => f
                .debug_tuple("Json")
                .field(&miniserde::json::to_string(value))
                .finish(),
            ResponseData::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
        }
    }
}

/// A successful request: decoded body, numeric status and the untouched response.
#[derive(Debug)]
pub struct Completion {
    pub data: ResponseData,
    pub status: u16,
    pub raw_response: RawResponse,
}

impl Completion {
    pub fn new(data: ResponseData, status: u16, raw_response: RawResponse) -> Self {
        Self {
            data,
            status,
            raw_response,
        }
    }
}

fn is_json(content_type: &str) -> bool {
    let essence = essence(content_type);
    essence == JSON || essence.ends_with("+json")
}

fn decode_json(body: &[u8]) -> ResponseData {
    let text = String::from_utf8_lossy(body);
    match miniserde::json::from_str::<Value>(&text) {
        Ok(value) => ResponseData::Json(value),
        Err(_) => {
            log::warn!("response body is not valid JSON, exposing it as text");
            ResponseData::Text(text.into_owned())
        }
    }
}

// Decodes a body by the requested type, falling back to its content type
pub fn decode_body(headers: &HeaderMap, body: &[u8], response_type: Option<ResponseType>) -> ResponseData {
    if body.is_empty() {
        return ResponseData::Empty;
    }

    match response_type {
        Some(ResponseType::Bytes) => ResponseData::Bytes(body.to_vec()),
        Some(ResponseType::Text) => ResponseData::Text(String::from_utf8_lossy(body).into_owned()),
        Some(ResponseType::Json) => decode_json(body),
        None => {
            let content_type = headers
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();
            if is_json(content_type) {
                decode_json(body)
            } else {
                match String::from_utf8(body.to_vec()) {
                    Ok(text) => ResponseData::Text(text),
                    Err(_) => ResponseData::Bytes(body.to_vec()),
                }
            }
        }
    }
}

/// Turns a received response into the success or failure outcome.
///
/// Statuses of 400 and above are failures even though a response arrived.
pub fn settle(response: RawResponse, response_type: Option<ResponseType>) -> Result<Completion, TransportError> {
    let status = response.status().as_u16();
    let data = decode_body(response.headers(), response.body(), response_type);
    log::debug!("settling response status = {status}");
    if status >= 400 {
        Err(TransportError::Status { status, data })
    } else {
        Ok(Completion::new(data, status, response))
    }
}

#[cfg(feature = "std")]
pub use self::wire::*;

#[cfg(feature = "std")]
mod wire {
    use std::str::FromStr;

    use futures_lite::{io::BufReader, AsyncBufReadExt, AsyncRead, AsyncReadExt};
    use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Version};
    use simple_error::{SimpleError, SimpleResult};

    use crate::error::IntoSimpleError;

    // Reads the response status line from the stream
    pub async fn read_response_status_line<S>(reader: &mut BufReader<S>) -> SimpleResult<String>
    where
        S: AsyncRead + Unpin,
    {
        let mut response_status_line = String::new();
        let read = reader.read_line(&mut response_status_line).await.into_simple_error()?;
        if read == 0 {
            return Err(SimpleError::new("connection closed before a response was received"));
        }
        Ok(response_status_line)
    }

    // Parses the response status line into a version and status code
    pub fn parse_response_status_line(response_status_line: &str) -> SimpleResult<(Version, StatusCode)> {
        let mut parts = response_status_line.split_whitespace();
        let (Some(version), Some(status)) = (parts.next(), parts.next()) else {
            return Err(SimpleError::new("Failed to parse response status line"));
        };

        let response_version = match version {
            "HTTP/1.0" => Version::HTTP_10,
            "HTTP/1.1" => Version::HTTP_11,
            _ => return Err(SimpleError::new(format!("Unsupported HTTP version {version}"))),
        };

        let status = status.parse::<u16>().into_simple_error()?;
        let response_status = StatusCode::from_u16(status).into_simple_error()?;
        Ok((response_version, response_status))
    }

    // Reads the response headers from the provided BufReader
    pub async fn read_response_headers<S>(reader: &mut BufReader<S>) -> SimpleResult<HeaderMap<HeaderValue>>
    where
        S: AsyncRead + Unpin,
    {
        let mut headers = HeaderMap::new();
        let mut line = String::new();

        while reader.read_line(&mut line).await.into_simple_error()? != 0 && line != "\r\n" {
            if let Some((key, value)) = line.split_once(':') {
                let header_name = HeaderName::from_str(key.trim()).into_simple_error()?;
                let header_value = HeaderValue::from_str(value.trim()).into_simple_error()?;
                headers.append(header_name, header_value);
            } else {
                log::warn!("Failed to parse header line: {line}");
            }
            line.clear();
        }

        Ok(headers)
    }

    /// Most memory reserved up front for a body, whatever length the server announces.
    const MAX_PREALLOCATION: u64 = 64 * 1024;

    // Appends exactly `len` bytes to `body`, growing it only as bytes arrive
    async fn read_exact_len<S>(reader: &mut BufReader<S>, len: u64, body: &mut Vec<u8>) -> SimpleResult<()>
    where
        S: AsyncRead + Unpin,
    {
        body.reserve(len.min(MAX_PREALLOCATION) as usize);
        let read = (&mut *reader).take(len).read_to_end(body).await.into_simple_error()?;
        if (read as u64) < len {
            return Err(SimpleError::new(format!(
                "response body ended after {read} of {len} announced bytes"
            )));
        }
        Ok(())
    }

    // Reads a chunked HTTP body from the provided BufReader
    pub async fn read_chunked_body<S>(reader: &mut BufReader<S>) -> SimpleResult<Vec<u8>>
    where
        S: AsyncRead + Unpin,
    {
        let mut body = Vec::new();
        let mut chunk_size_line = String::new();

        loop {
            reader.read_line(&mut chunk_size_line).await.into_simple_error()?;
            // chunk extensions follow a ';'
            let size = chunk_size_line.split(';').next().unwrap_or_default().trim();
            let chunk_size = u64::from_str_radix(size, 16).into_simple_error()?;

            if chunk_size == 0 {
                break;
            }

            read_exact_len(reader, chunk_size, &mut body).await?;

            let mut crlf = [0; 2];
            reader.read_exact(&mut crlf).await.into_simple_error()?;
            if &crlf != b"\r\n" {
                return Err(SimpleError::new("Invalid chunked encoding: missing CRLF"));
            }
            chunk_size_line.clear();
        }

        // trailer section ends with an empty line
        let mut trailer = String::new();
        while reader.read_line(&mut trailer).await.into_simple_error()? != 0 && trailer != "\r\n" {
            trailer.clear();
        }

        Ok(body)
    }

    /// Whether a response with this status to this request can carry a body.
    pub fn has_body(is_head: bool, status: StatusCode) -> bool {
        !(is_head
            || status.is_informational()
            || status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_MODIFIED)
    }

    // Reads the response body based on headers
    pub async fn read_response_body<S>(
        reader: &mut BufReader<S>,
        headers: &HeaderMap<HeaderValue>,
    ) -> SimpleResult<Vec<u8>>
    where
        S: AsyncRead + Unpin,
    {
        let chunked = headers
            .get(http::header::TRANSFER_ENCODING)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.to_ascii_lowercase().contains("chunked"));

        if chunked {
            read_chunked_body(reader).await
        } else if let Some(content_length_value) = headers.get(http::header::CONTENT_LENGTH) {
            let content_length = content_length_value
                .to_str()
                .into_simple_error()?
                .trim()
                .parse::<u64>()
                .into_simple_error()?;
            let mut response_body = Vec::new();
            read_exact_len(reader, content_length, &mut response_body).await?;
            Ok(response_body)
        } else {
            // close-delimited
            let mut response_body = Vec::new();
            reader.read_to_end(&mut response_body).await.into_simple_error()?;
            Ok(response_body)
        }
    }

    #[cfg(test)]
    mod tests {
        use futures_lite::future::block_on;

        use super::*;

        fn reader(raw: &'static [u8]) -> BufReader<&'static [u8]> {
            BufReader::new(raw)
        }

        #[test]
        fn parses_status_line() {
            let (version, status) = parse_response_status_line("HTTP/1.1 404 Not Found\r\n").unwrap();
            assert_eq!(version, Version::HTTP_11);
            assert_eq!(status, StatusCode::NOT_FOUND);
        }

        #[test]
        fn rejects_garbage_status_line() {
            assert!(parse_response_status_line("garbage").is_err());
            assert!(parse_response_status_line("SPDY/3 200 OK").is_err());
            assert!(parse_response_status_line("HTTP/1.1 abc OK").is_err());
        }

        #[test]
        fn reads_headers_until_blank_line() {
            let mut reader = reader(b"Content-Type: text/plain\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\n\r\nbody");
            let headers = block_on(read_response_headers(&mut reader)).unwrap();
            assert_eq!(headers["content-type"], "text/plain");
            assert_eq!(headers.get_all("set-cookie").iter().count(), 2);
        }

        #[test]
        fn reads_content_length_body() {
            let mut reader = reader(b"hello world");
            let mut headers = HeaderMap::new();
            headers.insert(http::header::CONTENT_LENGTH, HeaderValue::from_static("5"));
            let body = block_on(read_response_body(&mut reader, &headers)).unwrap();
            assert_eq!(body, b"hello");
        }

        #[test]
        fn reads_chunked_body() {
            let mut reader = reader(b"4\r\nWiki\r\n5;ext=1\r\npedia\r\n0\r\n\r\n");
            let mut headers = HeaderMap::new();
            headers.insert(http::header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
            let body = block_on(read_response_body(&mut reader, &headers)).unwrap();
            assert_eq!(body, b"Wikipedia");
        }

        #[test]
        fn short_content_length_body_is_an_error() {
            let mut reader = reader(b"only eleven");
            let mut headers = HeaderMap::new();
            headers.insert(http::header::CONTENT_LENGTH, HeaderValue::from_static("200000000000000"));
            let err = block_on(read_response_body(&mut reader, &headers)).unwrap_err();
            assert!(err.to_string().contains("11 of 200000000000000"), "{err}");
        }

        #[test]
        fn oversized_chunk_is_an_error() {
            let mut reader = reader(b"ffffffffffff\r\nabc");
            let mut headers = HeaderMap::new();
            headers.insert(http::header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
            assert!(block_on(read_response_body(&mut reader, &headers)).is_err());
        }

        #[test]
        fn malformed_chunk_size_is_an_error() {
            let mut reader = reader(b"zz\r\nabc\r\n0\r\n\r\n");
            assert!(block_on(read_chunked_body(&mut reader)).is_err());
        }

        #[test]
        fn reads_close_delimited_body() {
            let mut reader = reader(b"until the end");
            let body = block_on(read_response_body(&mut reader, &HeaderMap::new())).unwrap();
            assert_eq!(body, b"until the end");
        }

        #[test]
        fn empty_stream_has_no_status_line() {
            let mut reader = reader(b"");
            assert!(block_on(read_response_status_line(&mut reader)).is_err());
        }

        #[test]
        fn head_and_no_content_have_no_body() {
            assert!(!has_body(true, StatusCode::OK));
            assert!(!has_body(false, StatusCode::NO_CONTENT));
            assert!(!has_body(false, StatusCode::NOT_MODIFIED));
            assert!(has_body(false, StatusCode::NOT_FOUND));
        }
    }
}
