use core::fmt;
use core::time::Duration;

use http::header::{CONTENT_TYPE, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Request, Uri};
use simple_error::SimpleResult;

use crate::completion::Callbacks;
use crate::error::{ConfigError, IntoSimpleError};
use crate::method::Method;
use crate::payload::{self, Payload};
use crate::response::{RawResponse, ResponseData, ResponseType};

/// Everything a caller says about one request.
pub struct RequestSpec {
    method: String,
    url: Option<String>,
    headers: Vec<(String, String)>,
    content_type: Option<String>,
    data: Option<Payload>,
    callbacks: Callbacks,
    timeout: Option<Duration>,
    response_type: Option<ResponseType>,
    with_credentials: bool,
}

impl RequestSpec {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: None,
            headers: Vec::new(),
            content_type: None,
            data: None,
            callbacks: Callbacks::default(),
            timeout: None,
            response_type: None,
            with_credentials: false,
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn data(mut self, data: impl Into<Payload>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn success<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&ResponseData, u16, &RawResponse) + Send + 'static,
    {
        self.callbacks.success = Some(Box::new(callback));
        self
    }

    pub fn error<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&ResponseData, u16) + Send + 'static,
    {
        self.callbacks.error = Some(Box::new(callback));
        self
    }

    /// Best-effort deadline; enforcement depends on the transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// Send cookies and auth with cross-origin browser requests.
    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }

    /// Validates the description and splits it into what the transport sends
    /// and who gets told about the outcome.
    pub fn into_parts(self) -> Result<(OutgoingRequest, Callbacks), ConfigError> {
        let url = self.url.ok_or(ConfigError::Undefined("url"))?;
        let method: Method = self.method.parse()?;
        let uri = parse_url(&url)?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            headers.append(header_name, header_value);
        }

        let payload = match self.data {
            Some(data) => Some(payload::classify(data, self.content_type.as_deref())?),
            None => None,
        };

        if let Some(content_type) = &self.content_type {
            HeaderValue::from_str(content_type).map_err(|e| ConfigError::InvalidHeader {
                name: CONTENT_TYPE.to_string(),
                reason: e.to_string(),
            })?;
        }

        let request = OutgoingRequest {
            method,
            uri,
            headers,
            content_type: self.content_type,
            payload,
            timeout: self.timeout,
            response_type: self.response_type,
            with_credentials: self.with_credentials,
        };
        Ok((request, self.callbacks))
    }
}

impl fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpec")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("content_type", &self.content_type)
            .field("data", &self.data)
            .field("callbacks", &self.callbacks)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn parse_url(url: &str) -> Result<Uri, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        Some(_) => return Err(invalid("unsupported scheme")),
        None => return Err(invalid("missing scheme")),
    }
    if uri.authority().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(uri)
}

/// A validated request as handed to a [`Transport`](crate::Transport).
#[derive(Debug)]
pub struct OutgoingRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub content_type: Option<String>,
    pub payload: Option<Payload>,
    pub timeout: Option<Duration>,
    pub response_type: Option<ResponseType>,
    pub with_credentials: bool,
}

impl OutgoingRequest {
    /// Content type sent with the body: the declared one, else the one the
    /// payload implies.
    pub fn effective_content_type(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .or_else(|| self.payload.as_ref().and_then(Payload::implied_content_type))
    }

    /// Builds the `http` request carrying the serialized body.
    pub fn to_http_request(&self) -> SimpleResult<Request<Vec<u8>>> {
        let mut builder = Request::builder()
            .method(http::Method::from(self.method))
            .uri(self.uri.clone());

        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        if let Some(content_type) = self.effective_content_type() {
            if !self.headers.contains_key(CONTENT_TYPE) {
                builder = builder.header(CONTENT_TYPE, content_type);
            }
        }

        let body = self.payload.as_ref().map(Payload::to_bytes).unwrap_or_default();
        builder.body(body).into_simple_error()
    }
}

// Serializes the HTTP/1.1 request head that precedes the body on the wire
pub fn serialize_http_request<T>(req: &Request<T>) -> Vec<u8>
where
    T: AsRef<[u8]>,
{
    let method = req.method();
    let uri = req.uri();
    let body_len = req.body().as_ref().len();

    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());

    let mut head = format!("{method} {path_and_query} HTTP/1.1\r\n").into_bytes();
    let mut push_header = |name: &str, value: &[u8]| {
        head.extend_from_slice(name.as_bytes());
        head.extend_from_slice(b": ");
        head.extend_from_slice(value);
        head.extend_from_slice(b"\r\n");
    };

    let headers = req.headers();
    if !headers.contains_key(HOST) {
        if let Some(authority) = uri.authority() {
            push_header(HOST.as_str(), authority.as_str().as_bytes());
        }
    }
    for (name, value) in headers {
        push_header(name.as_str(), value.as_bytes());
    }
    let sends_body = body_len > 0
        || *method == http::Method::POST
        || *method == http::Method::PUT
        || *method == http::Method::PATCH;
    if sends_body && !headers.contains_key(http::header::CONTENT_LENGTH) {
        push_header(http::header::CONTENT_LENGTH.as_str(), body_len.to_string().as_bytes());
    }
    if !headers.contains_key(http::header::CONNECTION) {
        push_header(http::header::CONNECTION.as_str(), b"close");
    }

    head.extend_from_slice(b"\r\n");
    head
}
