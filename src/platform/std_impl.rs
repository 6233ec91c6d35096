use async_io::Timer;
use futures_lite::{future, io::BufReader, AsyncWriteExt};
use http::{Request, Response};
use simple_error::SimpleResult;

use super::{Transport, TransportKind};
use crate::async_connection_factory::{AsyncConnection, AsyncConnectionFactory};
use crate::error::{IntoSimpleError, TransportError};
use crate::request::{self, OutgoingRequest};
use crate::response::{self, Completion, RawResponse};

/// Speaks HTTP/1.1 over a fresh client socket per request.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdTransport;

impl Transport for StdTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Server
    }

    async fn transmit(&self, request: OutgoingRequest) -> Result<Completion, TransportError> {
        let http_request = request.to_http_request()?;
        log::debug!("{} {}", http_request.method(), http_request.uri());

        let exchange = async {
            let stream = AsyncConnectionFactory::connect(http_request.uri()).await?;
            let mut connection = StdConnection::new(stream);
            connection.send_request(&http_request).await
        };
        let exchange = async { exchange.await.map_err(TransportError::from) };

        let response = match request.timeout {
            Some(timeout) => {
                let deadline = async {
                    Timer::after(timeout).await;
                    Err(TransportError::Timeout)
                };
                future::or(exchange, deadline).await?
            }
            None => exchange.await?,
        };

        response::settle(response, request.response_type)
    }
}

pub struct StdConnection {
    stream: Box<dyn AsyncConnection>,
}

impl StdConnection {
    pub fn new(stream: Box<dyn AsyncConnection>) -> Self {
        Self { stream }
    }

    pub async fn send_request<T>(&mut self, request: &Request<T>) -> SimpleResult<RawResponse>
    where
        T: AsRef<[u8]>,
    {
        // Write the request head, then the body if there is one
        let head = request::serialize_http_request(request);
        log::debug!("request head = {}", String::from_utf8_lossy(&head));
        self.stream.write_all(&head).await.into_simple_error()?;

        let body = request.body().as_ref();
        if !body.is_empty() {
            self.stream.write_all(body).await.into_simple_error()?;
        }
        self.stream.flush().await.into_simple_error()?;

        // Read and parse the response
        let mut reader = BufReader::new(&mut self.stream);
        let response_status_line = response::read_response_status_line(&mut reader).await?;
        log::debug!("response_status_line = {}", response_status_line.trim_end());
        let (response_version, response_status) = response::parse_response_status_line(&response_status_line)?;
        let response_headers = response::read_response_headers(&mut reader).await?;
        log::debug!("response_headers = {response_headers:?}");
        let is_head = request.method() == http::Method::HEAD;
        let response_body = if response::has_body(is_head, response_status) {
            response::read_response_body(&mut reader, &response_headers).await?
        } else {
            Vec::new()
        };
        log::trace!("response_body = {response_body:02x?}");

        let mut response = Response::builder()
            .status(response_status)
            .version(response_version)
            .body(response_body)
            .into_simple_error()?;
        *response.headers_mut() = response_headers;

        Ok(response)
    }
}
