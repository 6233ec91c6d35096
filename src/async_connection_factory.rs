use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use async_io::Async;
use async_tls::client::TlsStream;
use async_tls::TlsConnector;
use futures_channel::oneshot;
use futures_lite::{AsyncRead, AsyncWrite};
use http::Uri;
use simple_error::{SimpleError, SimpleResult};

use crate::error::IntoSimpleError;

/// A byte stream to an HTTP server, plain or TLS.
pub trait AsyncConnection: AsyncRead + AsyncWrite + Send + Sync + Unpin {
    fn is_encrypted(&self) -> bool;
}

impl AsyncConnection for Async<TcpStream> {
    fn is_encrypted(&self) -> bool {
        false
    }
}

impl AsyncConnection for TlsStream<Async<TcpStream>> {
    fn is_encrypted(&self) -> bool {
        true
    }
}

/// Where a request has to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

pub struct AsyncConnectionFactory;

impl AsyncConnectionFactory {
    // Extracts host, port and whether TLS is needed from the request URI
    pub fn endpoint(uri: &Uri) -> SimpleResult<Endpoint> {
        let authority = uri
            .authority()
            .ok_or_else(|| SimpleError::new("No authority found in URI"))?;
        let tls = match uri.scheme_str() {
            Some("http") => false,
            Some("https") => true,
            Some(other) => return Err(SimpleError::new(format!("Unsupported URL scheme {other}"))),
            None => return Err(SimpleError::new("No scheme found in URI")),
        };
        let port = authority.port_u16().unwrap_or(if tls { 443 } else { 80 });
        // bracketed IPv6 literals resolve without their brackets
        let host = authority.host().trim_start_matches('[').trim_end_matches(']');

        Ok(Endpoint {
            host: host.to_string(),
            port,
            tls,
        })
    }

    // getaddrinfo blocks, so the lookup runs on its own thread and the caller awaits it.
    // A request timeout can fire while the lookup is still pending.
    async fn resolve(endpoint: &Endpoint) -> SimpleResult<SocketAddr> {
        let (sender, receiver) = oneshot::channel();
        let target = (endpoint.host.clone(), endpoint.port);
        std::thread::Builder::new()
            .name(format!("resolve {}", endpoint.host))
            .spawn(move || {
                let _ = sender.send(target.to_socket_addrs().map(|mut addrs| addrs.next()));
            })
            .into_simple_error()?;

        receiver
            .await
            .map_err(|_| SimpleError::new("resolver thread exited without an answer"))?
            .into_simple_error()?
            .ok_or_else(|| SimpleError::new(format!("Failed to resolve host {}", endpoint.host)))
    }

    pub async fn connect(uri: &Uri) -> SimpleResult<Box<dyn AsyncConnection>> {
        let endpoint = Self::endpoint(uri)?;
        let addr = Self::resolve(&endpoint).await?;
        log::debug!("connecting to {addr} for {}", endpoint.host);
        let stream = Async::<TcpStream>::connect(addr).await.into_simple_error()?;

        let stream: Box<dyn AsyncConnection> = if endpoint.tls {
            let tls_connector = TlsConnector::new();
            Box::new(tls_connector.connect(&endpoint.host, stream).await.into_simple_error()?)
        } else {
            Box::new(stream)
        };
        log::debug!("connected to {addr}, encrypted = {}", stream.is_encrypted());

        Ok(stream)
    }
}
