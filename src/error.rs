//! Error types.
//!
//! Caller mistakes surface synchronously as [`ConfigError`] before any I/O
//! happens. Everything that goes wrong on the wire is a [`TransportError`] and
//! only ever reaches the caller through the completion path.

use simple_error::{SimpleError, SimpleResult};
use thiserror::Error;

use crate::response::ResponseData;

/// Rejection of a request body that does not fit its declared content type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// Binary content types need a blob, a byte sequence, text or a typed view.
    #[error("data sended must be a File, a Blob, or an ArrayBufferView")]
    NotBinaryView,
    /// `application/blob` only accepts blobs.
    #[error("data sended must be a Blob, not {found}")]
    NotBlob { found: &'static str },
}

/// A request that can never be sent as described.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A mandatory field was not set.
    #[error("undefined:{0}")]
    Undefined(&'static str),
    #[error("unsupported method: {0}")]
    UnknownMethod(String),
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Failure of a request that was handed to a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with a status of 400 or above.
    #[error("request failed with status {status}")]
    Status { status: u16, data: ResponseData },
    /// No usable response was received.
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    /// The request worker went away without settling.
    #[error("request abandoned before completion")]
    Abandoned,
}

static NO_DATA: ResponseData = ResponseData::Empty;

impl TransportError {
    /// HTTP status of the failure, or 0 when no response was received.
    pub fn status(&self) -> u16 {
        match self {
            TransportError::Status { status, .. } => *status,
            _ => 0,
        }
    }

    /// Response body of the failure, empty when no response was received.
    pub fn data(&self) -> &ResponseData {
        match self {
            TransportError::Status { data, .. } => data,
            _ => &NO_DATA,
        }
    }
}

impl From<SimpleError> for TransportError {
    fn from(e: SimpleError) -> Self {
        TransportError::Network(e.to_string())
    }
}

/// Lifts foreign errors into a [`SimpleError`] for the wire-level helpers.
pub trait IntoSimpleError<T> {
    fn into_simple_error(self) -> SimpleResult<T>;
}

impl<T, E> IntoSimpleError<T> for Result<T, E>
where
    E: std::error::Error,
{
    fn into_simple_error(self) -> SimpleResult<T> {
        self.map_err(|e| SimpleError::new(e.to_string()))
    }
}
