//! Request bodies and their classification against a declared content type.
//!
//! Binary content types are strict about which shapes they accept. A
//! [`RawBuffer`] is an untyped block of memory and is refused by both of them;
//! wrap it in a [`ByteView`] to send its bytes. Every other content type takes
//! the payload as-is.

use core::fmt;
use core::ops::Index;
use std::sync::Arc;

use miniserde::json::Value;

use crate::error::PayloadError;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const BLOB: &str = "application/blob";
pub const JSON: &str = "application/json";

/// A fixed-size block of bytes with no element type attached.
#[derive(Clone, PartialEq, Eq)]
pub struct RawBuffer(Arc<[u8]>);

impl RawBuffer {
    /// Allocates a zero-filled buffer of `len` bytes.
    pub fn new(len: usize) -> Self {
        Self(vec![0u8; len].into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for RawBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl fmt::Debug for RawBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBuffer").field("len", &self.len()).finish()
    }
}

/// An unsigned 8-bit view over a region of a [`RawBuffer`].
#[derive(Clone, PartialEq, Eq)]
pub struct ByteView {
    buffer: RawBuffer,
    offset: usize,
    len: usize,
}

impl ByteView {
    /// Views the whole buffer.
    pub fn new(buffer: RawBuffer) -> Self {
        let len = buffer.len();
        Self {
            buffer,
            offset: 0,
            len,
        }
    }

    /// Views `len` bytes starting at `offset`, or `None` if that runs past the end.
    pub fn with_range(buffer: RawBuffer, offset: usize, len: usize) -> Option<Self> {
        let end = offset.checked_add(len)?;
        (end <= buffer.len()).then_some(Self {
            buffer,
            offset,
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<u8> {
        self.as_slice().get(index).copied()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer.as_bytes()[self.offset..self.offset + self.len]
    }

    /// The buffer this view reads from.
    pub fn buffer(&self) -> &RawBuffer {
        &self.buffer
    }
}

impl From<&[u8]> for ByteView {
    fn from(bytes: &[u8]) -> Self {
        Self::new(RawBuffer::from(bytes.to_vec()))
    }
}

impl Index<usize> for ByteView {
    type Output = u8;

    fn index(&self, index: usize) -> &u8 {
        &self.as_slice()[index]
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// File-like binary content, optionally typed and named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    bytes: Vec<u8>,
    mime_type: Option<String>,
    name: Option<String>,
}

impl Blob {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.map(str::to_string),
            name: None,
        }
    }

    /// A blob carrying a file name.
    pub fn file(name: &str, bytes: impl Into<Vec<u8>>, mime_type: Option<&str>) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::new(bytes, mime_type)
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// A request body.
pub enum Payload {
    Text(String),
    /// Plain ordered sequence of byte values.
    ByteSequence(Vec<u8>),
    TypedView(ByteView),
    Blob(Blob),
    RawBuffer(RawBuffer),
    Json(Value),
}

impl Payload {
    /// Article-qualified name of the payload shape, as used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Payload::Text(_) => "a String",
            Payload::ByteSequence(_) => "an Array",
            Payload::TypedView(_) => "an ArrayBufferView",
            Payload::Blob(_) => "a Blob",
            Payload::RawBuffer(_) => "an ArrayBuffer",
            Payload::Json(_) => "an Object",
        }
    }

    /// The bytes written to the wire for this payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Payload::Text(text) => text.as_bytes().to_vec(),
            Payload::ByteSequence(bytes) => bytes.clone(),
            Payload::TypedView(view) => view.as_slice().to_vec(),
            Payload::Blob(blob) => blob.bytes().to_vec(),
            Payload::RawBuffer(buffer) => buffer.as_bytes().to_vec(),
            Payload::Json(value) => miniserde::json::to_string(value).into_bytes(),
        }
    }

    /// Content type implied by the payload itself when the caller declared none.
    pub fn implied_content_type(&self) -> Option<&str> {
        match self {
            Payload::Blob(blob) => blob.mime_type(),
            Payload::Json(_) => Some(JSON),
            _ => None,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Payload::ByteSequence(bytes) => f.debug_tuple("ByteSequence").field(bytes).finish(),
            Payload::TypedView(view) => f.debug_tuple("TypedView").field(view).finish(),
            Payload::Blob(blob) => f.debug_tuple("Blob").field(blob).finish(),
            Payload::RawBuffer(buffer) => f.debug_tuple("RawBuffer").field(buffer).finish(),
            Payload::Json(value) => f
                .debug_tuple("Json")
                .field(&miniserde::json::to_string(value))
                .finish(),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::ByteSequence(bytes)
    }
}

impl From<ByteView> for Payload {
    fn from(view: ByteView) -> Self {
        Payload::TypedView(view)
    }
}

impl From<Blob> for Payload {
    fn from(blob: Blob) -> Self {
        Payload::Blob(blob)
    }
}

impl From<RawBuffer> for Payload {
    fn from(buffer: RawBuffer) -> Self {
        Payload::RawBuffer(buffer)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

/// Media type without parameters, lowercased.
pub(crate) fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Checks `payload` against `content_type` and returns it ready for a transport.
pub fn classify(payload: Payload, content_type: Option<&str>) -> Result<Payload, PayloadError> {
    let Some(content_type) = content_type else {
        return Ok(payload);
    };

    match essence(content_type).as_str() {
        OCTET_STREAM => match payload {
            Payload::Text(_) | Payload::ByteSequence(_) | Payload::TypedView(_) | Payload::Blob(_) => {
                Ok(payload)
            }
            Payload::RawBuffer(_) | Payload::Json(_) => Err(PayloadError::NotBinaryView),
        },
        BLOB => match payload {
            Payload::Blob(_) => Ok(payload),
            other => Err(PayloadError::NotBlob {
                found: other.describe(),
            }),
        },
        _ => Ok(payload),
    }
}
