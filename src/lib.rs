//! One `send` for HTTP requests, whichever host the crate runs on.
//!
//! A request is described by a [`RequestSpec`]. [`send`] validates it on the
//! spot and then performs the exchange in the background through the transport
//! compiled into this build: raw sockets with the `std` feature, the browser's
//! `fetch` on `wasm32` without it. The outcome is delivered to the optional
//! `success`/`error` callbacks and to the returned [`Deferred`].
//!
//! ```no_run
//! use http_dispatch::{send, RequestSpec};
//!
//! let deferred = send(
//!     RequestSpec::new("GET")
//!         .url("http://localhost:3000/")
//!         .success(|data, status, _raw| println!("{status}: {data:?}")),
//! )
//! .expect("valid request");
//!
//! match deferred.wait() {
//!     Ok(completion) => println!("done with {}", completion.status),
//!     Err(err) => println!("failed with {}", err.status()),
//! }
//! ```

#[cfg(not(any(feature = "std", target_arch = "wasm32")))]
compile_error!("Enable the \"std\" feature or build for wasm32 to get a transport.");

mod client;
mod completion;
mod error;
mod method;
mod payload;
mod platform;
mod request;
mod response;

#[cfg(feature = "std")]
mod async_connection_factory;

pub use client::Requester;
pub use completion::{Callbacks, Deferred, ErrorCallback, Outcome, SuccessCallback};
pub use error::{ConfigError, PayloadError, TransportError};
pub use method::Method;
pub use payload::{classify, Blob, ByteView, Payload, RawBuffer, BLOB, JSON, OCTET_STREAM};
pub use platform::{transport_kind, Transport, TransportKind};
pub use request::{OutgoingRequest, RequestSpec};
pub use response::{Completion, RawResponse, ResponseData, ResponseType};

#[cfg(any(feature = "std", target_arch = "wasm32"))]
pub use platform::PlatformTransport;

/// JSON values accepted as payloads and produced as response data.
pub use miniserde::json;

/// Sends a request through the platform transport.
#[cfg(any(feature = "std", target_arch = "wasm32"))]
pub fn send(spec: RequestSpec) -> Result<Deferred, ConfigError> {
    Requester::new().send(spec)
}
