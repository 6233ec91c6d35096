//! Transport selection.
//!
//! Exactly one strategy is compiled in: the socket client under the `std`
//! feature, the browser `fetch` client on `wasm32` without it. The choice is
//! made at build time and never changes while the process runs.

use core::future::Future;

use crate::error::TransportError;
use crate::request::OutgoingRequest;
use crate::response::Completion;

#[cfg(feature = "std")]
pub mod std_impl;
#[cfg(all(target_arch = "wasm32", not(feature = "std")))]
pub mod wasm_impl;

#[cfg(feature = "std")]
pub use std_impl::StdTransport as PlatformTransport;
#[cfg(all(target_arch = "wasm32", not(feature = "std")))]
pub use wasm_impl::WasmTransport as PlatformTransport;

/// Which family of networking primitive performs the I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The host's `fetch` API.
    Browser,
    /// Raw client sockets.
    Server,
}

/// Performs one HTTP exchange.
///
/// Implementations must not block the calling thread and must report a
/// status of 400 or above as [`TransportError::Status`].
#[allow(async_fn_in_trait)]
pub trait Transport: Send + Sync + 'static {
    fn kind(&self) -> TransportKind;

    async fn transmit(&self, request: OutgoingRequest) -> Result<Completion, TransportError>;
}

/// The strategy compiled into this build.
pub fn transport_kind() -> TransportKind {
    #[cfg(feature = "std")]
    {
        TransportKind::Server
    }

    #[cfg(not(feature = "std"))]
    {
        TransportKind::Browser
    }
}

/// Runs a request to completion off the caller's thread of control.
#[cfg(feature = "std")]
pub(crate) fn spawn<F, Fut>(task: F)
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()>,
{
    std::thread::spawn(move || async_io::block_on(task()));
}

/// Runs a request to completion on the browser's event loop.
#[cfg(all(target_arch = "wasm32", not(feature = "std")))]
pub(crate) fn spawn<F, Fut>(task: F)
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(task());
}
