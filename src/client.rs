use std::sync::Arc;

use crate::completion::{self, Deferred};
use crate::error::ConfigError;
use crate::platform::{self, Transport};
use crate::request::RequestSpec;

#[cfg(any(feature = "std", target_arch = "wasm32"))]
use crate::platform::PlatformTransport;

/// Sends requests through one transport.
///
/// Holds no per-request state, so a single requester can serve any number of
/// concurrent sends.
#[derive(Debug)]
pub struct Requester<T> {
    transport: Arc<T>,
}

impl<T> Clone for Requester<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

#[cfg(any(feature = "std", target_arch = "wasm32"))]
impl Requester<PlatformTransport> {
    /// A requester over the transport compiled into this build.
    pub fn new() -> Self {
        Self::with_transport(PlatformTransport::default())
    }
}

#[cfg(any(feature = "std", target_arch = "wasm32"))]
impl Default for Requester<PlatformTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Requester<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Starts the request described by `spec`.
    ///
    /// Returns before any I/O completes. Configuration problems are returned
    /// here and never reach the callbacks; everything after that is reported
    /// once through both the callbacks and the returned [`Deferred`].
    pub fn send(&self, spec: RequestSpec) -> Result<Deferred, ConfigError> {
        let (request, callbacks) = spec.into_parts()?;
        log::debug!("dispatching {} {}", request.method, request.uri);

        let (completer, deferred) = completion::deferred(callbacks);
        let transport = Arc::clone(&self.transport);
        platform::spawn(move || async move {
            let outcome = transport.transmit(request).await;
            completer.complete(outcome);
        });

        Ok(deferred)
    }
}
