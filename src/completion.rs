//! One outcome, two listeners.
//!
//! A request attempt produces exactly one outcome. [`Completer::complete`]
//! hands it first to the optional callback pair and then to the [`Deferred`]
//! the caller holds. The completer is consumed by that call, so nothing can
//! settle twice. A panicking callback is logged and the deferred still gets
//! the outcome.

use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::panic::{self, AssertUnwindSafe};

use futures_channel::oneshot;

use crate::error::TransportError;
use crate::response::{Completion, RawResponse, ResponseData};

pub type Outcome = Result<Completion, TransportError>;

/// Invoked with `(data, status, raw_response)` on success.
pub type SuccessCallback = Box<dyn FnOnce(&ResponseData, u16, &RawResponse) + Send>;

/// Invoked with `(data, status)` on failure; status is 0 without a response.
pub type ErrorCallback = Box<dyn FnOnce(&ResponseData, u16) + Send>;

/// The optional callback pair of a request.
#[derive(Default)]
pub struct Callbacks {
    pub success: Option<SuccessCallback>,
    pub error: Option<ErrorCallback>,
}

impl Callbacks {
    fn notify(self, outcome: &Outcome) {
        match outcome {
            Ok(completion) => {
                if let Some(success) = self.success {
                    success(&completion.data, completion.status, &completion.raw_response);
                }
            }
            Err(err) => {
                if let Some(error) = self.error {
                    error(err.data(), err.status());
                }
            }
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

/// Settles one request attempt.
#[derive(Debug)]
pub struct Completer {
    callbacks: Callbacks,
    sender: oneshot::Sender<Outcome>,
}

impl Completer {
    pub fn complete(self, outcome: Outcome) {
        match &outcome {
            Ok(completion) => log::debug!("request succeeded with status {}", completion.status),
            Err(err) => log::debug!("request failed: {err}"),
        }

        let Completer { callbacks, sender } = self;
        if panic::catch_unwind(AssertUnwindSafe(|| callbacks.notify(&outcome))).is_err() {
            log::warn!("completion callback panicked");
        }

        if sender.send(outcome).is_err() {
            log::trace!("deferred dropped before settlement");
        }
    }
}

/// Single-settlement future for the outcome of one request.
#[derive(Debug)]
#[must_use = "a deferred does nothing to the request but reports its outcome"]
pub struct Deferred {
    receiver: oneshot::Receiver<Outcome>,
}

impl Deferred {
    /// Blocks the current thread until the request settles.
    #[cfg(feature = "std")]
    pub fn wait(self) -> Outcome {
        futures_lite::future::block_on(self)
    }
}

impl Future for Deferred {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|settled| settled.unwrap_or(Err(TransportError::Abandoned)))
    }
}

/// Pairs a completer with the deferred it settles.
pub fn deferred(callbacks: Callbacks) -> (Completer, Deferred) {
    let (sender, receiver) = oneshot::channel();
    (Completer { callbacks, sender }, Deferred { receiver })
}
