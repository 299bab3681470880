//! Single-handler delivery with implicit lifecycle.
//!
//! A [`Channel`] wraps exactly one async handler. `send` hands the pulse's
//! payload to the handler and waits for it to finish. There is no close
//! notification: the handler is released together with the last clone of
//! the channel. When either side needs to observe teardown, use a
//! [`Stream`](crate::Stream) instead.

use crate::endpoint::{Endpoint, PayloadHandler};
use crate::pulse::Pulse;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, trace};

/// A single-consumer delivery endpoint with no lifecycle signaling.
pub struct Channel<T> {
    handler: PayloadHandler<T>,
}

impl<T: Send + 'static> Channel<T> {
    /// Create a new channel wrapping `handler`.
    ///
    /// The handler may be invoked concurrently if callers issue
    /// overlapping sends; no ordering is promised between them.
    #[must_use]
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |payload| -> BoxFuture<'static, ()> {
                Box::pin(handler(payload))
            }),
        }
    }

    /// Deliver a pulse to the handler and wait for it to complete.
    ///
    /// Fire-and-forget from the endpoint's perspective: no result, no
    /// retry, no queueing. A handler failure is the handler's own concern
    /// and is not intercepted here.
    pub async fn send(&self, pulse: Pulse<T>) {
        if pulse.is_debug() {
            debug!(pulse = %pulse.id(), trace = %pulse.trace(), "Delivering pulse");
        } else {
            trace!(pulse = %pulse.id(), "Delivering pulse");
        }
        (self.handler)(pulse.into_payload()).await;
    }
}

#[async_trait]
impl<T: Send + 'static> Endpoint<T> for Channel<T> {
    async fn send(&self, pulse: Pulse<T>) {
        Channel::send(self, pulse).await;
    }

    fn kind(&self) -> &'static str {
        "channel"
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel").finish_non_exhaustive()
    }
}
