//! The delivery seam shared by channels and streams.

use crate::pulse::Pulse;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::sync::Arc;

/// Stored payload handler, invoked once per delivered pulse.
pub type PayloadHandler<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Stored lifecycle handler, invoked with the pulse describing a release.
pub type ReleaseHandler<T> = Arc<dyn Fn(Pulse<T>) -> BoxFuture<'static, ()> + Send + Sync>;

/// A single-consumer delivery endpoint.
///
/// Implemented by [`Channel`](crate::Channel) and [`Stream`](crate::Stream)
/// so consumers can hold either behind one interface without caring which
/// lifecycle variant they were handed.
#[async_trait]
pub trait Endpoint<T: Send + 'static>: Send + Sync {
    /// Deliver a pulse to the registered handler, waiting for it to
    /// complete.
    async fn send(&self, pulse: Pulse<T>);

    /// The endpoint flavor, e.g. "channel" or "stream".
    fn kind(&self) -> &'static str;
}
