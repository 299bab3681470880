//! Single-handler delivery with explicit two-sided release.
//!
//! A [`Stream`] delivers like a [`Channel`](crate::Channel) but adds two
//! lifecycle callbacks, one per logical end. Either end may release its
//! hold on the connection exactly once; the matching callback receives a
//! caller-supplied pulse describing the release.

use crate::endpoint::{Endpoint, PayloadHandler, ReleaseHandler};
use crate::pulse::Pulse;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// The two logical ends of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum End {
    /// The producing side.
    Source,
    /// The consuming side.
    Anchor,
}

impl fmt::Display for End {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            End::Source => write!(f, "source"),
            End::Anchor => write!(f, "anchor"),
        }
    }
}

/// A single-consumer delivery endpoint with release notification for both
/// ends.
///
/// The released flags are the only mutable state; they are updated with an
/// atomic swap so each callback fires at most once even when both sides
/// race to release concurrently.
pub struct Stream<T> {
    handler: PayloadHandler<T>,
    on_source_released: ReleaseHandler<T>,
    on_anchor_released: ReleaseHandler<T>,
    source_released: AtomicBool,
    anchor_released: AtomicBool,
}

impl<T: Send + 'static> Stream<T> {
    /// Create a new stream. Both ends start out held.
    #[must_use]
    pub fn new<S, SF, A, AF, H, HF>(
        on_source_released: S,
        on_anchor_released: A,
        handler: H,
    ) -> Self
    where
        S: Fn(Pulse<T>) -> SF + Send + Sync + 'static,
        SF: Future<Output = ()> + Send + 'static,
        A: Fn(Pulse<T>) -> AF + Send + Sync + 'static,
        AF: Future<Output = ()> + Send + 'static,
        H: Fn(T) -> HF + Send + Sync + 'static,
        HF: Future<Output = ()> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |payload| -> BoxFuture<'static, ()> {
                Box::pin(handler(payload))
            }),
            on_source_released: Arc::new(move |pulse| -> BoxFuture<'static, ()> {
                Box::pin(on_source_released(pulse))
            }),
            on_anchor_released: Arc::new(move |pulse| -> BoxFuture<'static, ()> {
                Box::pin(on_anchor_released(pulse))
            }),
            source_released: AtomicBool::new(false),
            anchor_released: AtomicBool::new(false),
        }
    }

    /// Deliver a pulse to the primary handler and wait for it to complete.
    ///
    /// Same contract as [`Channel::send`](crate::Channel::send). Sending
    /// stays valid regardless of release state, and a release does not
    /// cancel an in-flight send.
    pub async fn send(&self, pulse: Pulse<T>) {
        if self.is_fully_released() {
            trace!(pulse = %pulse.id(), "Delivering on a fully released stream");
        }
        if pulse.is_debug() {
            debug!(pulse = %pulse.id(), trace = %pulse.trace(), "Delivering pulse");
        } else {
            trace!(pulse = %pulse.id(), "Delivering pulse");
        }
        (self.handler)(pulse.into_payload()).await;
    }

    /// Release one end of the stream.
    ///
    /// The first release of an end invokes that end's callback with
    /// `pulse` and returns `true` once the callback completes. Further
    /// releases of the same end are no-ops returning `false`. The two ends
    /// are independent: releasing one never triggers the other.
    pub async fn release(&self, end: End, pulse: Pulse<T>) -> bool {
        if self.flag(end).swap(true, Ordering::SeqCst) {
            trace!(end = %end, "End already released");
            return false;
        }

        debug!(end = %end, pulse = %pulse.id(), "Releasing stream end");
        let callback = match end {
            End::Source => &self.on_source_released,
            End::Anchor => &self.on_anchor_released,
        };
        callback(pulse).await;
        true
    }

    /// Whether the given end has been released.
    #[must_use]
    pub fn is_released(&self, end: End) -> bool {
        self.flag(end).load(Ordering::SeqCst)
    }

    /// Whether both ends have been released.
    #[must_use]
    pub fn is_fully_released(&self) -> bool {
        self.is_released(End::Source) && self.is_released(End::Anchor)
    }

    fn flag(&self, end: End) -> &AtomicBool {
        match end {
            End::Source => &self.source_released,
            End::Anchor => &self.anchor_released,
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Endpoint<T> for Stream<T> {
    async fn send(&self, pulse: Pulse<T>) {
        Stream::send(self, pulse).await;
    }

    fn kind(&self) -> &'static str {
        "stream"
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field(
                "source_released",
                &self.source_released.load(Ordering::Relaxed),
            )
            .field(
                "anchor_released",
                &self.anchor_released.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Stream whose three callbacks just bump counters.
    fn counting_stream(
        source: Arc<AtomicUsize>,
        anchor: Arc<AtomicUsize>,
        delivered: Arc<AtomicUsize>,
    ) -> Stream<&'static str> {
        Stream::new(
            move |_pulse| {
                let source = Arc::clone(&source);
                async move {
                    source.fetch_add(1, Ordering::SeqCst);
                }
            },
            move |_pulse| {
                let anchor = Arc::clone(&anchor);
                async move {
                    anchor.fetch_add(1, Ordering::SeqCst);
                }
            },
            move |_payload: &'static str| {
                let delivered = Arc::clone(&delivered);
                async move {
                    delivered.fetch_add(1, Ordering::SeqCst);
                }
            },
        )
    }

    #[tokio::test]
    async fn test_send_delivers_payload() {
        let received = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let stream = Stream::new(
            |_| async {},
            |_| async {},
            move |payload: u32| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().unwrap().push(payload);
                }
            },
        );

        stream.send(Pulse::new(11)).await;
        stream.send(Pulse::new(22)).await;

        assert_eq!(*received.lock().unwrap(), [11, 22]);
    }

    #[tokio::test]
    async fn test_release_fires_once() {
        let source = Arc::new(AtomicUsize::new(0));
        let anchor = Arc::new(AtomicUsize::new(0));
        let delivered = Arc::new(AtomicUsize::new(0));
        let stream = counting_stream(
            Arc::clone(&source),
            Arc::clone(&anchor),
            Arc::clone(&delivered),
        );

        assert!(stream.release(End::Source, Pulse::new("bye")).await);
        assert!(!stream.release(End::Source, Pulse::new("bye again")).await);

        assert_eq!(source.load(Ordering::SeqCst), 1);
        assert_eq!(anchor.load(Ordering::SeqCst), 0);
        assert!(stream.is_released(End::Source));
        assert!(!stream.is_released(End::Anchor));
    }

    #[tokio::test]
    async fn test_ends_release_independently() {
        let source = Arc::new(AtomicUsize::new(0));
        let anchor = Arc::new(AtomicUsize::new(0));
        let delivered = Arc::new(AtomicUsize::new(0));
        let stream = counting_stream(
            Arc::clone(&source),
            Arc::clone(&anchor),
            Arc::clone(&delivered),
        );

        stream.release(End::Anchor, Pulse::new("anchor out")).await;
        assert_eq!(source.load(Ordering::SeqCst), 0);
        assert_eq!(anchor.load(Ordering::SeqCst), 1);
        assert!(!stream.is_fully_released());

        stream.release(End::Source, Pulse::new("source out")).await;
        assert_eq!(source.load(Ordering::SeqCst), 1);
        assert!(stream.is_fully_released());
    }

    #[tokio::test]
    async fn test_concurrent_releases_fire_once() {
        let source = Arc::new(AtomicUsize::new(0));
        let anchor = Arc::new(AtomicUsize::new(0));
        let delivered = Arc::new(AtomicUsize::new(0));
        let stream = Arc::new(counting_stream(
            Arc::clone(&source),
            Arc::clone(&anchor),
            Arc::clone(&delivered),
        ));

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let stream = Arc::clone(&stream);
                tokio::spawn(async move { stream.release(End::Source, Pulse::new("race")).await })
            })
            .collect();

        let mut fired = 0;
        for task in tasks {
            if task.await.unwrap() {
                fired += 1;
            }
        }

        assert_eq!(fired, 1);
        assert_eq!(source.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_send_remains_valid_after_release() {
        let source = Arc::new(AtomicUsize::new(0));
        let anchor = Arc::new(AtomicUsize::new(0));
        let delivered = Arc::new(AtomicUsize::new(0));
        let stream = counting_stream(
            Arc::clone(&source),
            Arc::clone(&anchor),
            Arc::clone(&delivered),
        );

        stream.release(End::Source, Pulse::new("done")).await;
        stream.release(End::Anchor, Pulse::new("done")).await;
        assert!(stream.is_fully_released());

        stream.send(Pulse::new("late")).await;
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stream_as_endpoint_object() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&delivered);
        let endpoint: Arc<dyn Endpoint<&'static str>> = Arc::new(Stream::new(
            |_| async {},
            |_| async {},
            move |_: &'static str| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
        ));

        assert_eq!(endpoint.kind(), "stream");
        endpoint.send(Pulse::new("via trait")).await;
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }
}
