// ── Event fan-out ──
//
// One bounded ring per subscriber. A publisher never waits on a reader;
// a reader that falls behind loses its oldest events and sees the loss
// in its own `dropped()` counter.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::model::{Event, EventKind};

/// Default per-subscriber buffer.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// Largest per-subscriber buffer. Every slot is allocated up front.
pub const MAX_SUBSCRIBER_BUFFER: usize = 1 << 16;

/// Cheaply cloneable publish handle.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<Event>,
}

impl EventBroadcaster {
    /// `capacity` is the number of events each subscriber may lag behind
    /// before it starts losing the oldest ones. It is clamped to
    /// `1..=MAX_SUBSCRIBER_BUFFER` and rounded up to a power of two.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(Self::effective_capacity(capacity));
        Self { tx }
    }

    /// The buffer a subscriber actually gets for a requested `capacity`.
    pub fn effective_capacity(capacity: usize) -> usize {
        capacity.clamp(1, MAX_SUBSCRIBER_BUFFER).next_power_of_two()
    }

    /// Publish to every current subscriber. Never blocks; with no
    /// subscribers the event is discarded.
    pub fn publish(&self, event: Event) {
        tracing::trace!(event = event.name(), "publish");
        let _ = self.tx.send(event);
    }

    /// Stamp and publish.
    pub fn emit(&self, kind: EventKind) {
        self.publish(Event::new(kind));
    }

    /// Start receiving events published from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            inner: BroadcastStream::new(self.tx.subscribe()),
            dropped: 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

/// A single subscriber's view of the event stream.
///
/// Yields events in publish order. Dropping it unsubscribes.
pub struct Subscription {
    inner: BroadcastStream<Event>,
    dropped: u64,
}

impl Subscription {
    /// Number of events this subscriber lost to buffer overflow so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Next event, or `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        futures_util::StreamExt::next(self).await
    }
}

impl Stream for Subscription {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(event)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(n)))) => {
                    self.dropped += n;
                    tracing::debug!(lost = n, total = self.dropped, "subscriber lagged");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("dropped", &self.dropped)
            .finish_non_exhaustive()
    }
}
