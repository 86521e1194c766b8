//! # Signal Publisher
//!
//! The messaging core only sees [`EventPublisher`]. [`InMemoryEventBus`]
//! fans each signal out to every live [`Subscription`] and keeps per-topic
//! tallies so a monitor can read totals without holding a subscription.

use crate::events::{EventFilter, EventTopic, MessagingEvent};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Sink for the messaging core's observable signals.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Emit `event`; returns how many subscribers it reached.
    async fn publish(&self, event: MessagingEvent) -> usize;

    /// Signals emitted since construction, heard or not.
    fn events_published(&self) -> u64;
}

/// Running totals, one slot per concrete topic.
#[derive(Default)]
struct SignalTally {
    outbound: AtomicU64,
    inbound: AtomicU64,
    failures: AtomicU64,
    /// Signals emitted while nobody was subscribed.
    unheard: AtomicU64,
}

impl SignalTally {
    fn slot(&self, topic: EventTopic) -> Option<&AtomicU64> {
        match topic {
            EventTopic::Outbound => Some(&self.outbound),
            EventTopic::Inbound => Some(&self.inbound),
            EventTopic::Failures => Some(&self.failures),
            EventTopic::All => None,
        }
    }

    fn total(&self) -> u64 {
        [&self.outbound, &self.inbound, &self.failures]
            .iter()
            .map(|counter| counter.load(Ordering::Relaxed))
            .sum()
    }
}

/// Broadcast-backed bus for a single process.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<MessagingEvent>,
    tally: SignalTally,
    capacity: usize,
}

impl InMemoryEventBus {
    /// Bus with [`DEFAULT_CHANNEL_CAPACITY`] slots per subscriber.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Bus holding at most `capacity` unread signals per subscriber.
    /// Slow subscribers skip ahead once they fall further behind.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            tally: SignalTally::default(),
            capacity,
        }
    }

    /// Start receiving signals that pass `filter`. Only signals published
    /// after this call are seen.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        trace!(topics = ?filter.topics, channels = ?filter.channels, "[qc-15] Monitor subscribed");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Like [`subscribe`](Self::subscribe), as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        self.subscribe(filter).into_stream()
    }

    /// Live subscriptions (dropped ones are not counted).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Signals published on `topic`. `EventTopic::All` gives the total.
    #[must_use]
    pub fn published_on(&self, topic: EventTopic) -> u64 {
        self.tally
            .slot(topic)
            .map_or_else(|| self.tally.total(), |c| c.load(Ordering::Relaxed))
    }

    /// Signals nobody was subscribed to hear.
    #[must_use]
    pub fn unheard(&self) -> u64 {
        self.tally.unheard.load(Ordering::Relaxed)
    }

    /// Per-subscriber buffer size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: MessagingEvent) -> usize {
        let topic = event.topic();
        if let Some(counter) = self.tally.slot(topic) {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        let channel = event.channel();
        // `send` only fails when there are no receivers
        let reached = self.sender.send(event).unwrap_or_else(|_| {
            self.tally.unheard.fetch_add(1, Ordering::Relaxed);
            0
        });
        debug!(?topic, %channel, reached, "[qc-15] Signal published");
        reached
    }

    fn events_published(&self) -> u64 {
        self.tally.total()
    }
}
