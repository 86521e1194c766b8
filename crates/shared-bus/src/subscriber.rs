//! # Subscriptions
//!
//! Receiving end of the signal bus. Each subscription carries its own
//! [`EventFilter`]; signals that fail it are skipped silently.

use crate::events::{EventFilter, MessagingEvent};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::Stream;
use tracing::warn;

/// Subscription failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Every publisher handle is gone.
    #[error("signal bus closed")]
    Closed,
}

/// Filtered view of the bus. Dropping it unsubscribes.
pub struct Subscription {
    receiver: broadcast::Receiver<MessagingEvent>,
    filter: EventFilter,
    missed: u64,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<MessagingEvent>, filter: EventFilter) -> Self {
        Self {
            receiver,
            filter,
            missed: 0,
        }
    }

    /// Wait for the next matching signal. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<MessagingEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => self.note_lag(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching signal if one is already buffered.
    pub fn try_recv(&mut self) -> Result<Option<MessagingEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => self.note_lag(skipped),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    /// Everything matching that is buffered right now, oldest first.
    pub fn drain(&mut self) -> Vec<MessagingEvent> {
        std::iter::from_fn(|| self.try_recv().ok().flatten()).collect()
    }

    /// Signals lost because this subscriber fell behind the bus capacity.
    #[must_use]
    pub fn missed(&self) -> u64 {
        self.missed
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Turn into a `Stream`, keeping the filter.
    #[must_use]
    pub fn into_stream(self) -> EventStream {
        EventStream {
            inner: BroadcastStream::new(self.receiver),
            filter: self.filter,
        }
    }

    fn note_lag(&mut self, skipped: u64) {
        self.missed += skipped;
        warn!(skipped, "[qc-15] Monitor fell behind the signal bus");
    }
}

/// `Stream` of matching signals. Ends when the bus is dropped.
pub struct EventStream {
    inner: BroadcastStream<MessagingEvent>,
    filter: EventFilter,
}

impl EventStream {
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = MessagingEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
                Some(Ok(event)) if self.filter.matches(&event) => return Poll::Ready(Some(event)),
                Some(Ok(_)) => {}
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!(skipped, "[qc-15] Signal stream fell behind the bus");
                }
                None => return Poll::Ready(None),
            }
        }
    }
}
