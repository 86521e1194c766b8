//! Ordered Delivery Adapter
//!
//! Decorates any `MessageReceiver` so that each pathway
//! (`source_channel`, `sender`) is applied strictly in nonce order.
//!
//! - every delivery first passes the inner receiver's `admit` check
//! - nonce below the next expected: `DuplicateDelivery`
//! - nonce more than the window ahead of it: `ReorderWindowExceeded`
//! - nonce ahead within the window: buffered, `ReceiveOutcome::Buffered`
//! - the expected nonce: applied, then every buffered successor that is
//!   now contiguous is released behind it
//!
//! A failed delivery does not advance the pathway; the transport is
//! expected to retry that nonce. Each pathway has its own lock, so a slow
//! delivery only holds up its own pathway.

use crate::domain::{AppliedMessage, MessagingError, Origin, ReceiveOutcome};
use crate::ports::MessageReceiver;
use async_trait::async_trait;
use shared_types::{AppIdentity, ChannelId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Deliveries a pathway may hold ahead of its next expected nonce.
pub const DEFAULT_REORDER_WINDOW: u64 = 256;

type PathwayKey = (ChannelId, AppIdentity);

#[derive(Default)]
struct PathwayState {
    /// Highest nonce applied so far (nonces start at 1).
    delivered: u64,
    buffered: BTreeMap<u64, (Origin, Vec<u8>)>,
}

impl PathwayState {
    fn expected(&self) -> u64 {
        self.delivered + 1
    }
}

/// Nonce-ordering decorator around a receiver.
pub struct OrderedReceiver<R> {
    inner: R,
    window: u64,
    pathways: parking_lot::Mutex<HashMap<PathwayKey, Arc<Mutex<PathwayState>>>>,
}

impl<R> OrderedReceiver<R>
where
    R: MessageReceiver,
{
    /// Wrap `inner` with the [`DEFAULT_REORDER_WINDOW`].
    pub fn new(inner: R) -> Self {
        Self::with_window(inner, DEFAULT_REORDER_WINDOW)
    }

    /// Wrap `inner`, holding at most `window` deliveries per pathway.
    pub fn with_window(inner: R, window: u64) -> Self {
        Self {
            inner,
            window,
            pathways: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped receiver.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Deliveries each pathway may hold ahead of its next expected nonce.
    pub fn window(&self) -> u64 {
        self.window
    }

    /// Next nonce the pathway will apply.
    pub async fn next_expected(&self, channel: ChannelId, sender: AppIdentity) -> u64 {
        let state = self.pathways.lock().get(&(channel, sender)).cloned();
        match state {
            Some(state) => state.lock().await.expected(),
            None => 1,
        }
    }

    /// Deliveries currently held back across all pathways.
    pub async fn buffered_count(&self) -> usize {
        let states: Vec<_> = self.pathways.lock().values().cloned().collect();
        let mut total = 0;
        for state in states {
            total += state.lock().await.buffered.len();
        }
        total
    }

    fn pathway(&self, key: PathwayKey) -> Arc<Mutex<PathwayState>> {
        self.pathways.lock().entry(key).or_default().clone()
    }

    async fn release_buffered(&self, state: &mut PathwayState) -> Vec<AppliedMessage> {
        let mut released = Vec::new();
        while let Some((origin, envelope)) = state.buffered.remove(&state.expected()) {
            match self.inner.receive(origin, &envelope).await {
                Ok(outcome) => {
                    state.delivered = origin.nonce;
                    released.extend(outcome.into_applied());
                }
                Err(e) => {
                    // Dropped from the buffer; a redelivery of this nonce resumes the pathway
                    warn!(
                        source = %origin.source_channel,
                        nonce = origin.nonce,
                        error = %e,
                        "[qc-15] Buffered delivery failed on release"
                    );
                    break;
                }
            }
        }
        released
    }
}

#[async_trait]
impl<R> MessageReceiver for OrderedReceiver<R>
where
    R: MessageReceiver,
{
    async fn receive(
        &self,
        origin: Origin,
        envelope: &[u8],
    ) -> Result<ReceiveOutcome, MessagingError> {
        // Nothing is tracked for deliveries the inner receiver would refuse
        self.inner.admit(&origin, envelope)?;

        let pathway = self.pathway((origin.source_channel, origin.sender));
        let mut state = pathway.lock().await;
        let expected = state.expected();

        if origin.nonce < expected {
            return Err(MessagingError::DuplicateDelivery {
                expected,
                received: origin.nonce,
            });
        }

        if origin.nonce > expected {
            if origin.nonce - expected > self.window {
                warn!(
                    source = %origin.source_channel,
                    nonce = origin.nonce,
                    expected,
                    "[qc-15] Delivery outside reorder window"
                );
                return Err(MessagingError::ReorderWindowExceeded {
                    expected,
                    received: origin.nonce,
                    window: self.window,
                });
            }
            state
                .buffered
                .insert(origin.nonce, (origin, envelope.to_vec()));
            debug!(
                "[qc-15] Buffered nonce {} from {} (waiting for {})",
                origin.nonce, origin.source_channel, expected
            );
            return Ok(ReceiveOutcome::Buffered {
                origin,
                expected_nonce: expected,
            });
        }

        let mut applied = self.inner.receive(origin, envelope).await?.into_applied();
        state.delivered = origin.nonce;

        let released = self.release_buffered(&mut state).await;
        if !released.is_empty() {
            debug!(
                "[qc-15] Released {} buffered deliveries from {}",
                released.len(),
                origin.source_channel
            );
        }
        applied.extend(released);

        Ok(ReceiveOutcome::Applied(applied))
    }

    fn admit(&self, origin: &Origin, envelope: &[u8]) -> Result<(), MessagingError> {
        self.inner.admit(origin, envelope)
    }
}
