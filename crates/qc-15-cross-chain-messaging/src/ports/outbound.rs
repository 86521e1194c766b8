//! # Outbound Ports
//!
//! Traits for collaborators the messenger drives: the transport, the
//! receiving application's state, the return-leg treasury and the
//! reply policy.

use crate::domain::{
    DispatchReceipt, MessagingError, Options, Origin, OutboundPacket, DEFAULT_ACKNOWLEDGMENT,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{ChannelId, Fee};
use std::sync::atomic::{AtomicU64, Ordering};

/// Message transport - outbound port.
///
/// Submissions are final once accepted. Delivery happens later and is the
/// transport's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit an envelope with attached funds.
    async fn submit(&self, packet: OutboundPacket) -> Result<DispatchReceipt, MessagingError>;

    /// Estimate the fee for an envelope with the given effective options.
    async fn estimate_cost(
        &self,
        destination: ChannelId,
        envelope: &[u8],
        options: &Options,
        pay_in_secondary: bool,
    ) -> Result<Fee, MessagingError>;
}

/// Receiving application's state - outbound port.
///
/// A rejection aborts the whole receive.
#[async_trait]
pub trait ApplicationStateSink: Send + Sync {
    /// Apply a delivered payload.
    async fn apply(&self, payload: &[u8], origin: &Origin) -> Result<(), MessagingError>;
}

/// Application treasury funding automatic replies - outbound port.
pub trait ReturnLegFunding: Send + Sync {
    /// Current balance.
    fn available(&self) -> Fee;

    /// Take `amount` out of the treasury.
    fn withdraw(&self, amount: Fee) -> Result<Fee, MessagingError>;

    /// Put funds back (unspent withdrawals, refunds).
    fn deposit(&self, amount: Fee);
}

/// Reply policy for `RoundTrip` deliveries - outbound port.
pub trait Responder: Send + Sync {
    /// Payload to send back, or `None` to skip the return leg.
    fn respond(&self, origin: &Origin, payload: &[u8]) -> Option<Vec<u8>>;
}

impl<F> Responder for F
where
    F: Fn(&Origin, &[u8]) -> Option<Vec<u8>> + Send + Sync,
{
    fn respond(&self, origin: &Origin, payload: &[u8]) -> Option<Vec<u8>> {
        self(origin, payload)
    }
}

/// Always answers with the same payload.
#[derive(Clone, Debug)]
pub struct FixedAcknowledgment(Vec<u8>);

impl FixedAcknowledgment {
    /// Create a responder answering `payload`.
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self(payload.into())
    }
}

impl Default for FixedAcknowledgment {
    fn default() -> Self {
        Self::new(DEFAULT_ACKNOWLEDGMENT)
    }
}

impl Responder for FixedAcknowledgment {
    fn respond(&self, _origin: &Origin, _payload: &[u8]) -> Option<Vec<u8>> {
        Some(self.0.clone())
    }
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Mock transport for testing.
///
/// Charges a flat fee, records every accepted submission.
#[derive(Default)]
pub struct MockTransport {
    /// Fee returned by `estimate_cost` and charged by `submit`.
    pub fee: Fee,
    /// Reject every submission with this reason.
    pub reject_reason: Option<String>,
    /// Fail every estimate.
    pub unavailable: bool,
    pub(crate) submissions: Mutex<Vec<OutboundPacket>>,
    pub(crate) estimates: AtomicU64,
}

impl MockTransport {
    /// Transport charging `fee`.
    pub fn with_fee(fee: Fee) -> Self {
        Self {
            fee,
            ..Default::default()
        }
    }

    /// Transport rejecting every submission.
    pub fn rejecting(reason: &str) -> Self {
        Self {
            reject_reason: Some(reason.to_string()),
            ..Default::default()
        }
    }

    /// Accepted submissions, oldest first.
    pub fn submissions(&self) -> Vec<OutboundPacket> {
        self.submissions.lock().clone()
    }

    /// Number of accepted submissions.
    pub fn submit_count(&self) -> usize {
        self.submissions.lock().len()
    }

    /// Number of estimates served.
    pub fn estimate_count(&self) -> u64 {
        self.estimates.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn submit(&self, packet: OutboundPacket) -> Result<DispatchReceipt, MessagingError> {
        if let Some(reason) = &self.reject_reason {
            return Err(MessagingError::TransportRejected(reason.clone()));
        }
        if !packet.funds.covers(&self.fee) {
            return Err(MessagingError::TransportRejected(format!(
                "insufficient fee: required {}, provided {}",
                self.fee, packet.funds
            )));
        }

        let mut submissions = self.submissions.lock();
        submissions.push(packet);
        let nonce = submissions.len() as u64;
        Ok(DispatchReceipt {
            guid: [nonce as u8; 32],
            nonce,
            fee: self.fee,
        })
    }

    async fn estimate_cost(
        &self,
        _destination: ChannelId,
        _envelope: &[u8],
        _options: &Options,
        _pay_in_secondary: bool,
    ) -> Result<Fee, MessagingError> {
        if self.unavailable {
            return Err(MessagingError::TransportUnavailable("Mock failure".to_string()));
        }
        self.estimates.fetch_add(1, Ordering::Relaxed);
        Ok(self.fee)
    }
}

/// Mock state sink recording applied payloads.
#[derive(Default)]
pub struct RecordingStateSink {
    /// Reject every payload with this reason.
    pub reject_reason: Option<String>,
    applied: Mutex<Vec<(Vec<u8>, Origin)>>,
}

impl RecordingStateSink {
    /// Sink rejecting every payload.
    pub fn rejecting(reason: &str) -> Self {
        Self {
            reject_reason: Some(reason.to_string()),
            ..Default::default()
        }
    }

    /// Applied payloads with their origins, oldest first.
    pub fn applied(&self) -> Vec<(Vec<u8>, Origin)> {
        self.applied.lock().clone()
    }

    /// Applied payloads only.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.applied
            .lock()
            .iter()
            .map(|(payload, _)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl ApplicationStateSink for RecordingStateSink {
    async fn apply(&self, payload: &[u8], origin: &Origin) -> Result<(), MessagingError> {
        if let Some(reason) = &self.reject_reason {
            return Err(MessagingError::StateApplyFailed(reason.clone()));
        }
        self.applied.lock().push((payload.to_vec(), *origin));
        Ok(())
    }
}
