//! # Domain Errors
//!
//! Error types for cross-chain round-trip messaging.
//!
//! | Class | Variants | Raised before any transport call |
//! |-------|----------|----------------------------------|
//! | Input validation | `PayloadTooLarge`, `InvalidMessageKind`, `InvalidOptions`, `NoPeer` | yes |
//! | Decode | `MalformedEnvelope`, `UnauthorizedPeer` | n/a (receive side) |
//! | Transport | `TransportRejected`, `TransportUnavailable` | no |
//! | Return leg | `InsufficientReturnFunds` | n/a (never unwinds a receipt) |

use shared_types::{AppIdentity, ChannelId, Fee};
use thiserror::Error;

/// Cross-chain messaging error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessagingError {
    /// Payload exceeds the envelope's fixed payload slot.
    #[error("Payload too large: {len} bytes (max {max})")]
    PayloadTooLarge {
        /// Actual payload length
        len: usize,
        /// Maximum accepted length
        max: usize,
    },

    /// Message kind code outside the closed set.
    #[error("Invalid message kind: {0}")]
    InvalidMessageKind(u16),

    /// Envelope bytes failed structural validation.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Options blob is not a valid type-3 bundle.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// No trusted peer configured for the destination channel.
    #[error("No peer configured for {0}")]
    NoPeer(ChannelId),

    /// Delivery came from a sender other than the configured peer.
    #[error("Unauthorized peer {sender} on {channel}")]
    UnauthorizedPeer {
        /// Source channel of the delivery
        channel: ChannelId,
        /// Claimed sender identity
        sender: AppIdentity,
    },

    /// Funds do not cover the quoted fee (pre-send quote check).
    #[error("Insufficient fee: required {required}, provided {provided}")]
    InsufficientFee {
        /// Quoted fee
        required: Fee,
        /// Funds supplied by the caller
        provided: Fee,
    },

    /// Transport refused the submission.
    #[error("Transport rejected: {0}")]
    TransportRejected(String),

    /// Transport could not produce a cost estimate.
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Application treasury cannot fund the automatic return leg.
    #[error("Insufficient return funds: required {required}, available {available}")]
    InsufficientReturnFunds {
        /// Quoted return-leg fee
        required: Fee,
        /// Treasury balance
        available: Fee,
    },

    /// Receiving application rejected the payload.
    #[error("State apply failed: {0}")]
    StateApplyFailed(String),

    /// Ordered delivery saw a nonce that was already applied.
    #[error("Duplicate delivery: nonce {received} already applied (next expected {expected})")]
    DuplicateDelivery {
        /// Next nonce the pathway expects
        expected: u64,
        /// Nonce carried by the delivery
        received: u64,
    },

    /// Ordered delivery saw a nonce too far ahead of the pathway to hold.
    #[error("Reorder window exceeded: nonce {received} is more than {window} ahead of {expected}")]
    ReorderWindowExceeded {
        /// Next nonce the pathway expects
        expected: u64,
        /// Nonce carried by the delivery
        received: u64,
        /// Deliveries the pathway may hold ahead of `expected`
        window: u64,
    },

    /// Configuration rejected by validation.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl MessagingError {
    /// Local input validation failures, raised before any external call.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::PayloadTooLarge { .. }
                | Self::InvalidMessageKind(_)
                | Self::InvalidOptions(_)
                | Self::NoPeer(_)
        )
    }
}
