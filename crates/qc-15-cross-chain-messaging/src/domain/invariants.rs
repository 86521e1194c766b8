//! # Domain Invariants
//!
//! Business rules for round-trip messaging.

use super::errors::MessagingError;
use super::value_objects::Origin;
use shared_types::{AppIdentity, MessageKind};

/// Maximum semantic payload length (the envelope's fixed payload slot).
pub const MAX_PAYLOAD_LEN: usize = 32;

/// Invariant: Payload fits the fixed slot.
pub fn invariant_payload_within_bound(len: usize) -> Result<(), MessagingError> {
    if len > MAX_PAYLOAD_LEN {
        return Err(MessagingError::PayloadTooLarge {
            len,
            max: MAX_PAYLOAD_LEN,
        });
    }
    Ok(())
}

/// Invariant: Kind code belongs to the closed set.
pub fn invariant_known_kind(code: u16) -> Result<MessageKind, MessagingError> {
    MessageKind::from_code(code).ok_or(MessagingError::InvalidMessageKind(code))
}

/// Invariant: Delivery comes from the trusted peer of its source channel.
pub fn invariant_trusted_peer(
    trusted: Option<AppIdentity>,
    origin: &Origin,
) -> Result<(), MessagingError> {
    match trusted {
        Some(peer) if peer == origin.sender => Ok(()),
        _ => Err(MessagingError::UnauthorizedPeer {
            channel: origin.source_channel,
            sender: origin.sender,
        }),
    }
}

/// Invariant: Return legs are always `Plain`, so a conversation is at most
/// two legs long.
pub fn invariant_return_leg_kind(kind: MessageKind) -> bool {
    kind == MessageKind::Plain
}
