//! # Domain Entities
//!
//! Requests, envelopes and outcomes that flow through the messenger.

use super::errors::MessagingError;
use super::options::Options;
use super::value_objects::{DispatchReceipt, Origin};
use serde::{Deserialize, Serialize};
use shared_types::{AppIdentity, ChannelId, Fee, MessageKind};

/// Structured view of a decoded envelope.
///
/// The embedded return options are not copied; `options_offset` and
/// `options_len` locate them inside the original buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedEnvelope {
    /// Semantic payload (padding stripped).
    pub payload: Vec<u8>,
    /// Envelope kind.
    pub kind: MessageKind,
    /// Start of the embedded return options.
    pub options_offset: usize,
    /// Length of the embedded return options.
    pub options_len: usize,
}

/// Caller-facing description of a message to send or quote.
///
/// `msg_type` is the raw wire code so that out-of-range kinds reach
/// validation instead of being unrepresentable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRequest {
    /// Target channel.
    pub destination: ChannelId,
    /// Raw message kind code.
    pub msg_type: u16,
    /// Semantic payload.
    pub payload: Vec<u8>,
    /// Caller options for this leg.
    pub send_options: Options,
    /// Caller options for the return leg (`RoundTrip` only).
    pub return_options: Options,
}

impl MessageRequest {
    /// `Plain` message to `destination`.
    pub fn plain(destination: ChannelId, payload: impl Into<Vec<u8>>) -> Self {
        Self::with_kind(destination, MessageKind::Plain, payload)
    }

    /// `RoundTrip` message to `destination`.
    pub fn round_trip(destination: ChannelId, payload: impl Into<Vec<u8>>) -> Self {
        Self::with_kind(destination, MessageKind::RoundTrip, payload)
    }

    /// Message of an explicit kind.
    pub fn with_kind(
        destination: ChannelId,
        kind: MessageKind,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            destination,
            msg_type: kind.code(),
            payload: payload.into(),
            send_options: Options::empty(),
            return_options: Options::empty(),
        }
    }

    /// Set the options for this leg.
    pub fn send_options(mut self, options: Options) -> Self {
        self.send_options = options;
        self
    }

    /// Set the options the destination will use for the return leg.
    pub fn return_options(mut self, options: Options) -> Self {
        self.return_options = options;
        self
    }
}

/// A validated, fully built message ready for quoting or submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedMessage {
    /// Target channel.
    pub destination: ChannelId,
    /// Envelope kind.
    pub kind: MessageKind,
    /// Semantic payload.
    pub payload: Vec<u8>,
    /// Encoded envelope.
    pub envelope: Vec<u8>,
    /// Effective (combined) options.
    pub options: Options,
}

/// Submission handed to a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundPacket {
    /// Target channel.
    pub destination: ChannelId,
    /// Encoded envelope.
    pub envelope: Vec<u8>,
    /// Effective options.
    pub options: Options,
    /// Funds attached to the submission.
    pub funds: Fee,
    /// Who receives any excess over the charged fee.
    pub refund_target: AppIdentity,
}

/// What happened to the automatic reply of a delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReturnLeg {
    /// The delivery was `Plain`; no reply owed.
    NotRequested,
    /// The responder declined to answer.
    Skipped,
    /// Reply accepted by the transport.
    Dispatched(DispatchReceipt),
    /// Reply could not be sent. The forward receipt still stands.
    Failed(MessagingError),
}

impl ReturnLeg {
    /// Whether a reply was accepted by the transport.
    pub fn is_dispatched(&self) -> bool {
        matches!(self, Self::Dispatched(_))
    }
}

/// A delivery that was decoded and applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedMessage {
    /// Where it came from.
    pub origin: Origin,
    /// Decoded payload.
    pub payload: Vec<u8>,
    /// Envelope kind.
    pub kind: MessageKind,
    /// Fate of the automatic reply.
    pub return_leg: ReturnLeg,
}

/// Result of handing one delivery to a receiver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Applied now, followed by any earlier deliveries this one unblocked.
    Applied(Vec<AppliedMessage>),
    /// Held back until the pathway's earlier nonces arrive.
    Buffered {
        /// Where it came from.
        origin: Origin,
        /// Nonce the pathway is waiting for.
        expected_nonce: u64,
    },
}

impl ReceiveOutcome {
    /// Outcome of a single applied delivery.
    pub fn single(message: AppliedMessage) -> Self {
        Self::Applied(vec![message])
    }

    /// Messages applied by this delivery, in order.
    pub fn applied(&self) -> &[AppliedMessage] {
        match self {
            Self::Applied(messages) => messages,
            Self::Buffered { .. } => &[],
        }
    }

    /// Consume into the applied messages.
    pub fn into_applied(self) -> Vec<AppliedMessage> {
        match self {
            Self::Applied(messages) => messages,
            Self::Buffered { .. } => Vec::new(),
        }
    }

    /// Whether the delivery was held back.
    pub fn is_buffered(&self) -> bool {
        matches!(self, Self::Buffered { .. })
    }
}
