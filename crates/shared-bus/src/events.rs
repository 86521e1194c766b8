//! # Messaging Events
//!
//! Defines all observable signals emitted by the messaging core.
//! Monitoring collaborators subscribe to these through the shared bus.

use serde::{Deserialize, Serialize};
use shared_types::entities::{AppIdentity, ChannelId, Fee, Guid, MessageKind};

/// Which leg of a conversation an outbound message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Leg {
    /// User-initiated leg, paid and refunded to the caller.
    Forward,
    /// Automatic reply, paid and refunded to the application itself.
    Return,
}

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessagingEvent {
    // =========================================================================
    // OUTBOUND
    // =========================================================================
    /// An envelope was accepted by the transport.
    MessageSent {
        /// Channel the envelope was submitted to.
        destination: ChannelId,
        /// Semantic payload carried by the envelope.
        payload: Vec<u8>,
        /// Kind of the envelope.
        kind: MessageKind,
        /// Forward or return leg.
        leg: Leg,
        /// Transport-assigned identifier.
        guid: Guid,
        /// Transport-assigned pathway nonce.
        nonce: u64,
        /// Fee charged by the transport.
        fee: Fee,
    },

    // =========================================================================
    // INBOUND
    // =========================================================================
    /// A delivered envelope was decoded and applied.
    ///
    /// Emitted for every successful receive, after any return dispatch
    /// completes or is skipped.
    MessageReceived {
        /// Decoded payload.
        payload: Vec<u8>,
        /// Channel the envelope arrived from.
        source: ChannelId,
        /// Sending application instance.
        sender: AppIdentity,
        /// Pathway nonce assigned by the transport.
        nonce: u64,
    },

    // =========================================================================
    // FAILURES
    // =========================================================================
    /// The automatic return leg could not be dispatched.
    ///
    /// The forward receipt is unaffected.
    ReturnDispatchFailed {
        /// Channel the return leg was addressed to.
        source: ChannelId,
        /// Failure description.
        reason: String,
    },
}

impl MessagingEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::MessageSent { .. } => EventTopic::Outbound,
            Self::MessageReceived { .. } => EventTopic::Inbound,
            Self::ReturnDispatchFailed { .. } => EventTopic::Failures,
        }
    }

    /// Get the remote channel this event concerns.
    #[must_use]
    pub fn channel(&self) -> ChannelId {
        match self {
            Self::MessageSent { destination, .. } => *destination,
            Self::MessageReceived { source, .. } | Self::ReturnDispatchFailed { source, .. } => {
                *source
            }
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Envelopes accepted by the transport.
    Outbound,
    /// Envelopes received and applied.
    Inbound,
    /// Return-leg failures.
    Failures,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Remote channels to include. Empty means all channels.
    pub channels: Vec<ChannelId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            channels: Vec::new(),
        }
    }

    /// Create a filter for events concerning specific channels.
    #[must_use]
    pub fn from_channels(channels: Vec<ChannelId>) -> Self {
        Self {
            topics: Vec::new(),
            channels,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &MessagingEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let channel_match = self.channels.is_empty() || self.channels.contains(&event.channel());

        topic_match && channel_match
    }
}
