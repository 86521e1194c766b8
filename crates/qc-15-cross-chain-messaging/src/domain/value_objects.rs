//! # Domain Value Objects
//!
//! Immutable value types for round-trip messaging.

use serde::{Deserialize, Serialize};
use shared_types::{AppIdentity, ChannelId, Fee, Guid};

/// Where a delivered envelope came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Origin {
    /// Channel the envelope arrived from.
    pub source_channel: ChannelId,
    /// Sending application instance.
    pub sender: AppIdentity,
    /// Per-pathway sequence number assigned by the transport.
    pub nonce: u64,
}

impl Origin {
    /// Create a new origin.
    pub fn new(source_channel: ChannelId, sender: AppIdentity, nonce: u64) -> Self {
        Self {
            source_channel,
            sender,
            nonce,
        }
    }
}

/// Transport acknowledgment for an accepted submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    /// Globally unique message identifier.
    pub guid: Guid,
    /// Pathway nonce assigned to the message.
    pub nonce: u64,
    /// Fee actually charged.
    pub fee: Fee,
}

impl DispatchReceipt {
    /// Short hex form of the guid for log lines.
    pub fn short_guid(&self) -> String {
        hex::encode(&self.guid[..8])
    }
}

/// Execution resources requested by an options bundle.
///
/// Summed across every executor entry the bundle carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutionBudget {
    /// Gas for the destination receive handler.
    pub gas: u128,
    /// Native value forwarded with the receive call.
    pub value: u128,
    /// Native value airdropped to third parties.
    pub native_drop: u128,
    /// Whether ordered execution was requested.
    pub ordered: bool,
}

impl ExecutionBudget {
    /// Total native value the executor must front.
    pub fn total_value(&self) -> u128 {
        self.value.saturating_add(self.native_drop)
    }
}

/// Trusted remote application for one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Remote channel.
    pub channel: ChannelId,
    /// Identity of the application instance on that channel.
    pub identity: AppIdentity,
}
