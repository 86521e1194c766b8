//! Messenger configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use qc_15_cross_chain_messaging::domain::MessagingConfig;
//!
//! let config = MessagingConfig::from_json(r#"{
//!     "local_channel": 1,
//!     "identity": "0x00000000000000000000000000000000000000000000000000000000000000aa",
//!     "peers": [{ "channel": 2, "identity": "0x...bb" }]
//! }"#)?;
//! ```

use super::errors::MessagingError;
use super::invariants::MAX_PAYLOAD_LEN;
use super::options::Options;
use super::value_objects::PeerConfig;
use serde::{Deserialize, Serialize};
use shared_types::{AppIdentity, ChannelId, MessageKind};
use std::collections::HashSet;

/// Default payload of the automatic return leg.
pub const DEFAULT_ACKNOWLEDGMENT: &[u8] = b"pong";

/// Baseline options for one `(channel, kind)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcedOptionParam {
    /// Destination channel.
    pub channel: ChannelId,
    /// Message kind the baseline applies to.
    pub kind: MessageKind,
    /// Baseline options (type 3).
    pub options: Options,
}

/// Round-trip messenger configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Channel this application instance lives on.
    pub local_channel: ChannelId,
    /// This application instance's identity (return-leg refund target).
    pub identity: AppIdentity,
    /// Trusted remote application per channel.
    pub peers: Vec<PeerConfig>,
    /// Baseline options loaded into the options store.
    pub enforced_options: Vec<EnforcedOptionParam>,
    /// Payload of the automatic reply.
    pub acknowledgment: Vec<u8>,
    /// Quote before submitting and reject underfunded sends locally.
    pub prequote_fees: bool,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            local_channel: ChannelId(0),
            identity: AppIdentity::ZERO,
            peers: Vec::new(),
            enforced_options: Vec::new(),
            acknowledgment: DEFAULT_ACKNOWLEDGMENT.to_vec(),
            prequote_fees: false,
        }
    }
}

impl MessagingConfig {
    /// Create a validated configuration for `identity` on `local_channel`.
    pub fn new(local_channel: ChannelId, identity: AppIdentity) -> Result<Self, MessagingError> {
        let config = Self {
            local_channel,
            identity,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, MessagingError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| MessagingError::InvalidConfig(format!("parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), MessagingError> {
        if self.acknowledgment.len() > MAX_PAYLOAD_LEN {
            return Err(MessagingError::InvalidConfig(format!(
                "acknowledgment is {} bytes (max {MAX_PAYLOAD_LEN})",
                self.acknowledgment.len()
            )));
        }

        let mut seen = HashSet::new();
        for peer in &self.peers {
            if !seen.insert(peer.channel) {
                return Err(MessagingError::InvalidConfig(format!(
                    "duplicate peer for {}",
                    peer.channel
                )));
            }
            if peer.identity == AppIdentity::ZERO {
                return Err(MessagingError::InvalidConfig(format!(
                    "zero peer identity for {}",
                    peer.channel
                )));
            }
        }

        for param in &self.enforced_options {
            if !param.options.is_type3() {
                return Err(MessagingError::InvalidConfig(format!(
                    "enforced options for {} {} are not type 3",
                    param.channel, param.kind
                )));
            }
            param.options.worker_options().map_err(|e| {
                MessagingError::InvalidConfig(format!(
                    "enforced options for {} {}: {e}",
                    param.channel, param.kind
                ))
            })?;
        }

        Ok(())
    }

    /// Trusted peer for `channel`, if configured.
    pub fn peer_for(&self, channel: ChannelId) -> Option<AppIdentity> {
        self.peers
            .iter()
            .find(|peer| peer.channel == channel)
            .map(|peer| peer.identity)
    }

    /// Builder-style method to add or replace a peer
    pub fn with_peer(mut self, channel: ChannelId, identity: AppIdentity) -> Self {
        self.peers.retain(|peer| peer.channel != channel);
        self.peers.push(PeerConfig { channel, identity });
        self
    }

    /// Builder-style method to add a baseline
    pub fn with_enforced_options(
        mut self,
        channel: ChannelId,
        kind: MessageKind,
        options: Options,
    ) -> Self {
        self.enforced_options.push(EnforcedOptionParam {
            channel,
            kind,
            options,
        });
        self
    }

    /// Builder-style method to set the acknowledgment payload
    pub fn with_acknowledgment(mut self, acknowledgment: impl Into<Vec<u8>>) -> Self {
        self.acknowledgment = acknowledgment.into();
        self
    }

    /// Builder-style method to toggle pre-send quoting
    pub fn with_prequote_fees(mut self, enabled: bool) -> Self {
        self.prequote_fees = enabled;
        self
    }
}
