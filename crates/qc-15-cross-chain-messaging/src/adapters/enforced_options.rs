//! Enforced Options Adapter
//!
//! Implements `OptionsPolicy` over an owner-managed table of baselines.

use crate::algorithms::validate_type3;
use crate::domain::{EnforcedOptionParam, MessagingError, Options};
use crate::ports::OptionsPolicy;
use parking_lot::RwLock;
use shared_types::{ChannelId, MessageKind};
use std::collections::HashMap;
use tracing::{debug, info};

/// Baseline options per `(channel, kind)`.
pub struct EnforcedOptionsStore {
    options: RwLock<HashMap<(ChannelId, MessageKind), Options>>,
}

impl EnforcedOptionsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            options: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store preloaded with `params`.
    pub fn from_params(params: &[EnforcedOptionParam]) -> Result<Self, MessagingError> {
        let store = Self::new();
        store.set_enforced_options(params)?;
        Ok(store)
    }

    /// Install a batch of baselines. Nothing is written unless all are valid.
    ///
    /// Empty options clear the baseline for that pair.
    pub fn set_enforced_options(
        &self,
        params: &[EnforcedOptionParam],
    ) -> Result<(), MessagingError> {
        for param in params {
            if !param.options.is_empty() {
                validate_type3(&param.options)?;
            }
        }

        let mut options = self.options.write();
        for param in params {
            if param.options.is_empty() {
                options.remove(&(param.channel, param.kind));
            } else {
                options.insert((param.channel, param.kind), param.options.clone());
            }
        }

        info!("[qc-15] Installed {} enforced option baselines", params.len());
        Ok(())
    }

    /// Install one baseline.
    pub fn set(
        &self,
        channel: ChannelId,
        kind: MessageKind,
        options: Options,
    ) -> Result<(), MessagingError> {
        self.set_enforced_options(&[EnforcedOptionParam {
            channel,
            kind,
            options,
        }])
    }

    /// Remove the baseline for a pair.
    pub fn remove(&self, channel: ChannelId, kind: MessageKind) -> Option<Options> {
        self.options.write().remove(&(channel, kind))
    }

    /// Number of configured baselines.
    pub fn len(&self) -> usize {
        self.options.read().len()
    }

    /// Whether no baselines are configured.
    pub fn is_empty(&self) -> bool {
        self.options.read().is_empty()
    }
}

impl Default for EnforcedOptionsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionsPolicy for EnforcedOptionsStore {
    fn enforced_options(&self, channel: ChannelId, kind: MessageKind) -> Option<Options> {
        let options = self.options.read().get(&(channel, kind)).cloned();
        debug!(
            "[qc-15] Baseline lookup {} {}: {}",
            channel,
            kind,
            if options.is_some() { "hit" } else { "none" }
        );
        options
    }

    fn load_baselines(&self, params: &[EnforcedOptionParam]) -> Result<(), MessagingError> {
        self.set_enforced_options(params)
    }
}
