//! # Inbound Ports
//!
//! Capabilities the messenger exposes. Callers depend on the narrowest one
//! they need: a sender never sees the receive path, a delivery transport
//! never sees the send path.

use crate::algorithms::combine_options;
use crate::domain::{
    DispatchReceipt, EnforcedOptionParam, MessageRequest, MessagingError, Options, Origin,
    ReceiveOutcome,
};
use async_trait::async_trait;
use shared_types::{AppIdentity, ChannelId, Fee, MessageKind};
use std::sync::Arc;

/// Outbound messaging - inbound port.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Validate, encode and submit a message.
    ///
    /// Excess `funds` over the charged fee are refunded to `refund_to`.
    async fn send(
        &self,
        request: &MessageRequest,
        funds: Fee,
        refund_to: AppIdentity,
    ) -> Result<DispatchReceipt, MessagingError>;

    /// Estimate the fee `send` would charge for the same request.
    async fn quote(
        &self,
        request: &MessageRequest,
        pay_in_secondary: bool,
    ) -> Result<Fee, MessagingError>;
}

/// Delivery handling - inbound port.
#[async_trait]
pub trait MessageReceiver: Send + Sync {
    /// Decode and apply one delivered envelope.
    async fn receive(
        &self,
        origin: Origin,
        envelope: &[u8],
    ) -> Result<ReceiveOutcome, MessagingError>;

    /// Reject a delivery that `receive` would certainly reject, without
    /// applying anything. Decorators call this before holding a delivery back.
    fn admit(&self, _origin: &Origin, _envelope: &[u8]) -> Result<(), MessagingError> {
        Ok(())
    }
}

#[async_trait]
impl<T> MessageReceiver for Arc<T>
where
    T: MessageReceiver + ?Sized,
{
    async fn receive(
        &self,
        origin: Origin,
        envelope: &[u8],
    ) -> Result<ReceiveOutcome, MessagingError> {
        (**self).receive(origin, envelope).await
    }

    fn admit(&self, origin: &Origin, envelope: &[u8]) -> Result<(), MessagingError> {
        (**self).admit(origin, envelope)
    }
}

/// Enforced options lookup - inbound port.
pub trait OptionsPolicy: Send + Sync {
    /// Baseline options for `(channel, kind)`, if any.
    fn enforced_options(&self, channel: ChannelId, kind: MessageKind) -> Option<Options>;

    /// Effective options for a message: baseline merged with caller options.
    fn combine(
        &self,
        channel: ChannelId,
        kind: MessageKind,
        caller: &Options,
    ) -> Result<Options, MessagingError> {
        let enforced = self.enforced_options(channel, kind);
        combine_options(enforced.as_ref(), caller)
    }

    /// Install configured baselines.
    ///
    /// Policies without a writable table accept only an empty list.
    fn load_baselines(&self, params: &[EnforcedOptionParam]) -> Result<(), MessagingError> {
        if params.is_empty() {
            return Ok(());
        }
        Err(MessagingError::InvalidConfig(format!(
            "options policy cannot hold {} configured baselines",
            params.len()
        )))
    }
}
