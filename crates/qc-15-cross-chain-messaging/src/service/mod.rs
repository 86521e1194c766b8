//! # Messenger Service
//!
//! Composes the dispatcher, quoter and router over one shared context and
//! exposes them through the inbound ports.
//!
//! ## Wiring
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!  send/quote ──→ │ MessageDispatcher  FeeQuoter │ ──→ Transport
//!                 │                              │
//!  receive ─────→ │ MessageRouter                │ ──→ ApplicationStateSink
//!                 │   └─ return leg ─────────────│ ──→ ReturnLegFunding
//!                 └──────────────────────────────┘
//!                        │ MessagingEvent
//!                        ▼
//!                  EventPublisher
//! ```

mod dispatcher;
mod quoter;
mod router;

pub use dispatcher::MessageDispatcher;
pub use quoter::FeeQuoter;
pub use router::MessageRouter;

use crate::adapters::{EnforcedOptionsStore, InMemoryTreasury};
use crate::domain::{
    DispatchReceipt, EnforcedOptionParam, MessageRequest, MessagingConfig, MessagingError,
    Options, Origin, ReceiveOutcome,
};
use crate::ports::{
    ApplicationStateSink, FixedAcknowledgment, MessageReceiver, MessageSender, OptionsPolicy,
    Responder, ReturnLegFunding, Transport,
};
use async_trait::async_trait;
use shared_bus::{EventPublisher, InMemoryEventBus};
use shared_types::{AppIdentity, ChannelId, Fee, MessageKind};
use std::sync::Arc;
use tracing::info;

/// Collaborators shared by every part of one messenger.
pub struct MessagingContext {
    /// Validated configuration.
    pub config: MessagingConfig,
    /// Outbound transport.
    pub transport: Arc<dyn Transport>,
    /// Enforced options lookup.
    pub policy: Arc<dyn OptionsPolicy>,
    /// Signal sink.
    pub publisher: Arc<dyn EventPublisher>,
}

/// One application instance's round-trip messenger.
pub struct RoundTripMessenger {
    ctx: Arc<MessagingContext>,
    dispatcher: MessageDispatcher,
    quoter: FeeQuoter,
    router: MessageRouter,
}

impl RoundTripMessenger {
    /// Start building a messenger for `config`.
    pub fn builder(config: MessagingConfig) -> RoundTripMessengerBuilder {
        RoundTripMessengerBuilder::new(config)
    }

    /// Active configuration.
    pub fn config(&self) -> &MessagingConfig {
        &self.ctx.config
    }

    /// This instance's identity.
    pub fn identity(&self) -> AppIdentity {
        self.ctx.config.identity
    }

    /// Channel this instance lives on.
    pub fn local_channel(&self) -> ChannelId {
        self.ctx.config.local_channel
    }

    /// Outbound half.
    pub fn dispatcher(&self) -> &MessageDispatcher {
        &self.dispatcher
    }

    /// Fee estimation.
    pub fn quoter(&self) -> &FeeQuoter {
        &self.quoter
    }

    /// Inbound half.
    pub fn router(&self) -> &MessageRouter {
        &self.router
    }
}

#[async_trait]
impl MessageSender for RoundTripMessenger {
    async fn send(
        &self,
        request: &MessageRequest,
        funds: Fee,
        refund_to: AppIdentity,
    ) -> Result<DispatchReceipt, MessagingError> {
        self.dispatcher.send(request, funds, refund_to).await
    }

    async fn quote(
        &self,
        request: &MessageRequest,
        pay_in_secondary: bool,
    ) -> Result<Fee, MessagingError> {
        self.quoter.quote(request, pay_in_secondary).await
    }
}

#[async_trait]
impl MessageReceiver for RoundTripMessenger {
    async fn receive(
        &self,
        origin: Origin,
        envelope: &[u8],
    ) -> Result<ReceiveOutcome, MessagingError> {
        self.router
            .receive(origin, envelope)
            .await
            .map(ReceiveOutcome::single)
    }

    fn admit(&self, origin: &Origin, envelope: &[u8]) -> Result<(), MessagingError> {
        self.router.admit(origin, envelope).map(|_| ())
    }
}

impl OptionsPolicy for RoundTripMessenger {
    fn enforced_options(&self, channel: ChannelId, kind: MessageKind) -> Option<Options> {
        self.ctx.policy.enforced_options(channel, kind)
    }

    fn load_baselines(&self, params: &[EnforcedOptionParam]) -> Result<(), MessagingError> {
        self.ctx.policy.load_baselines(params)
    }
}

/// Builder for [`RoundTripMessenger`].
///
/// Transport and state sink are required. Configured baselines are loaded
/// into whichever options policy ends up in use. Defaults:
/// - options policy: an [`EnforcedOptionsStore`] loaded from the config
/// - publisher: a fresh [`InMemoryEventBus`]
/// - funding: an empty [`InMemoryTreasury`]
/// - responder: [`FixedAcknowledgment`] with the configured payload
pub struct RoundTripMessengerBuilder {
    config: MessagingConfig,
    transport: Option<Arc<dyn Transport>>,
    policy: Option<Arc<dyn OptionsPolicy>>,
    publisher: Option<Arc<dyn EventPublisher>>,
    sink: Option<Arc<dyn ApplicationStateSink>>,
    funding: Option<Arc<dyn ReturnLegFunding>>,
    responder: Option<Arc<dyn Responder>>,
}

impl RoundTripMessengerBuilder {
    /// Create a builder with no collaborators set.
    pub fn new(config: MessagingConfig) -> Self {
        Self {
            config,
            transport: None,
            policy: None,
            publisher: None,
            sink: None,
            funding: None,
            responder: None,
        }
    }

    /// Set the transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the enforced options policy.
    pub fn options_policy(mut self, policy: Arc<dyn OptionsPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Set the event publisher.
    pub fn publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Set the application state sink.
    pub fn state_sink(mut self, sink: Arc<dyn ApplicationStateSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Set the return-leg treasury.
    pub fn funding(mut self, funding: Arc<dyn ReturnLegFunding>) -> Self {
        self.funding = Some(funding);
        self
    }

    /// Set the reply policy.
    pub fn responder(mut self, responder: Arc<dyn Responder>) -> Self {
        self.responder = Some(responder);
        self
    }

    /// Validate the configuration and assemble the messenger.
    pub fn build(self) -> Result<RoundTripMessenger, MessagingError> {
        self.config.validate()?;

        let transport = self
            .transport
            .ok_or_else(|| MessagingError::InvalidConfig("transport not set".into()))?;
        let sink = self
            .sink
            .ok_or_else(|| MessagingError::InvalidConfig("state sink not set".into()))?;

        let policy: Arc<dyn OptionsPolicy> = match self.policy {
            Some(policy) => {
                policy.load_baselines(&self.config.enforced_options)?;
                policy
            }
            None => Arc::new(EnforcedOptionsStore::from_params(
                &self.config.enforced_options,
            )?),
        };
        let publisher = self
            .publisher
            .unwrap_or_else(|| Arc::new(InMemoryEventBus::new()));
        let funding = self
            .funding
            .unwrap_or_else(|| Arc::new(InMemoryTreasury::default()));
        let responder = self.responder.unwrap_or_else(|| {
            Arc::new(FixedAcknowledgment::new(self.config.acknowledgment.clone()))
        });

        info!(
            "[qc-15] Messenger ready on {} ({} peers, {} baselines)",
            self.config.local_channel,
            self.config.peers.len(),
            self.config.enforced_options.len()
        );

        let ctx = Arc::new(MessagingContext {
            config: self.config,
            transport,
            policy,
            publisher,
        });

        Ok(RoundTripMessenger {
            dispatcher: MessageDispatcher::new(ctx.clone()),
            quoter: FeeQuoter::new(ctx.clone()),
            router: MessageRouter::new(ctx.clone(), sink, funding, responder),
            ctx,
        })
    }
}
