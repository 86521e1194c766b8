//! # Message Router
//!
//! Inbound half of the messenger.
//!
//! ## Receive Flow
//!
//! ```text
//! peer check ─→ decode ─→ apply ─→ (RoundTrip) respond ─→ quote ─→ withdraw ─→ submit
//!                                                                     │
//!                       MessageReceived ←─────────────────────────────┘
//! ```
//!
//! Errors before and including `apply` abort the receive. Anything that goes
//! wrong on the return leg is reported in the outcome and as a
//! `ReturnDispatchFailed` event; the delivery itself still succeeds.

use super::dispatcher::{prepare_return, MessageDispatcher};
use super::quoter::FeeQuoter;
use super::MessagingContext;
use crate::algorithms::{decode_envelope, return_options};
use crate::domain::{
    invariant_trusted_peer, AppliedMessage, DecodedEnvelope, DispatchReceipt, MessagingError,
    Origin, ReturnLeg,
};
use crate::ports::{ApplicationStateSink, Responder, ReturnLegFunding};
use shared_bus::{Leg, MessagingEvent};
use shared_types::MessageKind;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Decodes deliveries, applies them and answers `RoundTrip` messages.
pub struct MessageRouter {
    ctx: Arc<MessagingContext>,
    dispatcher: MessageDispatcher,
    quoter: FeeQuoter,
    sink: Arc<dyn ApplicationStateSink>,
    funding: Arc<dyn ReturnLegFunding>,
    responder: Arc<dyn Responder>,
}

impl MessageRouter {
    /// Create a router over a shared context.
    pub fn new(
        ctx: Arc<MessagingContext>,
        sink: Arc<dyn ApplicationStateSink>,
        funding: Arc<dyn ReturnLegFunding>,
        responder: Arc<dyn Responder>,
    ) -> Self {
        Self {
            dispatcher: MessageDispatcher::new(ctx.clone()),
            quoter: FeeQuoter::new(ctx.clone()),
            ctx,
            sink,
            funding,
            responder,
        }
    }

    /// Trust and decode checks, with no side effects.
    pub fn admit(
        &self,
        origin: &Origin,
        envelope: &[u8],
    ) -> Result<DecodedEnvelope, MessagingError> {
        invariant_trusted_peer(self.ctx.config.peer_for(origin.source_channel), origin)
            .map_err(|e| {
                warn!(
                    source = %origin.source_channel,
                    sender = %origin.sender,
                    "[qc-15] Delivery from untrusted sender"
                );
                e
            })?;

        decode_envelope(envelope).map_err(|e| {
            warn!(source = %origin.source_channel, error = %e, "[qc-15] Undecodable delivery");
            e
        })
    }

    /// Handle one delivered envelope.
    pub async fn receive(
        &self,
        origin: Origin,
        envelope: &[u8],
    ) -> Result<AppliedMessage, MessagingError> {
        let decoded = self.admit(&origin, envelope)?;

        self.sink.apply(&decoded.payload, &origin).await?;

        info!(
            "[qc-15] Received {} from {} (nonce {}, {} byte payload)",
            decoded.kind,
            origin.source_channel,
            origin.nonce,
            decoded.payload.len()
        );

        let return_leg = match decoded.kind {
            MessageKind::Plain => ReturnLeg::NotRequested,
            MessageKind::RoundTrip => self.answer(&origin, &decoded, envelope).await,
        };

        self.ctx
            .publisher
            .publish(MessagingEvent::MessageReceived {
                payload: decoded.payload.clone(),
                source: origin.source_channel,
                sender: origin.sender,
                nonce: origin.nonce,
            })
            .await;

        Ok(AppliedMessage {
            origin,
            payload: decoded.payload,
            kind: decoded.kind,
            return_leg,
        })
    }

    async fn answer(
        &self,
        origin: &Origin,
        decoded: &DecodedEnvelope,
        envelope: &[u8],
    ) -> ReturnLeg {
        let Some(reply) = self.responder.respond(origin, &decoded.payload) else {
            debug!(source = %origin.source_channel, "[qc-15] Responder declined return leg");
            return ReturnLeg::Skipped;
        };

        match self.dispatch_return(origin, decoded, envelope, reply).await {
            Ok(receipt) => ReturnLeg::Dispatched(receipt),
            Err(e) => {
                warn!(
                    source = %origin.source_channel,
                    error = %e,
                    "[qc-15] Return leg failed"
                );
                self.ctx
                    .publisher
                    .publish(MessagingEvent::ReturnDispatchFailed {
                        source: origin.source_channel,
                        reason: e.to_string(),
                    })
                    .await;
                ReturnLeg::Failed(e)
            }
        }
    }

    async fn dispatch_return(
        &self,
        origin: &Origin,
        decoded: &DecodedEnvelope,
        envelope: &[u8],
        reply: Vec<u8>,
    ) -> Result<DispatchReceipt, MessagingError> {
        let embedded = return_options(envelope, decoded)?;
        let prepared = prepare_return(&self.ctx, origin.source_channel, reply, embedded)?;

        let fee = self.quoter.quote_prepared(&prepared, false).await?;
        let funds = self.funding.withdraw(fee)?;

        let result = self
            .dispatcher
            .dispatch(prepared, funds, self.ctx.config.identity, Leg::Return)
            .await;
        if result.is_err() {
            self.funding.deposit(funds);
        }
        result
    }
}
