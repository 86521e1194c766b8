//! # Message Dispatcher
//!
//! Validates, encodes and submits outbound messages.
//!
//! ## Validation Order
//!
//! 1. payload length
//! 2. message kind
//! 3. trusted peer for the destination
//! 4. options combination
//!
//! Every step runs before the transport is touched.

use super::quoter::FeeQuoter;
use super::MessagingContext;
use crate::algorithms::{encode_envelope, encode_return_message};
use crate::domain::{
    invariant_known_kind, invariant_payload_within_bound, invariant_return_leg_kind,
    DispatchReceipt, MessageRequest, MessagingError, Options, OutboundPacket, PreparedMessage,
};
use shared_bus::{Leg, MessagingEvent};
use shared_types::{AppIdentity, ChannelId, Fee, MessageKind};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Build a forward message exactly as `send` and `quote` both see it.
pub(crate) fn prepare_forward(
    ctx: &MessagingContext,
    request: &MessageRequest,
) -> Result<PreparedMessage, MessagingError> {
    invariant_payload_within_bound(request.payload.len())?;
    let kind = invariant_known_kind(request.msg_type)?;

    if ctx.config.peer_for(request.destination).is_none() {
        return Err(MessagingError::NoPeer(request.destination));
    }

    let envelope = encode_envelope(&request.payload, kind, request.return_options.as_bytes())?;
    let options = ctx
        .policy
        .combine(request.destination, kind, &request.send_options)?;

    Ok(PreparedMessage {
        destination: request.destination,
        kind,
        payload: request.payload.clone(),
        envelope,
        options,
    })
}

/// Build the automatic `Plain` reply to `destination`.
///
/// `return_options` are the options the original sender embedded; they are
/// combined with the local baseline for `(destination, Plain)`.
pub(crate) fn prepare_return(
    ctx: &MessagingContext,
    destination: ChannelId,
    payload: Vec<u8>,
    return_options: &[u8],
) -> Result<PreparedMessage, MessagingError> {
    let envelope = encode_return_message(&payload)?;
    let options = ctx.policy.combine(
        destination,
        MessageKind::Plain,
        &Options::from_bytes(return_options),
    )?;

    Ok(PreparedMessage {
        destination,
        kind: MessageKind::Plain,
        payload,
        envelope,
        options,
    })
}

/// Outbound half of the messenger.
#[derive(Clone)]
pub struct MessageDispatcher {
    ctx: Arc<MessagingContext>,
    quoter: FeeQuoter,
}

impl MessageDispatcher {
    /// Create a dispatcher over a shared context.
    pub fn new(ctx: Arc<MessagingContext>) -> Self {
        let quoter = FeeQuoter::new(ctx.clone());
        Self { ctx, quoter }
    }

    /// Validate, encode and submit a forward message.
    pub async fn send(
        &self,
        request: &MessageRequest,
        funds: Fee,
        refund_to: AppIdentity,
    ) -> Result<DispatchReceipt, MessagingError> {
        let prepared = prepare_forward(&self.ctx, request).map_err(|e| {
            debug!(destination = %request.destination, error = %e, "[qc-15] Send rejected");
            e
        })?;

        if self.ctx.config.prequote_fees {
            let required = self
                .quoter
                .quote_prepared(&prepared, funds.secondary > 0)
                .await?;
            if !funds.covers(&required) {
                return Err(MessagingError::InsufficientFee {
                    required,
                    provided: funds,
                });
            }
        }

        self.dispatch(prepared, funds, refund_to, Leg::Forward)
            .await
    }

    /// Submit a prepared message and announce it.
    pub(crate) async fn dispatch(
        &self,
        prepared: PreparedMessage,
        funds: Fee,
        refund_target: AppIdentity,
        leg: Leg,
    ) -> Result<DispatchReceipt, MessagingError> {
        let PreparedMessage {
            destination,
            kind,
            payload,
            envelope,
            options,
        } = prepared;

        if leg == Leg::Return && !invariant_return_leg_kind(kind) {
            warn!(destination = %destination, "[qc-15] Refused {} return leg", kind);
            return Err(MessagingError::InvalidMessageKind(kind.code()));
        }

        let packet = OutboundPacket {
            destination,
            envelope,
            options,
            funds,
            refund_target,
        };

        let receipt = match self.ctx.transport.submit(packet).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(
                    destination = %destination,
                    leg = ?leg,
                    error = %e,
                    "[qc-15] Transport refused submission"
                );
                return Err(e);
            }
        };

        info!(
            "[qc-15] Dispatched {} {:?} leg to {} (nonce {}, guid {}..)",
            kind,
            leg,
            destination,
            receipt.nonce,
            receipt.short_guid()
        );

        self.ctx
            .publisher
            .publish(MessagingEvent::MessageSent {
                destination,
                payload,
                kind,
                leg,
                guid: receipt.guid,
                nonce: receipt.nonce,
                fee: receipt.fee,
            })
            .await;

        Ok(receipt)
    }
}
