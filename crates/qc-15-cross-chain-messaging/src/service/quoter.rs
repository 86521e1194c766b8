//! # Fee Quoter
//!
//! Fee estimation over the exact bytes `send` would submit.

use super::dispatcher::prepare_forward;
use super::MessagingContext;
use crate::domain::{MessageRequest, MessagingError, PreparedMessage};
use shared_types::Fee;
use std::sync::Arc;
use tracing::debug;

/// Read-only fee estimation.
#[derive(Clone)]
pub struct FeeQuoter {
    ctx: Arc<MessagingContext>,
}

impl FeeQuoter {
    /// Create a quoter over a shared context.
    pub fn new(ctx: Arc<MessagingContext>) -> Self {
        Self { ctx }
    }

    /// Estimate the fee for a forward message.
    ///
    /// Fails with the same validation errors `send` would.
    pub async fn quote(
        &self,
        request: &MessageRequest,
        pay_in_secondary: bool,
    ) -> Result<Fee, MessagingError> {
        let prepared = prepare_forward(&self.ctx, request)?;
        self.quote_prepared(&prepared, pay_in_secondary).await
    }

    /// Estimate the fee for an already prepared message.
    pub(crate) async fn quote_prepared(
        &self,
        prepared: &PreparedMessage,
        pay_in_secondary: bool,
    ) -> Result<Fee, MessagingError> {
        let fee = self
            .ctx
            .transport
            .estimate_cost(
                prepared.destination,
                &prepared.envelope,
                &prepared.options,
                pay_in_secondary,
            )
            .await?;

        debug!(
            destination = %prepared.destination,
            kind = %prepared.kind,
            envelope_len = prepared.envelope.len(),
            fee = %fee,
            "[qc-15] Quoted"
        );
        Ok(fee)
    }
}
