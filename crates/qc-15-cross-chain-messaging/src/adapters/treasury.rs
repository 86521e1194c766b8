//! Treasury Adapter
//!
//! Implements `ReturnLegFunding` with an in-memory balance.

use crate::domain::MessagingError;
use crate::ports::ReturnLegFunding;
use parking_lot::Mutex;
use shared_types::Fee;
use tracing::debug;

/// In-memory application treasury.
#[derive(Default)]
pub struct InMemoryTreasury {
    balance: Mutex<Fee>,
}

impl InMemoryTreasury {
    /// Create with an opening balance.
    pub fn new(balance: Fee) -> Self {
        Self {
            balance: Mutex::new(balance),
        }
    }
}

impl ReturnLegFunding for InMemoryTreasury {
    fn available(&self) -> Fee {
        *self.balance.lock()
    }

    fn withdraw(&self, amount: Fee) -> Result<Fee, MessagingError> {
        let mut balance = self.balance.lock();
        if !balance.covers(&amount) {
            return Err(MessagingError::InsufficientReturnFunds {
                required: amount,
                available: *balance,
            });
        }
        *balance = balance.saturating_sub(&amount);
        debug!("[qc-15] Treasury withdrew {} (remaining {})", amount, *balance);
        Ok(amount)
    }

    fn deposit(&self, amount: Fee) {
        let mut balance = self.balance.lock();
        *balance = balance.saturating_add(&amount);
        debug!("[qc-15] Treasury credited {} (balance {})", amount, *balance);
    }
}
