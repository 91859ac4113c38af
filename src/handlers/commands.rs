//! Command definitions
//!
//! Commands represent intentions to change the system state.

use serde::{Deserialize, Serialize};

use crate::domain::{CheckoutError, CheckoutItem};

// =========================================================================
// CheckoutCommand
// =========================================================================

/// Command to turn a cart into a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutCommand {
    /// Cart lines in submission order; duplicates are processed one by one
    pub items: Vec<CheckoutItem>,
}

impl CheckoutCommand {
    pub fn new(items: Vec<CheckoutItem>) -> Self {
        Self { items }
    }

    pub fn with_item(mut self, product_id: i64, quantity: i64) -> Self {
        self.items.push(CheckoutItem::new(product_id, quantity));
        self
    }

    /// Reject empty carts and non-positive quantities.
    ///
    /// The first offending item in submission order is reported.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        if self.items.is_empty() {
            return Err(CheckoutError::EmptyOrder);
        }

        if let Some(item) = self.items.iter().find(|item| item.quantity <= 0) {
            return Err(CheckoutError::InvalidQuantity {
                product_id: item.product_id,
                quantity: item.quantity,
            });
        }

        Ok(())
    }
}
