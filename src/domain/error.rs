//! Checkout Error Types
//!
//! Closed set of outcomes a checkout can fail with.

use thiserror::Error;

use crate::store::StoreError;

use super::model::ProductId;

/// Errors returned by the checkout engine
///
/// Validation errors are raised before any storage access. Business rule
/// violations are discovered while the unit of work is open and always come
/// with a full rollback. Storage failures are passed through unchanged.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Cart has no items, or the order total is not positive
    #[error("Checkout items cannot be empty")]
    EmptyOrder,

    /// Requested quantity is zero or negative
    #[error("Invalid quantity {quantity} for product {product_id}: must be greater than zero")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    /// Referenced product does not exist
    #[error("Product {product_id} not found")]
    ProductNotFound { product_id: ProductId },

    /// Not enough stock on hand to satisfy the line
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// Subtotal or total does not fit in the amount type
    #[error("Order amount overflow at product {product_id}")]
    AmountOverflow { product_id: ProductId },

    /// Backing store failed (connectivity, constraint, lock conflict)
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl CheckoutError {
    /// Check if this is a request validation error (no storage touched)
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::EmptyOrder | Self::InvalidQuantity { .. })
    }

    /// Check if the request was well-formed but cannot be satisfied
    pub fn is_business_rule_violation(&self) -> bool {
        matches!(
            self,
            Self::ProductNotFound { .. }
                | Self::InsufficientStock { .. }
                | Self::AmountOverflow { .. }
        )
    }

    /// Check if the system, not the caller, is at fault
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_error() {
        let err = CheckoutError::InsufficientStock {
            product_id: 7,
            requested: 2,
            available: 1,
        };

        assert!(err.is_business_rule_violation());
        assert!(!err.is_validation_error());
        assert!(err.to_string().contains("available 1"));
    }

    #[test]
    fn test_validation_errors() {
        assert!(CheckoutError::EmptyOrder.is_validation_error());

        let err = CheckoutError::InvalidQuantity {
            product_id: 3,
            quantity: 0,
        };
        assert!(err.is_validation_error());
        assert!(!err.is_storage_failure());
    }

    #[test]
    fn test_storage_failure() {
        let err: CheckoutError = StoreError::LockTimeout(9).into();

        assert!(err.is_storage_failure());
        assert!(!err.is_business_rule_violation());
    }
}
