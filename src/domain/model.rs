//! Domain models
//!
//! Catalogue entities, the checkout input and the transaction ledger records.
//! Money is always an integer in the smallest currency unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CategoryId = i64;
pub type ProductId = i64;
pub type TransactionId = i64;
pub type DetailId = i64;

// =========================================================================
// Catalogue
// =========================================================================

/// Product category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
}

/// Fields accepted when creating or replacing a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl NewCategory {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Category name cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Sellable product with its current stock level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price in the smallest currency unit
    pub price: i64,
    /// Units on hand, never negative
    pub stock: i64,
    pub active: bool,
    pub category_id: Option<CategoryId>,
    /// Name of the referenced category (read-side join)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

/// Fields accepted when creating or replacing a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: i64,
    pub stock: i64,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

fn default_active() -> bool {
    true
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Product name cannot be empty".to_string());
        }
        if self.price < 0 {
            return Err(format!("Price cannot be negative (got {})", self.price));
        }
        if self.stock < 0 {
            return Err(format!("Stock cannot be negative (got {})", self.stock));
        }
        Ok(())
    }
}

/// Optional filters for product listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl ProductFilter {
    /// Name pattern normalised for matching; blank names are ignored
    pub fn name_pattern(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(pattern) = self.name_pattern() {
            if !product.name.to_lowercase().contains(&pattern) {
                return false;
            }
        }
        self.active.map_or(true, |active| product.active == active)
    }
}

// =========================================================================
// Checkout & ledger
// =========================================================================

/// One requested cart line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl CheckoutItem {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Product state read under an exclusive row lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedProduct {
    pub id: ProductId,
    pub name: String,
    pub price: i64,
    pub stock: i64,
}

/// Line item waiting to be bound to a transaction header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransactionDetail {
    pub transaction_id: TransactionId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    pub subtotal: i64,
}

/// Persisted checkout (header plus line items)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
    pub details: Vec<TransactionDetail>,
}

/// Persisted line item with name and price captured at sale time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetail {
    pub id: DetailId,
    pub transaction_id: TransactionId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    pub subtotal: i64,
}

impl TransactionDetail {
    pub fn from_new(id: DetailId, detail: NewTransactionDetail) -> Self {
        Self {
            id,
            transaction_id: detail.transaction_id,
            product_id: detail.product_id,
            product_name: detail.product_name,
            quantity: detail.quantity,
            subtotal: detail.subtotal,
        }
    }
}
