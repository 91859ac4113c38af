//! Domain module
//!
//! Core domain types and checkout errors.

pub mod error;
pub mod model;

pub use error::CheckoutError;
pub use model::{
    Category, CategoryId, CheckoutItem, DetailId, LockedProduct, NewCategory, NewProduct,
    NewTransactionDetail, Product, ProductFilter, ProductId, Transaction, TransactionDetail,
    TransactionId,
};
