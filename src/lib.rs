//! storefront_checkout Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod store;

pub use api::{build_app, AppState};
pub use config::Config;
pub use domain::CheckoutError;
pub use error::{AppError, AppResult};
pub use handlers::{CheckoutCommand, CheckoutHandler, TransactionService};
pub use store::{MemoryStore, StoreError};
