//! Command Handlers module
//!
//! Command handlers that orchestrate business operations over the stores.

mod checkout_handler;
mod commands;


pub use checkout_handler::{
    CheckoutHandler, MemoryCheckoutHandler, PgCheckoutHandler, TransactionService,
};
pub use commands::*;
