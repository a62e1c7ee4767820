//! Core domain types and logic: price walks, ledgers and the round loop.

pub mod category;
pub mod instrument;
pub mod price_engine;
pub mod position;
pub mod trade;
pub mod snapshot;
pub mod ledger;
pub mod coordinator;
pub mod session;
pub mod config_validation;
pub mod error;
