//! In-memory stores read and written by the transfer pipeline.

pub mod accounts;
pub mod outcomes;

pub use accounts::{AccountStore, AccountStoreError, InMemoryAccountStore};
pub use outcomes::TransferOutcomeStore;
