//! Transfers module: accounts, the `TransferMoney` command and the ledger event union.
//!
//! Pure domain logic only: no IO, no threads, no persistence concerns.

pub mod account;
pub mod command;
pub mod event;

pub use account::Account;
pub use command::TransferMoney;
pub use event::{
    AccountCredited, AccountDebited, FailureReason, LedgerEvent, MoneyTransferFailed,
    MoneyTransferred,
};
