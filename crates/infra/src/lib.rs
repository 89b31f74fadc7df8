//! Infrastructure layer: stores, the transfer pipeline, workers, supervision
//! and the `Ledger` facade that wires them together.

pub mod config;
pub mod ledger;
pub mod processor;
pub mod retry;
pub mod store;
pub mod subscribers;
pub mod supervisor;
pub mod workers;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ConfigError, LedgerConfig};
pub use ledger::{Ledger, LedgerError};
pub use processor::{ProcessorError, ProcessorStats, TransferProcessor};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use store::{AccountStore, AccountStoreError, InMemoryAccountStore, TransferOutcomeStore};
pub use subscribers::{LedgerBus, TRANSFER_OUTCOME_STORE, TRANSFER_PROCESSOR};
pub use supervisor::{BusSubscriber, SubscribersSupervisor, SupervisorError};
pub use workers::{SubscriberWorker, WorkerHandle};
