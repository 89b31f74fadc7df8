//! `Ledger`: wires bus, stores, processor and supervisor behind the public
//! entry points.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use ledger_core::{AccountId, TransferId};
use ledger_events::{Command, InMemoryBusError};
use ledger_transfers::{Account, LedgerEvent, TransferMoney};

use crate::config::LedgerConfig;
use crate::processor::{ProcessorError, ProcessorStats, TransferProcessor};
use crate::store::{AccountStore, AccountStoreError, InMemoryAccountStore, TransferOutcomeStore};
use crate::subscribers::{LedgerBus, OutcomeSubscriber, ProcessorSubscriber};
use crate::supervisor::{BusSubscriber, SubscribersSupervisor, SupervisorError};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("account {0} already exists")]
    AlreadyExists(AccountId),
    #[error("account store failure: {0}")]
    Store(AccountStoreError),
    #[error("event bus unavailable: {0}")]
    Bus(#[from] InMemoryBusError),
    #[error("transfer processing failed: {0}")]
    Processor(#[from] ProcessorError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}

impl From<AccountStoreError> for LedgerError {
    fn from(value: AccountStoreError) -> Self {
        match value {
            AccountStoreError::AlreadyExists(id) => LedgerError::AlreadyExists(id),
            other => LedgerError::Store(other),
        }
    }
}

/// A running in-memory ledger.
///
/// ```ignore
/// let ledger = Ledger::start(LedgerConfig::default())?;
/// ledger.open_account(Account::new("a", "Ada", "Lovelace", Money::of(100, "EUR")?))?;
/// let id = ledger.submit_transfer(TransferMoney::new("a", "b", Money::of(10, "EUR")?))?;
/// // later
/// let outcome = ledger.find_transfer_outcome(&id);
/// ledger.stop();
/// ```
#[derive(Debug)]
pub struct Ledger<S: AccountStore + 'static = InMemoryAccountStore> {
    accounts: Arc<S>,
    outcomes: Arc<TransferOutcomeStore>,
    bus: Arc<LedgerBus>,
    processor: TransferProcessor<Arc<S>>,
    supervisor: SubscribersSupervisor<LedgerBus>,
    config: LedgerConfig,
}

impl Ledger {
    /// Start a ledger over an empty in-memory account store.
    pub fn start(config: LedgerConfig) -> Result<Self, LedgerError> {
        Self::start_with_store(InMemoryAccountStore::new(), config)
    }
}

impl<S: AccountStore + 'static> Ledger<S> {
    pub fn start_with_store(store: S, config: LedgerConfig) -> Result<Self, LedgerError> {
        let accounts = Arc::new(store);
        let outcomes = Arc::new(TransferOutcomeStore::new());
        let bus = Arc::new(LedgerBus::new());
        let processor = TransferProcessor::new(accounts.clone());

        let subscribers: Vec<Arc<dyn BusSubscriber<LedgerBus>>> = vec![
            Arc::new(ProcessorSubscriber::new(
                processor.clone(),
                config.processor_retry.clone(),
            )),
            Arc::new(OutcomeSubscriber::new(outcomes.clone())),
        ];
        let supervisor =
            SubscribersSupervisor::start(bus.clone(), subscribers, config.health_check_interval)?;

        info!(
            health_check_interval_secs = config.health_check_interval.as_secs(),
            max_attempts = config.processor_retry.max_attempts,
            "ledger started"
        );

        Ok(Self {
            accounts,
            outcomes,
            bus,
            processor,
            supervisor,
            config,
        })
    }

    /// Detach every subscriber, then close the bus. Idempotent.
    ///
    /// Handlers in flight complete; commands still queued are dropped.
    pub fn stop(&self) {
        if self.bus.is_closed() {
            return;
        }
        self.supervisor.unsubscribe();
        self.bus.close();
        info!("ledger stopped");
    }

    pub fn open_account(&self, account: Account) -> Result<Account, LedgerError> {
        Ok(self.accounts.open(account)?)
    }

    pub fn close_account(&self, id: &AccountId) -> Option<Account> {
        self.accounts.close(id)
    }

    pub fn find_account(&self, id: &AccountId) -> Option<Account> {
        self.accounts.find_by_id(id)
    }

    /// Publish the command and return its id without waiting for processing.
    /// Poll [`find_transfer_outcome`](Self::find_transfer_outcome) for the result.
    pub fn submit_transfer(&self, command: TransferMoney) -> Result<TransferId, LedgerError> {
        let transfer_id = command.command_id().clone();
        self.bus.publish_command(command)?;
        Ok(transfer_id)
    }

    pub fn find_transfer_outcome(&self, transfer_id: &TransferId) -> Option<LedgerEvent> {
        self.outcomes.find_by_id(transfer_id)
    }

    pub fn is_healthy(&self) -> bool {
        self.supervisor.is_healthy()
    }

    pub fn processor_stats(&self) -> ProcessorStats {
        self.processor.stats()
    }

    pub fn supervisor(&self) -> &SubscribersSupervisor<LedgerBus> {
        &self.supervisor
    }

    pub fn bus(&self) -> &Arc<LedgerBus> {
        &self.bus
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}
