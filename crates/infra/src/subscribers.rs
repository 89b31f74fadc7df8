//! The ledger's two long-lived bus subscribers.

use std::convert::Infallible;
use std::io;
use std::sync::Arc;

use tracing::{debug, error};

use ledger_events::{Command, Event, MessageBus, Projection};
use ledger_transfers::{LedgerEvent, TransferMoney};

use crate::ledger::LedgerError;
use crate::processor::TransferProcessor;
use crate::retry::RetryPolicy;
use crate::store::{AccountStore, TransferOutcomeStore};
use crate::supervisor::BusSubscriber;
use crate::workers::{SubscriberWorker, WorkerHandle};

/// The bus every ledger component talks over.
pub type LedgerBus = MessageBus<TransferMoney, LedgerEvent>;

pub const TRANSFER_PROCESSOR: &str = "transfer-processor";
pub const TRANSFER_OUTCOME_STORE: &str = "transfer-outcome-store";

/// Feeds transfer commands to the processor and publishes what it emits.
///
/// A transient fault that outlives the retry policy fails the handler, so the
/// command is requeued for the next attachment. A permanent fault can never
/// succeed on redelivery; it is logged and the command skipped.
#[derive(Debug)]
pub struct ProcessorSubscriber<S> {
    processor: TransferProcessor<S>,
    retry: RetryPolicy,
}

impl<S> ProcessorSubscriber<S> {
    pub fn new(processor: TransferProcessor<S>, retry: RetryPolicy) -> Self {
        Self { processor, retry }
    }
}

impl<S> BusSubscriber<LedgerBus> for ProcessorSubscriber<S>
where
    S: AccountStore + 'static,
{
    fn name(&self) -> &str {
        TRANSFER_PROCESSOR
    }

    fn subscribe(&self, bus: &Arc<LedgerBus>) -> io::Result<WorkerHandle> {
        let subscription = bus.subscribe_commands(TRANSFER_PROCESSOR);
        let processor = self.processor.clone();
        let retry = self.retry.clone();
        let publisher = bus.clone();

        SubscriberWorker::spawn(TRANSFER_PROCESSOR, subscription, move |command: &TransferMoney| {
            let events = match processor.handle_with_retry(command, &retry) {
                Ok(events) => events,
                Err(err) if err.is_transient() => return Err(LedgerError::Processor(err)),
                Err(err) => {
                    error!(
                        transfer_id = %command.command_id(),
                        error = %err,
                        "permanent processing failure; skipping command"
                    );
                    return Ok(());
                }
            };
            for event in events {
                debug!(
                    event_type = event.event_type(),
                    version = event.version(),
                    "publishing event"
                );
                publisher.publish_event(event)?;
            }
            Ok::<(), LedgerError>(())
        })
    }
}

/// Projects terminal events into the outcome store.
#[derive(Debug)]
pub struct OutcomeSubscriber {
    outcomes: Arc<TransferOutcomeStore>,
}

impl OutcomeSubscriber {
    pub fn new(outcomes: Arc<TransferOutcomeStore>) -> Self {
        Self { outcomes }
    }
}

impl BusSubscriber<LedgerBus> for OutcomeSubscriber {
    fn name(&self) -> &str {
        TRANSFER_OUTCOME_STORE
    }

    fn subscribe(&self, bus: &Arc<LedgerBus>) -> io::Result<WorkerHandle> {
        let subscription = bus.subscribe_events(TRANSFER_OUTCOME_STORE);
        let outcomes = self.outcomes.clone();

        SubscriberWorker::spawn(TRANSFER_OUTCOME_STORE, subscription, move |event: &LedgerEvent| {
            outcomes.apply(event);
            Ok::<(), Infallible>(())
        })
    }
}
