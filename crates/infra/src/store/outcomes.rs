use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use ledger_core::TransferId;
use ledger_events::{Event, Projection};
use ledger_transfers::LedgerEvent;

/// Read model of final transfer results, keyed by transfer id.
///
/// Derived purely from the event stream. Only terminal events are kept and the
/// first one recorded for a transfer wins; later terminal events for the same
/// id (a redelivery, an `AlreadyProcessed` answer to a duplicate) are ignored.
#[derive(Debug, Default)]
pub struct TransferOutcomeStore {
    outcomes: DashMap<TransferId, LedgerEvent>,
}

impl TransferOutcomeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `event` if it is terminal and its transfer has no outcome yet.
    /// Returns whether the store changed.
    pub fn record(&self, event: &LedgerEvent) -> bool {
        let Some(transfer_id) = event.terminal_transfer_id() else {
            return false;
        };

        match self.outcomes.entry(transfer_id.clone()) {
            Entry::Occupied(_) => {
                debug!(transfer_id = %transfer_id, "outcome already recorded; ignoring");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(event.clone());
                debug!(transfer_id = %transfer_id, event_type = event.event_type(), "outcome recorded");
                true
            }
        }
    }

    pub fn find_by_id(&self, transfer_id: &TransferId) -> Option<LedgerEvent> {
        self.outcomes.get(transfer_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl Projection for TransferOutcomeStore {
    type Ev = LedgerEvent;

    fn apply(&self, event: &Self::Ev) {
        self.record(event);
    }
}
