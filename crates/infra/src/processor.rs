//! Transfer processor: validates `TransferMoney` commands against current
//! account state and applies the resulting balance changes.
//!
//! The processor is the only writer of account balances. It is driven by a
//! single worker thread; that serial execution is what keeps two transfers from
//! racing on one account.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::{DashMap, DashSet};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use ledger_core::{DomainError, Entity, TransferId};
use ledger_events::{Command, CommandHandler};
use ledger_transfers::{
    Account, AccountCredited, AccountDebited, LedgerEvent, MoneyTransferFailed, MoneyTransferred,
    TransferMoney,
};

use crate::retry::RetryPolicy;
use crate::store::{AccountStore, AccountStoreError};

/// Unexpected failure while processing a command. Never a validation outcome:
/// those are reported as `MoneyTransferFailed` events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessorError {
    #[error(transparent)]
    Store(#[from] AccountStoreError),
    #[error("domain invariant violated: {0}")]
    Domain(#[from] DomainError),
}

impl ProcessorError {
    /// Whether handling the same command again may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProcessorError::Store(AccountStoreError::Unavailable(_)))
    }
}

/// Snapshot of the processor's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessorStats {
    pub commands_handled: u64,
    pub transfers_completed: u64,
    pub transfers_failed: u64,
    pub errors: u64,
    /// Size of the dedup set.
    pub processed_transfers: usize,
    pub pending_writes: usize,
}

#[derive(Debug, Default)]
struct Counters {
    commands_handled: AtomicU64,
    transfers_completed: AtomicU64,
    transfers_failed: AtomicU64,
    errors: AtomicU64,
}

/// Accounts a transfer resolved to, recorded before they are persisted.
#[derive(Debug, Clone)]
struct WriteSet {
    source: Account,
    destination: Account,
}

enum Decision {
    Reject(MoneyTransferFailed),
    Apply(WriteSet),
}

/// Cloneable handle over shared processor state.
#[derive(Debug)]
pub struct TransferProcessor<S> {
    inner: Arc<Inner<S>>,
}

#[derive(Debug)]
struct Inner<S> {
    store: S,
    processed: DashSet<TransferId>,
    pending: DashMap<TransferId, WriteSet>,
    counters: Counters,
}

impl<S> Clone for TransferProcessor<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: AccountStore> TransferProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                processed: DashSet::new(),
                pending: DashMap::new(),
                counters: Counters::default(),
            }),
        }
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn is_processed(&self, transfer_id: &TransferId) -> bool {
        self.inner.processed.contains(transfer_id)
    }

    /// Process one command and return the events it produced, in publish order.
    ///
    /// - success: `[AccountCredited, AccountDebited, MoneyTransferred]`
    /// - validation failure or duplicate: `[MoneyTransferFailed]`
    ///
    /// `Err` means a transient fault; the command may be handled again and will
    /// not be applied twice.
    pub fn handle(&self, command: &TransferMoney) -> Result<Vec<LedgerEvent>, ProcessorError> {
        let result = self.process(command);

        let counters = &self.inner.counters;
        match &result {
            Ok(events) => {
                counters.commands_handled.fetch_add(1, Ordering::Relaxed);
                if matches!(events.last(), Some(LedgerEvent::MoneyTransferred(_))) {
                    counters.transfers_completed.fetch_add(1, Ordering::Relaxed);
                } else {
                    counters.transfers_failed.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(_) => {
                counters.errors.fetch_add(1, Ordering::Relaxed);
            }
        }

        result
    }

    /// [`handle`](Self::handle), retrying transient faults according to `policy`.
    /// Permanent errors are returned after the first attempt.
    pub fn handle_with_retry(
        &self,
        command: &TransferMoney,
        policy: &RetryPolicy,
    ) -> Result<Vec<LedgerEvent>, ProcessorError> {
        policy.run_if(
            || CommandHandler::handle(self, command),
            ProcessorError::is_transient,
            |attempt, err| {
                warn!(
                    transfer_id = %command.command_id(),
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    "transfer processing failed; retrying"
                );
            },
        )
    }

    pub fn stats(&self) -> ProcessorStats {
        let counters = &self.inner.counters;
        ProcessorStats {
            commands_handled: counters.commands_handled.load(Ordering::Relaxed),
            transfers_completed: counters.transfers_completed.load(Ordering::Relaxed),
            transfers_failed: counters.transfers_failed.load(Ordering::Relaxed),
            errors: counters.errors.load(Ordering::Relaxed),
            processed_transfers: self.inner.processed.len(),
            pending_writes: self.inner.pending.len(),
        }
    }

    fn process(&self, command: &TransferMoney) -> Result<Vec<LedgerEvent>, ProcessorError> {
        let id = command.command_id();

        if self.inner.processed.contains(id) {
            debug!(transfer_id = %id, "duplicate transfer command");
            return Ok(vec![MoneyTransferFailed::already_processed(id).into()]);
        }

        // A previous attempt got past validation but did not finish persisting.
        let pending = self.inner.pending.get(id).map(|entry| entry.value().clone());
        if let Some(writes) = pending {
            info!(transfer_id = %id, "replaying pending account writes");
            return self.commit(command, writes);
        }

        match self.validate(command)? {
            Decision::Reject(failure) => {
                info!(
                    transfer_id = %id,
                    reason = failure.reason.as_str(),
                    cause = %failure.cause,
                    "transfer rejected"
                );
                self.inner.processed.insert(id.clone());
                Ok(vec![failure.into()])
            }
            Decision::Apply(writes) => self.commit(command, writes),
        }
    }

    fn validate(&self, command: &TransferMoney) -> Result<Decision, ProcessorError> {
        let id = command.command_id();
        let amount = &command.amount;
        let store = &self.inner.store;

        if command.account_id_from == command.account_id_to {
            return Ok(Decision::Reject(MoneyTransferFailed::same_account(
                id,
                &command.account_id_from,
            )));
        }

        if amount.is_negative_or_zero() {
            return Ok(Decision::Reject(MoneyTransferFailed::negative_or_zero_amount(id)));
        }

        let Some(source) = store.find_by_id(&command.account_id_from) else {
            return Ok(Decision::Reject(MoneyTransferFailed::source_account_not_found(
                id,
                &command.account_id_from,
            )));
        };
        let Some(destination) = store.find_by_id(&command.account_id_to) else {
            return Ok(Decision::Reject(
                MoneyTransferFailed::destination_account_not_found(id, &command.account_id_to),
            ));
        };

        for account in [&source, &destination] {
            if !amount.same_currency(&account.balance) {
                return Ok(Decision::Reject(MoneyTransferFailed::currency_mismatch(
                    id,
                    amount.currency(),
                    account.balance.currency(),
                )));
            }
        }

        if amount.is_greater_than(&source.balance)? {
            return Ok(Decision::Reject(MoneyTransferFailed::insufficient_balance(
                id,
                source.id(),
            )));
        }

        let Ok(credited) = destination.credit(amount) else {
            return Ok(Decision::Reject(MoneyTransferFailed::balance_overflow(
                id,
                destination.id(),
            )));
        };

        Ok(Decision::Apply(WriteSet {
            source: source.debit(amount)?,
            destination: credited,
        }))
    }

    fn commit(
        &self,
        command: &TransferMoney,
        writes: WriteSet,
    ) -> Result<Vec<LedgerEvent>, ProcessorError> {
        let id = command.command_id();
        self.inner.pending.insert(id.clone(), writes.clone());

        let source = self.inner.store.save(writes.source)?;
        let destination = self.inner.store.save(writes.destination)?;

        self.inner.processed.insert(id.clone());
        self.inner.pending.remove(id);

        info!(
            transfer_id = %id,
            command_type = command.command_type(),
            from = %command.account_id_from,
            to = %command.account_id_to,
            amount = %command.amount,
            "money transferred"
        );

        Ok(vec![
            LedgerEvent::AccountCredited(AccountCredited {
                amount: command.amount.clone(),
                account: destination,
            }),
            LedgerEvent::AccountDebited(AccountDebited {
                amount: command.amount.clone(),
                account: source,
            }),
            MoneyTransferred::from_command(command).into(),
        ])
    }
}

impl<S: AccountStore> CommandHandler for TransferProcessor<S> {
    type Cmd = TransferMoney;
    type Ev = LedgerEvent;
    type Error = ProcessorError;

    fn handle(&self, command: &Self::Cmd) -> Result<Vec<Self::Ev>, Self::Error> {
        TransferProcessor::handle(self, command)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ledger_core::{AccountId, Money};
    use ledger_transfers::FailureReason;
    use proptest::prelude::*;

    use super::*;
    use crate::store::InMemoryAccountStore;
    use crate::test_support::FlakyAccountStore;

    fn eur(amount: &str) -> Money {
        Money::parse(amount, "EUR").unwrap()
    }

    fn account(id: &str, balance: Money) -> Account {
        Account::new(id, "First", "Last", balance)
    }

    fn processor_with(accounts: &[(&str, Money)]) -> TransferProcessor<InMemoryAccountStore> {
        let store = InMemoryAccountStore::new();
        for (id, balance) in accounts {
            store.open(account(id, balance.clone())).unwrap();
        }
        TransferProcessor::new(store)
    }

    fn balance<S: AccountStore>(processor: &TransferProcessor<S>, id: &str) -> Money {
        processor
            .store()
            .find_by_id(&AccountId::from(id))
            .unwrap()
            .balance
    }

    fn single_failure(events: &[LedgerEvent]) -> &MoneyTransferFailed {
        match events {
            [LedgerEvent::MoneyTransferFailed(failure)] => failure,
            other => panic!("expected a single failure event, got {other:?}"),
        }
    }

    #[test]
    fn successful_transfer_moves_the_amount() {
        let processor = processor_with(&[("a", eur("100")), ("b", eur("0"))]);
        let command = TransferMoney::with_id("t1", "a", "b", eur("100"));

        let events = processor.handle(&command).unwrap();

        assert_eq!(
            events,
            vec![
                LedgerEvent::AccountCredited(AccountCredited {
                    amount: eur("100"),
                    account: account("b", eur("100")),
                }),
                LedgerEvent::AccountDebited(AccountDebited {
                    amount: eur("100"),
                    account: account("a", eur("0")),
                }),
                MoneyTransferred::from_command(&command).into(),
            ]
        );
        assert_eq!(balance(&processor, "a"), eur("0"));
        assert_eq!(balance(&processor, "b"), eur("100"));
    }

    #[test]
    fn insufficient_balance_leaves_accounts_untouched() {
        let processor = processor_with(&[("a", eur("10")), ("b", eur("0"))]);
        let command = TransferMoney::with_id("t", "a", "b", eur("10.01"));

        let events = processor.handle(&command).unwrap();

        let failure = single_failure(&events);
        assert_eq!(failure.reason, FailureReason::InsufficientBalance);
        assert_eq!(
            failure.cause,
            "Account (a) has insufficient balance to perform money transfer"
        );
        assert_eq!(balance(&processor, "a"), eur("10"));
        assert_eq!(balance(&processor, "b"), eur("0"));
    }

    #[test]
    fn the_same_command_is_applied_once() {
        let processor = processor_with(&[("a", eur("100")), ("b", eur("0"))]);
        let command = TransferMoney::with_id("t1", "a", "b", eur("30"));

        processor.handle(&command).unwrap();
        let again = processor.handle(&command).unwrap();
        let failure = single_failure(&again);

        assert_eq!(failure.reason, FailureReason::AlreadyProcessed);
        assert_eq!(failure.cause, "Money transfer (t1) was already processed");
        assert_eq!(balance(&processor, "a"), eur("70"));
        assert_eq!(balance(&processor, "b"), eur("30"));
    }

    #[test]
    fn identity_is_the_command_id_only() {
        let processor = processor_with(&[("a", eur("100")), ("b", eur("0"))]);
        processor
            .handle(&TransferMoney::with_id("t1", "a", "b", eur("1")))
            .unwrap();

        let different_payload = TransferMoney::with_id("t1", "b", "a", eur("5"));
        let events = processor.handle(&different_payload).unwrap();

        assert_eq!(single_failure(&events).reason, FailureReason::AlreadyProcessed);
    }

    #[test]
    fn rejected_commands_are_deduplicated_too() {
        let processor = processor_with(&[("a", eur("100"))]);
        let command = TransferMoney::with_id("t", "a", "a", eur("1"));

        let first = processor.handle(&command).unwrap();
        let second = processor.handle(&command).unwrap();

        assert_eq!(single_failure(&first).reason, FailureReason::SameAccount);
        assert_eq!(single_failure(&second).reason, FailureReason::AlreadyProcessed);
    }

    #[test]
    fn same_account_wins_regardless_of_amount_sign() {
        let processor = processor_with(&[]);

        for amount in ["-5", "0", "5"] {
            let command = TransferMoney::new("a", "a", eur(amount));
            let events = processor.handle(&command).unwrap();
            let failure = single_failure(&events);
            assert_eq!(failure.reason, FailureReason::SameAccount);
            assert_eq!(failure.cause, "Source and destination accounts are the same: a");
        }
    }

    #[test]
    fn non_positive_amounts_are_rejected_before_lookups() {
        let processor = processor_with(&[]);

        for amount in ["-1", "0"] {
            let events = processor
                .handle(&TransferMoney::new("missing-a", "missing-b", eur(amount)))
                .unwrap();
            assert_eq!(
                single_failure(&events).reason,
                FailureReason::NegativeOrZeroAmount
            );
        }
    }

    #[test]
    fn source_existence_is_checked_before_destination() {
        let processor = processor_with(&[("b", eur("1"))]);

        let events = processor
            .handle(&TransferMoney::new("x", "y", eur("1")))
            .unwrap();
        let failure = single_failure(&events);
        assert_eq!(failure.reason, FailureReason::SourceAccountNotFound);
        assert_eq!(failure.cause, "Source account (x) does not exist");

        let events = processor
            .handle(&TransferMoney::new("b", "y", eur("1")))
            .unwrap();
        let failure = single_failure(&events);
        assert_eq!(failure.reason, FailureReason::DestinationAccountNotFound);
        assert_eq!(failure.cause, "Destination account (y) does not exist");
    }

    #[test]
    fn existence_precedes_currency_checks() {
        let usd = Money::of(1000, "USD").unwrap();
        let processor = processor_with(&[("a", usd)]);

        let events = processor
            .handle(&TransferMoney::new("a", "missing", eur("1")))
            .unwrap();

        assert_eq!(
            single_failure(&events).reason,
            FailureReason::DestinationAccountNotFound
        );
    }

    #[test]
    fn currency_is_checked_against_source_then_destination() {
        let usd = |amount: i64| Money::of(amount, "USD").unwrap();
        let processor = processor_with(&[("a", usd(100)), ("b", eur("0")), ("c", usd(0))]);

        let events = processor
            .handle(&TransferMoney::new("a", "b", usd(1)))
            .unwrap();
        let failure = single_failure(&events);
        assert_eq!(failure.reason, FailureReason::CurrencyMismatch);
        assert_eq!(failure.cause, "Currency mismatch: USD/EUR");

        let events = processor
            .handle(&TransferMoney::new("a", "c", eur("1")))
            .unwrap();
        assert_eq!(single_failure(&events).cause, "Currency mismatch: EUR/USD");
    }

    #[test]
    fn currency_mismatch_precedes_balance_check() {
        let processor = processor_with(&[("a", eur("1")), ("b", eur("0"))]);

        let events = processor
            .handle(&TransferMoney::new("a", "b", Money::of(500, "GBP").unwrap()))
            .unwrap();

        assert_eq!(single_failure(&events).reason, FailureReason::CurrencyMismatch);
    }

    #[test]
    fn a_failed_write_is_replayed_without_double_apply() {
        let store = FlakyAccountStore::new();
        store.open(account("a", eur("100"))).unwrap();
        store.open(account("b", eur("0"))).unwrap();
        // Source write succeeds, destination write fails once.
        store.script_saves([false, true]);
        let processor = TransferProcessor::new(store);
        let command = TransferMoney::with_id("t", "a", "b", eur("40"));

        assert!(processor.handle(&command).is_err());
        assert_eq!(balance(&processor, "a"), eur("60"));
        assert_eq!(balance(&processor, "b"), eur("0"));
        assert_eq!(processor.stats().pending_writes, 1);
        assert!(!processor.is_processed(&command.id));

        let events = processor.handle(&command).unwrap();

        assert!(matches!(events.last(), Some(LedgerEvent::MoneyTransferred(_))));
        assert_eq!(balance(&processor, "a"), eur("60"));
        assert_eq!(balance(&processor, "b"), eur("40"));
        assert_eq!(processor.stats().pending_writes, 0);
        assert!(processor.is_processed(&command.id));
    }

    #[test]
    fn retry_policy_absorbs_transient_faults() {
        let store = FlakyAccountStore::new();
        store.open(account("a", eur("5"))).unwrap();
        store.open(account("b", eur("5"))).unwrap();
        store.script_saves([true, true]);
        let processor = TransferProcessor::new(store);
        let policy = RetryPolicy::fixed(3, Duration::ZERO);

        let events = processor
            .handle_with_retry(&TransferMoney::new("a", "b", eur("5")), &policy)
            .unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(balance(&processor, "a"), eur("0"));
        assert_eq!(balance(&processor, "b"), eur("10"));

        let stats = processor.stats();
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.commands_handled, 1);
        assert_eq!(stats.transfers_completed, 1);
    }

    #[test]
    fn retry_gives_up_when_the_policy_is_exhausted() {
        let store = FlakyAccountStore::new();
        store.open(account("a", eur("5"))).unwrap();
        store.open(account("b", eur("5"))).unwrap();
        store.script_saves([true, true, true]);
        let processor = TransferProcessor::new(store);

        let result = processor.handle_with_retry(
            &TransferMoney::new("a", "b", eur("1")),
            &RetryPolicy::fixed(2, Duration::ZERO),
        );

        assert!(matches!(result, Err(ProcessorError::Store(AccountStoreError::Unavailable(_)))));
        assert_eq!(balance(&processor, "a"), eur("5"));
    }

    #[test]
    fn a_credit_the_destination_cannot_hold_is_rejected_without_retrying() {
        let max = Money::new(rust_decimal::Decimal::MAX, "EUR".parse().unwrap());
        let processor = processor_with(&[("a", eur("1")), ("rich", max.clone())]);
        let command = TransferMoney::with_id("t", "a", "rich", eur("1"));

        let events = processor
            .handle_with_retry(&command, &RetryPolicy::fixed(3, Duration::ZERO))
            .unwrap();

        let failure = single_failure(&events);
        assert_eq!(failure.reason, FailureReason::BalanceOverflow);
        assert_eq!(
            failure.cause,
            "Account (rich) balance cannot hold the transferred amount"
        );
        assert_eq!(balance(&processor, "a"), eur("1"));
        assert_eq!(balance(&processor, "rich"), max);
        assert!(processor.is_processed(&command.id));
        assert_eq!(processor.stats().errors, 0);
    }

    #[test]
    fn only_store_unavailability_is_transient() {
        assert!(ProcessorError::from(AccountStoreError::Unavailable("down".into())).is_transient());
        assert!(!ProcessorError::from(AccountStoreError::AlreadyExists("a".into())).is_transient());
        assert!(!ProcessorError::from(DomainError::validation("amount overflow")).is_transient());
    }

    #[test]
    fn stats_count_outcomes() {
        let processor = processor_with(&[("a", eur("10")), ("b", eur("0"))]);
        processor.handle(&TransferMoney::new("a", "b", eur("1"))).unwrap();
        processor.handle(&TransferMoney::new("a", "b", eur("100"))).unwrap();

        let stats = processor.stats();
        assert_eq!(stats.commands_handled, 2);
        assert_eq!(stats.transfers_completed, 1);
        assert_eq!(stats.transfers_failed, 1);
        assert_eq!(stats.processed_transfers, 2);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn transfers_conserve_the_pair_total(
            start_a in 0i64..10_000,
            start_b in 0i64..10_000,
            cents in proptest::collection::vec(-500i64..5_000, 1..20),
        ) {
            let processor = processor_with(&[
                ("a", Money::of(start_a, "EUR").unwrap()),
                ("b", Money::of(start_b, "EUR").unwrap()),
            ]);
            let total = Money::of(start_a + start_b, "EUR").unwrap();

            for (i, c) in cents.iter().enumerate() {
                let (from, to) = if i % 2 == 0 { ("a", "b") } else { ("b", "a") };
                let amount = Money::new(rust_decimal::Decimal::new(*c, 2), "EUR".parse().unwrap());
                let before = balance(&processor, from);

                let events = processor.handle(&TransferMoney::new(from, to, amount.clone())).unwrap();

                let after = balance(&processor, from);
                match events.last() {
                    Some(LedgerEvent::MoneyTransferred(_)) => {
                        prop_assert_eq!(before.checked_sub(&amount).unwrap(), after);
                    }
                    _ => {
                        prop_assert_eq!(before, after);
                    }
                }
                let sum = balance(&processor, "a").checked_add(&balance(&processor, "b")).unwrap();
                prop_assert_eq!(sum.amount(), total.amount());
                prop_assert!(!balance(&processor, "a").is_negative());
                prop_assert!(!balance(&processor, "b").is_negative());
            }
        }
    }
}
