use serde::{Deserialize, Serialize};

use ledger_core::{AccountId, Currency, Money, TransferId};
use ledger_events::Event;

use crate::account::Account;
use crate::command::TransferMoney;

/// Event: an account received money. Carries the resulting account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCredited {
    pub amount: Money,
    pub account: Account,
}

/// Event: money left an account. Carries the resulting account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDebited {
    pub amount: Money,
    pub account: Account,
}

/// Terminal event: the transfer completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyTransferred {
    pub transfer_id: TransferId,
    pub amount: Money,
    pub account_id_from: AccountId,
    pub account_id_to: AccountId,
}

impl MoneyTransferred {
    pub fn from_command(command: &TransferMoney) -> Self {
        Self {
            transfer_id: command.id.clone(),
            amount: command.amount.clone(),
            account_id_from: command.account_id_from.clone(),
            account_id_to: command.account_id_to.clone(),
        }
    }
}

/// Why a transfer was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    SameAccount,
    NegativeOrZeroAmount,
    SourceAccountNotFound,
    DestinationAccountNotFound,
    CurrencyMismatch,
    InsufficientBalance,
    /// The destination balance cannot represent the credited amount.
    BalanceOverflow,
    AlreadyProcessed,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::SameAccount => "same_account",
            FailureReason::NegativeOrZeroAmount => "negative_or_zero_amount",
            FailureReason::SourceAccountNotFound => "source_account_not_found",
            FailureReason::DestinationAccountNotFound => "destination_account_not_found",
            FailureReason::CurrencyMismatch => "currency_mismatch",
            FailureReason::InsufficientBalance => "insufficient_balance",
            FailureReason::BalanceOverflow => "balance_overflow",
            FailureReason::AlreadyProcessed => "already_processed",
        }
    }
}

/// Terminal event: the transfer was rejected.
///
/// Every rejection shares the same shape; `reason` discriminates and `cause`
/// is the human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyTransferFailed {
    pub transfer_id: TransferId,
    pub reason: FailureReason,
    pub cause: String,
}

impl MoneyTransferFailed {
    fn new(transfer_id: &TransferId, reason: FailureReason, cause: String) -> Self {
        Self {
            transfer_id: transfer_id.clone(),
            reason,
            cause,
        }
    }

    pub fn same_account(transfer_id: &TransferId, account_id: &AccountId) -> Self {
        Self::new(
            transfer_id,
            FailureReason::SameAccount,
            format!("Source and destination accounts are the same: {account_id}"),
        )
    }

    pub fn negative_or_zero_amount(transfer_id: &TransferId) -> Self {
        Self::new(
            transfer_id,
            FailureReason::NegativeOrZeroAmount,
            "Transfer amount cannot be negative or zero".to_string(),
        )
    }

    pub fn source_account_not_found(transfer_id: &TransferId, account_id: &AccountId) -> Self {
        Self::new(
            transfer_id,
            FailureReason::SourceAccountNotFound,
            format!("Source account ({account_id}) does not exist"),
        )
    }

    pub fn destination_account_not_found(transfer_id: &TransferId, account_id: &AccountId) -> Self {
        Self::new(
            transfer_id,
            FailureReason::DestinationAccountNotFound,
            format!("Destination account ({account_id}) does not exist"),
        )
    }

    pub fn currency_mismatch(transfer_id: &TransferId, requested: &Currency, account: &Currency) -> Self {
        Self::new(
            transfer_id,
            FailureReason::CurrencyMismatch,
            format!("Currency mismatch: {requested}/{account}"),
        )
    }

    pub fn insufficient_balance(transfer_id: &TransferId, account_id: &AccountId) -> Self {
        Self::new(
            transfer_id,
            FailureReason::InsufficientBalance,
            format!("Account ({account_id}) has insufficient balance to perform money transfer"),
        )
    }

    pub fn balance_overflow(transfer_id: &TransferId, account_id: &AccountId) -> Self {
        Self::new(
            transfer_id,
            FailureReason::BalanceOverflow,
            format!("Account ({account_id}) balance cannot hold the transferred amount"),
        )
    }

    pub fn already_processed(transfer_id: &TransferId) -> Self {
        Self::new(
            transfer_id,
            FailureReason::AlreadyProcessed,
            format!("Money transfer ({transfer_id}) was already processed"),
        )
    }
}

/// Every event the ledger publishes on the event channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    AccountCredited(AccountCredited),
    AccountDebited(AccountDebited),
    MoneyTransferred(MoneyTransferred),
    MoneyTransferFailed(MoneyTransferFailed),
}

impl LedgerEvent {
    /// Transfer id of a terminal event; `None` for account mutations.
    pub fn terminal_transfer_id(&self) -> Option<&TransferId> {
        match self {
            LedgerEvent::MoneyTransferred(e) => Some(&e.transfer_id),
            LedgerEvent::MoneyTransferFailed(e) => Some(&e.transfer_id),
            LedgerEvent::AccountCredited(_) | LedgerEvent::AccountDebited(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_transfer_id().is_some()
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            LedgerEvent::MoneyTransferFailed(e) => Some(e.reason),
            _ => None,
        }
    }
}

impl From<MoneyTransferFailed> for LedgerEvent {
    fn from(value: MoneyTransferFailed) -> Self {
        LedgerEvent::MoneyTransferFailed(value)
    }
}

impl From<MoneyTransferred> for LedgerEvent {
    fn from(value: MoneyTransferred) -> Self {
        LedgerEvent::MoneyTransferred(value)
    }
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::AccountCredited(_) => "transfers.account.credited",
            LedgerEvent::AccountDebited(_) => "transfers.account.debited",
            LedgerEvent::MoneyTransferred(_) => "transfers.money_transferred",
            LedgerEvent::MoneyTransferFailed(_) => "transfers.money_transfer_failed",
        }
    }

    fn version(&self) -> u32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eur(amount: i64) -> Money {
        Money::of(amount, "EUR").unwrap()
    }

    #[test]
    fn causes_are_human_readable() {
        let t = TransferId::from("t");
        let a = AccountId::from("a");

        assert_eq!(
            MoneyTransferFailed::insufficient_balance(&t, &a).cause,
            "Account (a) has insufficient balance to perform money transfer"
        );
        assert_eq!(
            MoneyTransferFailed::same_account(&t, &a).cause,
            "Source and destination accounts are the same: a"
        );
        assert_eq!(
            MoneyTransferFailed::balance_overflow(&t, &a).cause,
            "Account (a) balance cannot hold the transferred amount"
        );
        assert_eq!(
            MoneyTransferFailed::already_processed(&t).cause,
            "Money transfer (t) was already processed"
        );
        let eur = Currency::new("EUR").unwrap();
        let usd = Currency::new("USD").unwrap();
        assert_eq!(
            MoneyTransferFailed::currency_mismatch(&t, &usd, &eur).cause,
            "Currency mismatch: USD/EUR"
        );
    }

    #[test]
    fn only_transfer_outcomes_are_terminal() {
        let account = Account::new("a", "Ada", "Lovelace", eur(1));
        let credited = LedgerEvent::AccountCredited(AccountCredited {
            amount: eur(1),
            account: account.clone(),
        });
        let debited = LedgerEvent::AccountDebited(AccountDebited {
            amount: eur(1),
            account,
        });
        let done: LedgerEvent = MoneyTransferred::from_command(&TransferMoney::with_id(
            "t1",
            "a",
            "b",
            eur(1),
        ))
        .into();
        let failed: LedgerEvent = MoneyTransferFailed::negative_or_zero_amount(&"t2".into()).into();

        assert!(!credited.is_terminal());
        assert!(!debited.is_terminal());
        assert_eq!(done.terminal_transfer_id(), Some(&TransferId::from("t1")));
        assert_eq!(failed.terminal_transfer_id(), Some(&TransferId::from("t2")));
        assert_eq!(failed.failure_reason(), Some(FailureReason::NegativeOrZeroAmount));
    }

    #[test]
    fn events_are_tagged_by_type_in_json() {
        let failed: LedgerEvent = MoneyTransferFailed::source_account_not_found(
            &"t".into(),
            &"x".into(),
        )
        .into();
        let json = serde_json::to_value(&failed).unwrap();

        assert_eq!(json["type"], "MoneyTransferFailed");
        assert_eq!(json["transferId"], "t");
        assert_eq!(json["reason"], "SourceAccountNotFound");
        assert_eq!(json["cause"], "Source account (x) does not exist");

        let back: LedgerEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, failed);
    }
}
