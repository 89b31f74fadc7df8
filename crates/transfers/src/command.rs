use serde::{Deserialize, Serialize};

use ledger_core::{AccountId, Money, TransferId};
use ledger_events::Command;

/// Command: move `amount` from `account_id_from` to `account_id_to`.
///
/// The command id doubles as the transfer id. Two commands with the same id are
/// the same command for deduplication, whatever their other fields say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferMoney {
    pub id: TransferId,
    pub account_id_from: AccountId,
    pub account_id_to: AccountId,
    pub amount: Money,
}

impl TransferMoney {
    /// New command with a generated id.
    pub fn new(
        account_id_from: impl Into<AccountId>,
        account_id_to: impl Into<AccountId>,
        amount: Money,
    ) -> Self {
        Self::with_id(TransferId::generate(), account_id_from, account_id_to, amount)
    }

    /// New command with a caller-assigned id.
    pub fn with_id(
        id: impl Into<TransferId>,
        account_id_from: impl Into<AccountId>,
        account_id_to: impl Into<AccountId>,
        amount: Money,
    ) -> Self {
        Self {
            id: id.into(),
            account_id_from: account_id_from.into(),
            account_id_to: account_id_to.into(),
            amount,
        }
    }
}

impl Command for TransferMoney {
    type Id = TransferId;

    fn command_id(&self) -> &TransferId {
        &self.id
    }

    fn command_type(&self) -> &'static str {
        "transfers.transfer_money"
    }
}
