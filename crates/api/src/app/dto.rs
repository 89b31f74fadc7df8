use serde::{Deserialize, Serialize};

use ledger_core::{AccountId, Money, TransferId};
use ledger_transfers::TransferMoney;

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /transfer`. The transfer id is assigned by the server.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub account_id_from: AccountId,
    pub account_id_to: AccountId,
    pub amount_to_transfer: Money,
}

impl TransferRequest {
    pub fn into_command(self) -> TransferMoney {
        TransferMoney::new(self.account_id_from, self.account_id_to, self.amount_to_transfer)
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferAccepted {
    pub transfer_id: TransferId,
}
