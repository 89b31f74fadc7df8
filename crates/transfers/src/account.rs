use serde::{Deserialize, Serialize};

use ledger_core::{AccountId, DomainResult, Entity, Money};

/// A customer account.
///
/// Accounts are immutable values: `credit`/`debit` return a new `Account` that
/// replaces the stored one, the original is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub first_name: String,
    pub last_name: String,
    pub balance: Money,
}

impl Account {
    pub fn new(
        id: impl Into<AccountId>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        balance: Money,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            balance,
        }
    }

    /// Account with `amount` added to its balance.
    pub fn credit(&self, amount: &Money) -> DomainResult<Account> {
        Ok(Account {
            balance: self.balance.checked_add(amount)?,
            ..self.clone()
        })
    }

    /// Account with `amount` removed from its balance.
    ///
    /// Does not check for overdraft; the transfer pipeline validates the
    /// balance before debiting.
    pub fn debit(&self, amount: &Money) -> DomainResult<Account> {
        Ok(Account {
            balance: self.balance.checked_sub(amount)?,
            ..self.clone()
        })
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
