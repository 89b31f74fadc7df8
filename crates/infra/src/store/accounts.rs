use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tracing::debug;

use ledger_core::{AccountId, Entity};
use ledger_transfers::Account;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountStoreError {
    #[error("account {0} already exists")]
    AlreadyExists(AccountId),
    /// Transient fault; the operation may succeed when retried.
    #[error("account store unavailable: {0}")]
    Unavailable(String),
}

/// Account storage abstraction.
///
/// The store owns account state. Accounts are replaced as whole values, never
/// mutated in place.
pub trait AccountStore: Send + Sync {
    /// Insert a new account; fails if the id is taken.
    fn open(&self, account: Account) -> Result<Account, AccountStoreError>;

    /// Remove an account. Closing an absent id yields `None`.
    fn close(&self, id: &AccountId) -> Option<Account>;

    fn find_by_id(&self, id: &AccountId) -> Option<Account>;

    /// Unconditional overwrite. Only the transfer processor calls this.
    fn save(&self, account: Account) -> Result<Account, AccountStoreError>;
}

impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    fn open(&self, account: Account) -> Result<Account, AccountStoreError> {
        (**self).open(account)
    }

    fn close(&self, id: &AccountId) -> Option<Account> {
        (**self).close(id)
    }

    fn find_by_id(&self, id: &AccountId) -> Option<Account> {
        (**self).find_by_id(id)
    }

    fn save(&self, account: Account) -> Result<Account, AccountStoreError> {
        (**self).save(account)
    }
}

/// Concurrent in-memory account store.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: DashMap<AccountId, Account>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn open(&self, account: Account) -> Result<Account, AccountStoreError> {
        match self.accounts.entry(account.id().clone()) {
            Entry::Occupied(_) => Err(AccountStoreError::AlreadyExists(account.id)),
            Entry::Vacant(slot) => {
                slot.insert(account.clone());
                debug!(account_id = %account.id, balance = %account.balance, "account opened");
                Ok(account)
            }
        }
    }

    fn close(&self, id: &AccountId) -> Option<Account> {
        let closed = self.accounts.remove(id).map(|(_, account)| account);
        if closed.is_some() {
            debug!(account_id = %id, "account closed");
        }
        closed
    }

    fn find_by_id(&self, id: &AccountId) -> Option<Account> {
        self.accounts.get(id).map(|entry| entry.value().clone())
    }

    fn save(&self, account: Account) -> Result<Account, AccountStoreError> {
        self.accounts.insert(account.id().clone(), account.clone());
        Ok(account)
    }
}
