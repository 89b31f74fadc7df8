use std::collections::VecDeque;
use std::sync::Mutex;

use ledger_core::AccountId;
use ledger_transfers::Account;

use crate::store::{AccountStore, AccountStoreError, InMemoryAccountStore};

/// Account store whose `save` calls fail on a script.
#[derive(Debug, Default)]
pub struct FlakyAccountStore {
    inner: InMemoryAccountStore,
    script: Mutex<VecDeque<bool>>,
}

impl FlakyAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// One entry per upcoming `save`: `true` fails it. Unscripted saves succeed.
    pub fn script_saves(&self, outcomes: impl IntoIterator<Item = bool>) {
        self.script.lock().unwrap().extend(outcomes);
    }
}

impl AccountStore for FlakyAccountStore {
    fn open(&self, account: Account) -> Result<Account, AccountStoreError> {
        self.inner.open(account)
    }

    fn close(&self, id: &AccountId) -> Option<Account> {
        self.inner.close(id)
    }

    fn find_by_id(&self, id: &AccountId) -> Option<Account> {
        self.inner.find_by_id(id)
    }

    fn save(&self, account: Account) -> Result<Account, AccountStoreError> {
        if self.script.lock().unwrap().pop_front().unwrap_or(false) {
            return Err(AccountStoreError::Unavailable("scripted failure".into()));
        }
        self.inner.save(account)
    }
}
