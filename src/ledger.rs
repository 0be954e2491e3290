//! Per-account balances: deposit, withdraw and balance lookup.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::book::Book;
use crate::error::{BookError, BookResult};
use crate::store::Store;

/// Already-authenticated caller identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Store> Book<S> {
    /// Credit `amount` to the caller. Returns the amount credited.
    pub fn deposit(&mut self, caller: &AccountId, amount: u64) -> BookResult<u64> {
        if amount == 0 {
            return Err(BookError::InvalidAmount);
        }
        let balance = self
            .store
            .balance(caller)
            .checked_add(amount)
            .ok_or(BookError::InvalidAmount)?;

        self.store.set_balance(caller, balance);
        debug!(account = %caller, amount, balance, "deposit");
        Ok(amount)
    }

    /// Debit `amount` from the caller. Returns the amount withdrawn.
    pub fn withdraw(&mut self, caller: &AccountId, amount: u64) -> BookResult<u64> {
        let balance = self.store.balance(caller);
        if balance < amount {
            return Err(BookError::InsufficientFunds);
        }

        self.store.set_balance(caller, balance - amount);
        debug!(account = %caller, amount, balance = balance - amount, "withdraw");
        Ok(amount)
    }

    pub fn balance_of(&self, account: &AccountId) -> u64 {
        self.store.balance(account)
    }

    pub(crate) fn debit(&mut self, account: &AccountId, amount: u64) -> BookResult<()> {
        let balance = self.store.balance(account);
        let remaining = balance
            .checked_sub(amount)
            .ok_or(BookError::InsufficientFunds)?;
        self.store.set_balance(account, remaining);
        Ok(())
    }

    pub(crate) fn credit(&mut self, account: &AccountId, amount: u64) {
        let balance = self.store.balance(account).saturating_add(amount);
        self.store.set_balance(account, balance);
    }
}
