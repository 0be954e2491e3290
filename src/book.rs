//! The book: one explicit engine object owning its store and configuration.
//!
//! Mutating operations live next to the records they touch (`ledger`, `race`, `betting`,
//! `settlement`, `admin`) as further `impl` blocks on [`Book`]. Each of them validates fully
//! before writing anything, so a failed call leaves the store untouched.

use crate::config::BookConfig;
use crate::error::{BookError, BookResult};
use crate::ledger::AccountId;
use crate::store::{MemoryStore, Store};

pub struct Book<S: Store = MemoryStore> {
    pub(crate) store: S,
    pub(crate) config: BookConfig,
}

impl Book<MemoryStore> {
    /// Fresh book backed by an empty in-memory store.
    pub fn in_memory(config: BookConfig) -> Self {
        Self::new(config, MemoryStore::new())
    }
}

impl<S: Store> Book<S> {
    pub fn new(config: BookConfig, store: S) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub(crate) fn ensure_owner(&self, caller: &AccountId) -> BookResult<()> {
        if *caller != self.config.owner {
            return Err(BookError::NotOwner);
        }
        Ok(())
    }
}

impl<S: Store> std::fmt::Debug for Book<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Book")
            .field("owner", &self.config.owner)
            .field("house_edge_bps", &self.house_edge())
            .field("min_bet", &self.config.min_bet)
            .field("max_bet", &self.config.max_bet)
            .finish()
    }
}
