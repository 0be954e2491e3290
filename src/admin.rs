//! Owner-only book settings.

use tracing::info;

use crate::book::Book;
use crate::error::{BookError, BookResult};
use crate::ledger::AccountId;
use crate::odds::MAX_HOUSE_EDGE_BPS;
use crate::store::Store;

impl<S: Store> Book<S> {
    /// Change the house edge applied at the next finish. At most 1000 bps (10%).
    pub fn set_house_edge(&mut self, caller: &AccountId, house_edge_bps: u32) -> BookResult<()> {
        self.ensure_owner(caller)?;
        if house_edge_bps > MAX_HOUSE_EDGE_BPS {
            return Err(BookError::InvalidBet);
        }

        self.store.set_house_edge(house_edge_bps);
        info!(house_edge_bps, "house edge updated");
        Ok(())
    }

    /// House edge in effect, in basis points.
    pub fn house_edge(&self) -> u32 {
        self.store
            .house_edge()
            .unwrap_or(self.config.house_edge_bps)
    }
}
