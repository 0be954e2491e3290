//! Finishing a race and paying out claims.
//!
//! Payouts come from the potential payout frozen into each bet, scaled by bet type and the
//! racer's finishing position. They are not capped by `total_pool - house_take`: several
//! winning bet types on one race can together pay out more than the pool holds.

use tracing::{debug, info};

use crate::betting::BetId;
use crate::book::Book;
use crate::error::{BookError, BookResult};
use crate::ledger::AccountId;
use crate::odds::{house_take, settle_payout};
use crate::race::{RaceId, RaceStatus};
use crate::store::Store;

impl<S: Store> Book<S> {
    /// Record the finishing order of a running race. `final_positions[0]` is the winner.
    pub fn finish_race(
        &mut self,
        caller: &AccountId,
        race_id: RaceId,
        final_positions: &[u32],
    ) -> BookResult<()> {
        self.ensure_owner(caller)?;
        let mut race = self.store.race(race_id).ok_or(BookError::RaceNotFound)?;
        if race.status != RaceStatus::Running {
            return Err(BookError::RaceNotRunning);
        }

        let take = house_take(race.total_pool, self.house_edge());
        race.status = RaceStatus::Finished;
        race.winner = final_positions.first().copied();
        race.house_take = take;

        for (position, &racer_index) in final_positions.iter().enumerate() {
            // Indices without a racer record are ignored
            if let Some(mut racer) = self.store.racer(race_id, racer_index) {
                racer.finish_position = position as u32 + 1;
                self.store.put_racer(race_id, racer_index, racer);
            }
        }

        self.store.put_race_results(race_id, final_positions.to_vec());
        info!(
            race_id,
            winner = ?race.winner,
            total_pool = race.total_pool,
            house_take = take,
            "race finished"
        );
        self.store.put_race(race);
        Ok(())
    }

    /// Settle one bet for its bettor. A losing bet settles for 0 and is still marked claimed.
    pub fn claim_winnings(&mut self, caller: &AccountId, bet_id: BetId) -> BookResult<u64> {
        let mut bet = self.store.bet(bet_id).ok_or(BookError::BetNotFound)?;
        if bet.bettor != *caller {
            return Err(BookError::Unauthorized);
        }
        if bet.claimed {
            return Err(BookError::AlreadyClaimed);
        }
        match self.store.race(bet.race_id) {
            Some(race) if race.status == RaceStatus::Finished => {}
            _ => return Err(BookError::RaceNotEnded),
        }
        let racer = self
            .store
            .racer(bet.race_id, bet.racer_index)
            .ok_or(BookError::InvalidRacer)?;

        let payout = settle_payout(bet.bet_type, bet.potential_payout, racer.finish_position);

        bet.claimed = true;
        self.store.put_bet(bet);
        if payout > 0 {
            self.credit(caller, payout);
        }

        debug!(bet_id, account = %caller, payout, "winnings claimed");
        Ok(payout)
    }

    /// Finishing order recorded for a race, if it has finished.
    pub fn race_results_of(&self, race_id: RaceId) -> Option<Vec<u32>> {
        self.store.race_results(race_id)
    }
}
