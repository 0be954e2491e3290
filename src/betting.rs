//! Bet placement and per-racer odds repricing.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::book::Book;
use crate::error::{BookError, BookResult};
use crate::ledger::AccountId;
use crate::odds::{potential_payout, recalc_odds, BetType};
use crate::race::{RaceId, RaceStatus};
use crate::store::{IdKind, Store};

pub type BetId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub id: BetId,
    pub race_id: RaceId,
    pub bettor: AccountId,
    pub racer_index: u32,
    pub amount: u64,
    /// Frozen at placement from the odds in effect before this bet.
    pub potential_payout: u64,
    pub bet_type: BetType,
    pub claimed: bool,
}

impl<S: Store> Book<S> {
    /// Stake `amount` from the caller's balance on one racer of an open race.
    ///
    /// Checks run in a fixed order and the first failure is reported: race exists, race is
    /// open, racer exists, amount within limits, balance covers the stake.
    pub fn place_bet(
        &mut self,
        caller: &AccountId,
        race_id: RaceId,
        racer_index: u32,
        amount: u64,
        bet_type: BetType,
    ) -> BookResult<BetId> {
        let mut race = self.store.race(race_id).ok_or(BookError::RaceNotFound)?;
        if race.status != RaceStatus::Open {
            return Err(BookError::RaceAlreadyStarted);
        }
        let mut racer = self
            .store
            .racer(race_id, racer_index)
            .ok_or(BookError::InvalidRacer)?;
        if amount < self.config.min_bet || amount > self.config.max_bet {
            return Err(BookError::InvalidBet);
        }
        if self.store.balance(caller) < amount {
            return Err(BookError::InsufficientFunds);
        }

        self.debit(caller, amount)?;

        let payout = potential_payout(amount, racer.odds);
        let bet_id = self.store.next_id(IdKind::Bet);
        self.store.put_bet(Bet {
            id: bet_id,
            race_id,
            bettor: caller.clone(),
            racer_index,
            amount,
            potential_payout: payout,
            bet_type,
            claimed: false,
        });

        racer.total_bets = racer.total_bets.saturating_add(amount);
        race.total_pool = race.total_pool.saturating_add(amount);
        self.store.push_user_bet(caller, race_id, bet_id);

        // Only this racer is repriced; the others keep their last odds.
        if race.total_pool > 0 {
            racer.odds = recalc_odds(race.total_pool, racer.total_bets);
        }

        debug!(
            bet_id,
            race_id,
            racer_index,
            amount,
            potential_payout = payout,
            new_odds = racer.odds,
            bet_type = bet_type.as_str(),
            "bet placed"
        );

        self.store.put_racer(race_id, racer_index, racer);
        self.store.put_race(race);
        Ok(bet_id)
    }

    pub fn bet_of(&self, bet_id: BetId) -> Option<Bet> {
        self.store.bet(bet_id)
    }

    /// Bet ids the account placed on a race, oldest first.
    pub fn user_bets_of(&self, account: &AccountId, race_id: RaceId) -> Vec<BetId> {
        self.store.user_bets(account, race_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BookConfig;
    use proptest::prelude::*;

    fn setup() -> (Book, AccountId, RaceId) {
        let config = BookConfig::with_owner("owner");
        let owner = config.owner.clone();
        let mut book = Book::in_memory(config);
        let racers: Vec<String> = ["Lightning", "Thunder", "Storm"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let race_id = book.create_race(&owner, "Test Race", &racers, 100, 1000).unwrap();
        book.deposit(&AccountId::from("user1"), 5000).unwrap();
        book.deposit(&AccountId::from("user2"), 3000).unwrap();
        (book, owner, race_id)
    }

    #[test]
    fn valid_bet_debits_and_records() {
        let (mut book, _, race_id) = setup();
        let user1 = AccountId::from("user1");

        let bet_id = book.place_bet(&user1, race_id, 0, 500, BetType::Win).unwrap();
        assert_eq!(bet_id, 1);

        let bet = book.bet_of(bet_id).unwrap();
        assert_eq!(bet.amount, 500);
        assert_eq!(bet.bet_type, BetType::Win);
        assert_eq!(bet.bettor, user1);
        assert_eq!(bet.potential_payout, 1000); // 500 at the opening 2.00x
        assert!(!bet.claimed);

        assert_eq!(book.balance_of(&user1), 4500);
        assert_eq!(book.race_of(race_id).unwrap().total_pool, 500);
        // sole backer of the pool: 1.00x floored to 1.10x
        assert_eq!(book.current_odds_of(race_id, 0), Some(110));
    }

    #[test]
    fn pool_and_racer_totals_accumulate() {
        let (mut book, _, race_id) = setup();
        book.place_bet(&AccountId::from("user1"), race_id, 0, 500, BetType::Win).unwrap();
        book.place_bet(&AccountId::from("user2"), race_id, 1, 300, BetType::Win).unwrap();

        assert_eq!(book.race_of(race_id).unwrap().total_pool, 800);
        assert_eq!(book.racer_of(race_id, 0).unwrap().total_bets, 500);
        assert_eq!(book.racer_of(race_id, 1).unwrap().total_bets, 300);
        // racer 1 repriced against the whole pool, racer 0 left stale
        assert_eq!(book.current_odds_of(race_id, 1), Some(266));
        assert_eq!(book.current_odds_of(race_id, 0), Some(110));
        assert_eq!(book.current_odds_of(race_id, 2), Some(200));
    }

    #[test]
    fn payout_frozen_at_pre_bet_odds() {
        let (mut book, _, race_id) = setup();
        book.place_bet(&AccountId::from("user1"), race_id, 0, 1000, BetType::Win).unwrap();
        // racer 1 still at 2.00x
        let bet_id = book
            .place_bet(&AccountId::from("user2"), race_id, 1, 500, BetType::Place)
            .unwrap();
        assert_eq!(book.bet_of(bet_id).unwrap().potential_payout, 1000);
        // 1500 pool / 500 on racer 1
        assert_eq!(book.current_odds_of(race_id, 1), Some(300));

        let again = book
            .place_bet(&AccountId::from("user2"), race_id, 1, 200, BetType::Win)
            .unwrap();
        assert_eq!(book.bet_of(again).unwrap().potential_payout, 600);
        assert_eq!(book.bet_of(bet_id).unwrap().potential_payout, 1000);
    }

    #[test]
    fn user_bets_tracked_in_order() {
        let (mut book, _, race_id) = setup();
        let user1 = AccountId::from("user1");
        book.place_bet(&user1, race_id, 0, 500, BetType::Win).unwrap();
        book.place_bet(&AccountId::from("user2"), race_id, 0, 500, BetType::Win).unwrap();
        book.place_bet(&user1, race_id, 1, 300, BetType::Place).unwrap();

        assert_eq!(book.user_bets_of(&user1, race_id), vec![1, 3]);
        assert!(book.user_bets_of(&user1, 999).is_empty());
    }

    #[test]
    fn validation_order() {
        let (mut book, owner, race_id) = setup();
        let user1 = AccountId::from("user1");
        let broke = AccountId::from("broke");

        assert_eq!(
            book.place_bet(&user1, 999, 0, 500, BetType::Win),
            Err(BookError::RaceNotFound)
        );
        // bad racer and bad amount: racer is checked first
        assert_eq!(
            book.place_bet(&user1, race_id, 7, 1, BetType::Win),
            Err(BookError::InvalidRacer)
        );
        assert_eq!(
            book.place_bet(&user1, race_id, 0, 50, BetType::Win),
            Err(BookError::InvalidBet)
        );
        assert_eq!(
            book.place_bet(&user1, race_id, 0, 200_000, BetType::Win),
            Err(BookError::InvalidBet)
        );
        // out of range and unfunded: limits are checked first
        assert_eq!(
            book.place_bet(&broke, race_id, 0, 50, BetType::Win),
            Err(BookError::InvalidBet)
        );
        assert_eq!(
            book.place_bet(&user1, race_id, 0, 6000, BetType::Win),
            Err(BookError::InsufficientFunds)
        );

        book.start_race(&owner, race_id).unwrap();
        assert_eq!(
            book.place_bet(&user1, race_id, 7, 50, BetType::Win),
            Err(BookError::RaceAlreadyStarted)
        );
    }

    #[test]
    fn failed_bet_leaves_state_untouched() {
        let (mut book, _, race_id) = setup();
        let user1 = AccountId::from("user1");
        let before = book.store().snapshot();

        assert!(book.place_bet(&user1, race_id, 0, 6000, BetType::Win).is_err());
        assert!(book.place_bet(&user1, race_id, 9, 500, BetType::Win).is_err());

        assert_eq!(book.store().snapshot(), before);
    }

    #[test]
    fn limits_are_inclusive() {
        let (mut book, _, race_id) = setup();
        let user1 = AccountId::from("user1");
        book.deposit(&user1, 100_000).unwrap();
        assert!(book.place_bet(&user1, race_id, 0, 100, BetType::Show).is_ok());
        assert!(book.place_bet(&user1, race_id, 1, 100_000, BetType::Show).is_ok());
    }

    #[test]
    fn bets_rejected_on_cancelled_race() {
        let (mut book, owner, race_id) = setup();
        book.cancel_race(&owner, race_id).unwrap();
        assert_eq!(
            book.place_bet(&AccountId::from("user1"), race_id, 0, 500, BetType::Win),
            Err(BookError::RaceAlreadyStarted)
        );
    }

    proptest! {
        #[test]
        fn pool_and_odds_invariants_hold(
            bets in prop::collection::vec((0u8..4, 0u32..3, 50u64..3000, 0u8..3), 1..40),
        ) {
            let (mut book, _, race_id) = setup();
            let bettors: Vec<AccountId> = (0..4).map(|i| AccountId::new(format!("bettor{}", i))).collect();
            for bettor in &bettors {
                book.deposit(bettor, 20_000).unwrap();
            }

            for (who, racer, amount, kind) in bets {
                let bet_type = match kind { 0 => BetType::Win, 1 => BetType::Place, _ => BetType::Show };
                let _ = book.place_bet(&bettors[who as usize], race_id, racer, amount, bet_type);

                let placed: Vec<Bet> = book.store().bets().cloned().collect();
                let race = book.race_of(race_id).unwrap();
                prop_assert_eq!(race.total_pool, placed.iter().map(|b| b.amount).sum::<u64>());
                for index in 0..3u32 {
                    let racer = book.racer_of(race_id, index).unwrap();
                    let on_racer: u64 = placed.iter().filter(|b| b.racer_index == index).map(|b| b.amount).sum();
                    prop_assert_eq!(racer.total_bets, on_racer);
                    prop_assert!(racer.odds >= 110);
                }
            }
        }
    }
}
