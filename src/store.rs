//! Storage seam for the book.
//!
//! The engine only ever reads and writes whole records by key through [`Store`], so the
//! host can back it with anything that commits atomically. [`MemoryStore`] is the in-process
//! implementation used by the service, the stress simulation and the tests.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::betting::{Bet, BetId};
use crate::ledger::AccountId;
use crate::race::{Race, RaceId, Racer};

/// Monotonic id sequences kept by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Race,
    Bet,
}

/// Keyed record storage. Reads return owned copies; missing keys are `None`/empty/zero.
pub trait Store {
    fn balance(&self, account: &AccountId) -> u64;
    fn set_balance(&mut self, account: &AccountId, amount: u64);

    fn race(&self, race_id: RaceId) -> Option<Race>;
    fn put_race(&mut self, race: Race);

    fn racer(&self, race_id: RaceId, index: u32) -> Option<Racer>;
    fn put_racer(&mut self, race_id: RaceId, index: u32, racer: Racer);

    fn bet(&self, bet_id: BetId) -> Option<Bet>;
    fn put_bet(&mut self, bet: Bet);

    fn user_bets(&self, account: &AccountId, race_id: RaceId) -> Vec<BetId>;
    fn push_user_bet(&mut self, account: &AccountId, race_id: RaceId, bet_id: BetId);

    fn race_results(&self, race_id: RaceId) -> Option<Vec<u32>>;
    fn put_race_results(&mut self, race_id: RaceId, final_positions: Vec<u32>);

    fn last_id(&self, kind: IdKind) -> u64;
    fn set_last_id(&mut self, kind: IdKind, id: u64);

    fn house_edge(&self) -> Option<u32>;
    fn set_house_edge(&mut self, bps: u32);

    /// Advance a sequence and return the new id. Ids start at 1.
    fn next_id(&mut self, kind: IdKind) -> u64 {
        let id = self.last_id(kind) + 1;
        self.set_last_id(kind, id);
        id
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    balances: HashMap<AccountId, u64>,
    races: HashMap<RaceId, Race>,
    racers: HashMap<(RaceId, u32), Racer>,
    bets: HashMap<BetId, Bet>,
    user_bets: HashMap<(AccountId, RaceId), Vec<BetId>>,
    race_results: HashMap<RaceId, Vec<u32>>,
    last_race_id: RaceId,
    last_bet_id: BetId,
    house_edge_bps: Option<u32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All balances, for invariant checks.
    pub fn balances(&self) -> impl Iterator<Item = (&AccountId, u64)> {
        self.balances.iter().map(|(k, v)| (k, *v))
    }

    pub fn bets(&self) -> impl Iterator<Item = &Bet> {
        self.bets.values()
    }

    pub fn races(&self) -> impl Iterator<Item = &Race> {
        self.races.values()
    }

    /// Serializable copy of every record. Entries are sorted so equal stores give equal snapshots.
    pub fn snapshot(&self) -> Snapshot {
        let mut balances: Vec<_> = self
            .balances
            .iter()
            .map(|(account, amount)| (account.clone(), *amount))
            .collect();
        balances.sort();

        let mut races: Vec<_> = self.races.values().cloned().collect();
        races.sort_by_key(|race| race.id);

        let mut racers: Vec<_> = self
            .racers
            .iter()
            .map(|(&(race_id, index), racer)| RacerEntry {
                race_id,
                index,
                racer: racer.clone(),
            })
            .collect();
        racers.sort_by_key(|entry| (entry.race_id, entry.index));

        let mut bets: Vec<_> = self.bets.values().cloned().collect();
        bets.sort_by_key(|bet| bet.id);

        let mut user_bets: Vec<_> = self
            .user_bets
            .iter()
            .map(|((account, race_id), bet_ids)| UserBetsEntry {
                account: account.clone(),
                race_id: *race_id,
                bet_ids: bet_ids.clone(),
            })
            .collect();
        user_bets.sort_by(|a, b| (&a.account, a.race_id).cmp(&(&b.account, b.race_id)));

        let mut race_results: Vec<_> = self
            .race_results
            .iter()
            .map(|(race_id, positions)| (*race_id, positions.clone()))
            .collect();
        race_results.sort();

        Snapshot {
            balances,
            races,
            racers,
            bets,
            user_bets,
            race_results,
            last_race_id: self.last_race_id,
            last_bet_id: self.last_bet_id,
            house_edge_bps: self.house_edge_bps,
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            balances: snapshot.balances.into_iter().collect(),
            races: snapshot
                .races
                .into_iter()
                .map(|race| (race.id, race))
                .collect(),
            racers: snapshot
                .racers
                .into_iter()
                .map(|entry| ((entry.race_id, entry.index), entry.racer))
                .collect(),
            bets: snapshot.bets.into_iter().map(|bet| (bet.id, bet)).collect(),
            user_bets: snapshot
                .user_bets
                .into_iter()
                .map(|entry| ((entry.account, entry.race_id), entry.bet_ids))
                .collect(),
            race_results: snapshot.race_results.into_iter().collect(),
            last_race_id: snapshot.last_race_id,
            last_bet_id: snapshot.last_bet_id,
            house_edge_bps: snapshot.house_edge_bps,
        }
    }
}

impl Store for MemoryStore {
    fn balance(&self, account: &AccountId) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn set_balance(&mut self, account: &AccountId, amount: u64) {
        self.balances.insert(account.clone(), amount);
    }

    fn race(&self, race_id: RaceId) -> Option<Race> {
        self.races.get(&race_id).cloned()
    }

    fn put_race(&mut self, race: Race) {
        self.races.insert(race.id, race);
    }

    fn racer(&self, race_id: RaceId, index: u32) -> Option<Racer> {
        self.racers.get(&(race_id, index)).cloned()
    }

    fn put_racer(&mut self, race_id: RaceId, index: u32, racer: Racer) {
        self.racers.insert((race_id, index), racer);
    }

    fn bet(&self, bet_id: BetId) -> Option<Bet> {
        self.bets.get(&bet_id).cloned()
    }

    fn put_bet(&mut self, bet: Bet) {
        self.bets.insert(bet.id, bet);
    }

    fn user_bets(&self, account: &AccountId, race_id: RaceId) -> Vec<BetId> {
        self.user_bets
            .get(&(account.clone(), race_id))
            .cloned()
            .unwrap_or_default()
    }

    fn push_user_bet(&mut self, account: &AccountId, race_id: RaceId, bet_id: BetId) {
        self.user_bets
            .entry((account.clone(), race_id))
            .or_default()
            .push(bet_id);
    }

    fn race_results(&self, race_id: RaceId) -> Option<Vec<u32>> {
        self.race_results.get(&race_id).cloned()
    }

    fn put_race_results(&mut self, race_id: RaceId, final_positions: Vec<u32>) {
        self.race_results.insert(race_id, final_positions);
    }

    fn last_id(&self, kind: IdKind) -> u64 {
        match kind {
            IdKind::Race => self.last_race_id,
            IdKind::Bet => self.last_bet_id,
        }
    }

    fn set_last_id(&mut self, kind: IdKind, id: u64) {
        match kind {
            IdKind::Race => self.last_race_id = id,
            IdKind::Bet => self.last_bet_id = id,
        }
    }

    fn house_edge(&self) -> Option<u32> {
        self.house_edge_bps
    }

    fn set_house_edge(&mut self, bps: u32) {
        self.house_edge_bps = Some(bps);
    }
}

/// Flat, JSON-friendly form of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub balances: Vec<(AccountId, u64)>,
    pub races: Vec<Race>,
    pub racers: Vec<RacerEntry>,
    pub bets: Vec<Bet>,
    pub user_bets: Vec<UserBetsEntry>,
    pub race_results: Vec<(RaceId, Vec<u32>)>,
    pub last_race_id: RaceId,
    pub last_bet_id: BetId,
    pub house_edge_bps: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RacerEntry {
    pub race_id: RaceId,
    pub index: u32,
    pub racer: Racer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBetsEntry {
    pub account: AccountId,
    pub race_id: RaceId,
    pub bet_ids: Vec<BetId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::RaceStatus;

    #[test]
    fn unknown_keys_default() {
        let store = MemoryStore::new();
        let alice = AccountId::from("alice");
        assert_eq!(store.balance(&alice), 0);
        assert!(store.race(1).is_none());
        assert!(store.racer(1, 0).is_none());
        assert!(store.bet(1).is_none());
        assert!(store.user_bets(&alice, 1).is_empty());
        assert!(store.race_results(1).is_none());
        assert_eq!(store.house_edge(), None);
    }

    #[test]
    fn sequences_are_independent_and_start_at_one() {
        let mut store = MemoryStore::new();
        assert_eq!(store.next_id(IdKind::Race), 1);
        assert_eq!(store.next_id(IdKind::Race), 2);
        assert_eq!(store.next_id(IdKind::Bet), 1);
        assert_eq!(store.last_id(IdKind::Race), 2);
    }

    #[test]
    fn user_bet_index_keeps_insertion_order() {
        let mut store = MemoryStore::new();
        let alice = AccountId::from("alice");
        store.push_user_bet(&alice, 1, 7);
        store.push_user_bet(&alice, 1, 3);
        store.push_user_bet(&alice, 2, 9);
        assert_eq!(store.user_bets(&alice, 1), vec![7, 3]);
        assert_eq!(store.user_bets(&alice, 2), vec![9]);
    }

    #[test]
    fn snapshot_restores_every_record() {
        let mut store = MemoryStore::new();
        let alice = AccountId::from("alice");
        store.set_balance(&alice, 900);
        let race_id = store.next_id(IdKind::Race);
        store.put_race(Race {
            id: race_id,
            name: "Derby".to_string(),
            racers: vec!["A".to_string(), "B".to_string()],
            start_time: 10,
            end_time: 110,
            status: RaceStatus::Finished,
            total_pool: 0,
            house_take: 0,
            winner: Some(1),
        });
        store.put_racer(race_id, 0, Racer::new("A"));
        store.push_user_bet(&alice, race_id, 4);
        store.put_race_results(race_id, vec![1, 0]);
        store.set_house_edge(300);

        let snapshot = store.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored = MemoryStore::from_snapshot(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.balance(&alice), 900);
        assert_eq!(restored.race(race_id).unwrap().winner, Some(1));
        assert_eq!(restored.user_bets(&alice, race_id), vec![4]);
        assert_eq!(restored.last_id(IdKind::Race), 1);
        assert_eq!(restored.house_edge(), Some(300));
    }
}
