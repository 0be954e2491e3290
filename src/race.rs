//! Race and racer records and the owner-gated lifecycle: create, start, cancel.
//!
//! Open -> Running -> Finished, with Cancelled reachable from Open or Running.
//! Finishing lives in `settlement`.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::book::Book;
use crate::error::{BookError, BookResult};
use crate::ledger::AccountId;
use crate::odds::DEFAULT_ODDS;
use crate::store::{IdKind, Store};

pub type RaceId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceStatus {
    Open,
    Running,
    Finished,
    Cancelled,
}

impl RaceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RaceStatus::Open => "open",
            RaceStatus::Running => "running",
            RaceStatus::Finished => "finished",
            RaceStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RaceStatus::Finished | RaceStatus::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Race {
    pub id: RaceId,
    pub name: String,
    /// Slot names in creation order; empty names occupy a slot but get no racer record.
    pub racers: Vec<String>,
    pub start_time: u64,
    pub end_time: u64,
    pub status: RaceStatus,
    /// Sum of every bet amount placed on this race.
    pub total_pool: u64,
    /// Set at finish.
    pub house_take: u64,
    /// Racer index in first place, once finished.
    pub winner: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Racer {
    pub name: String,
    /// Hundredths: 200 = 2.00x.
    pub odds: u64,
    pub total_bets: u64,
    /// 1-based; 0 until the race is finished.
    pub finish_position: u32,
}

impl Racer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            odds: DEFAULT_ODDS,
            total_bets: 0,
            finish_position: 0,
        }
    }
}

impl<S: Store> Book<S> {
    /// Open a new race. `now` is the host's current reference height.
    pub fn create_race(
        &mut self,
        caller: &AccountId,
        name: &str,
        racer_names: &[String],
        duration_blocks: u64,
        now: u64,
    ) -> BookResult<RaceId> {
        // Checked ahead of ownership: a short racer list is rejected for every caller.
        if racer_names.len() < 2 {
            return Err(BookError::InvalidRacerSet);
        }
        self.ensure_owner(caller)?;

        let race_id = self.store.next_id(IdKind::Race);
        self.store.put_race(Race {
            id: race_id,
            name: name.to_string(),
            racers: racer_names.to_vec(),
            start_time: now,
            end_time: now.saturating_add(duration_blocks),
            status: RaceStatus::Open,
            total_pool: 0,
            house_take: 0,
            winner: None,
        });

        for (index, racer_name) in racer_names.iter().enumerate() {
            if racer_name.is_empty() {
                continue;
            }
            self.store
                .put_racer(race_id, index as u32, Racer::new(racer_name.as_str()));
        }

        info!(race_id, race_name = name, racers = racer_names.len(), "race created");
        Ok(race_id)
    }

    /// Close betting: Open -> Running.
    pub fn start_race(&mut self, caller: &AccountId, race_id: RaceId) -> BookResult<()> {
        self.ensure_owner(caller)?;
        let mut race = self.store.race(race_id).ok_or(BookError::RaceNotFound)?;
        if race.status != RaceStatus::Open {
            return Err(BookError::RaceAlreadyStarted);
        }

        race.status = RaceStatus::Running;
        self.store.put_race(race);
        info!(race_id, "race started");
        Ok(())
    }

    /// Cancel an unfinished race. Bets already placed stay on the books unrefunded.
    pub fn cancel_race(&mut self, caller: &AccountId, race_id: RaceId) -> BookResult<()> {
        self.ensure_owner(caller)?;
        let mut race = self.store.race(race_id).ok_or(BookError::RaceNotFound)?;
        if race.status == RaceStatus::Finished {
            return Err(BookError::RaceEnded);
        }

        race.status = RaceStatus::Cancelled;
        self.store.put_race(race);
        info!(race_id, "race cancelled");
        Ok(())
    }

    pub fn race_of(&self, race_id: RaceId) -> Option<Race> {
        self.store.race(race_id)
    }

    pub fn racer_of(&self, race_id: RaceId, index: u32) -> Option<Racer> {
        self.store.racer(race_id, index)
    }

    pub fn current_odds_of(&self, race_id: RaceId, index: u32) -> Option<u64> {
        self.store.racer(race_id, index).map(|racer| racer.odds)
    }
}
