//! Randomised stress simulation for the race book
//!
//! This module exercises:
//! 1. **Correctness**: bet validation, odds repricing, finishing and claim settlement
//! 2. **Financial Invariants**: no funds appear or vanish outside deposits, stakes and payouts
//! 3. **Performance**: operations per second across many independent book shards
//!
//! Shards are independent books, so they run in parallel with rayon. Each shard is seeded
//! from the base seed, which makes a run reproducible.

use anyhow::{anyhow, ensure, Result};
use rand::prelude::*;
use rayon::prelude::*;
use std::env;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::book::Book;
use crate::config::BookConfig;
use crate::error::BookError;
use crate::ledger::AccountId;
use crate::odds::{BetType, MAX_HOUSE_EDGE_BPS, MIN_ODDS};
use crate::race::{RaceId, RaceStatus};
use crate::store::MemoryStore;

// Simulation Parameters (defaults; override via STRESS_* env vars)
const NUM_SHARDS: usize = 16;
const RACES_PER_SHARD: usize = 200;
const USERS_PER_SHARD: usize = 50;
const BETS_PER_RACE: usize = 40;
const INITIAL_DEPOSIT: u64 = 50_000;
const CANCEL_PROBABILITY: f64 = 0.1;
const WITHDRAW_PROBABILITY: f64 = 0.05;
const DEFAULT_SEED: u64 = 0x5eed;

#[derive(Debug, Clone)]
pub struct StressConfig {
    pub num_shards: usize,
    pub races_per_shard: usize,
    pub users_per_shard: usize,
    pub bets_per_race: usize,
    pub cancel_probability: f64,
    pub withdraw_probability: f64,
    pub seed: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            num_shards: NUM_SHARDS,
            races_per_shard: RACES_PER_SHARD,
            users_per_shard: USERS_PER_SHARD,
            bets_per_race: BETS_PER_RACE,
            cancel_probability: CANCEL_PROBABILITY,
            withdraw_probability: WITHDRAW_PROBABILITY,
            seed: DEFAULT_SEED,
        }
    }
}

impl StressConfig {
    pub fn from_env() -> Self {
        Self {
            num_shards: env_usize("STRESS_NUM_SHARDS", NUM_SHARDS),
            races_per_shard: env_usize("STRESS_RACES_PER_SHARD", RACES_PER_SHARD),
            users_per_shard: env_usize("STRESS_USERS_PER_SHARD", USERS_PER_SHARD),
            bets_per_race: env_usize("STRESS_BETS_PER_RACE", BETS_PER_RACE),
            cancel_probability: env_f64_clamped(
                "STRESS_CANCEL_PROBABILITY",
                CANCEL_PROBABILITY,
                0.0,
                1.0,
            ),
            withdraw_probability: env_f64_clamped(
                "STRESS_WITHDRAW_PROBABILITY",
                WITHDRAW_PROBABILITY,
                0.0,
                1.0,
            ),
            seed: env_u64("STRESS_SEED", DEFAULT_SEED),
        }
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(default)
}

fn env_f64_clamped(name: &str, default: f64, min: f64, max: f64) -> f64 {
    env_f64(name, default).clamp(min, max)
}

/// Money and operation counts for one shard (or, summed, for the whole run).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShardTotals {
    pub deposited: u64,
    pub withdrawn: u64,
    pub staked: u64,
    pub paid_out: u64,
    pub house_take: u64,
    pub bets_placed: u64,
    pub bets_rejected: u64,
    pub claims: u64,
    pub winning_claims: u64,
    pub races_finished: u64,
    pub races_cancelled: u64,
    /// Finished races whose claims paid out more than `total_pool - house_take`
    pub races_over_pool: u64,
}

impl ShardTotals {
    fn absorb(&mut self, other: &ShardTotals) {
        self.deposited += other.deposited;
        self.withdrawn += other.withdrawn;
        self.staked += other.staked;
        self.paid_out += other.paid_out;
        self.house_take += other.house_take;
        self.bets_placed += other.bets_placed;
        self.bets_rejected += other.bets_rejected;
        self.claims += other.claims;
        self.winning_claims += other.winning_claims;
        self.races_finished += other.races_finished;
        self.races_cancelled += other.races_cancelled;
        self.races_over_pool += other.races_over_pool;
    }

    fn operations(&self) -> u64 {
        self.bets_placed + self.bets_rejected + self.claims + self.races_finished + self.races_cancelled
    }
}

#[derive(Debug, Clone)]
pub struct StressReport {
    pub shards: usize,
    pub totals: ShardTotals,
    pub duration: Duration,
}

impl StressReport {
    pub fn ops_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.totals.operations() as f64 / secs
        } else {
            0.0
        }
    }
}

/// Run every shard, verify each one, and aggregate the results.
pub fn run_stress_test(config: &StressConfig) -> Result<StressReport> {
    info!("🚀 Starting race book simulation...");
    info!(
        "   {} shards x {} races, {} users per shard, {} bets per race",
        config.num_shards, config.races_per_shard, config.users_per_shard, config.bets_per_race
    );

    let start = Instant::now();
    let shard_totals = (0..config.num_shards)
        .into_par_iter()
        .map(|shard| simulate_shard(shard, config))
        .collect::<Result<Vec<_>>>()?;
    let duration = start.elapsed();

    let mut totals = ShardTotals::default();
    for shard in &shard_totals {
        totals.absorb(shard);
    }

    let report = StressReport {
        shards: config.num_shards,
        totals,
        duration,
    };

    info!("\n🏁 Simulation finished in {:.2?}", report.duration);
    info!("✅ Financial invariants maintained in every shard.");
    info!("\n📊 Stress Test Summary:");
    info!(
        "   - Races: {} finished, {} cancelled",
        report.totals.races_finished, report.totals.races_cancelled
    );
    info!(
        "   - Bets: {} placed, {} rejected",
        report.totals.bets_placed, report.totals.bets_rejected
    );
    info!(
        "   - Claims: {} ({} paying)",
        report.totals.claims, report.totals.winning_claims
    );
    info!(
        "   - Staked {} / paid out {} / house take {}",
        report.totals.staked, report.totals.paid_out, report.totals.house_take
    );
    if report.totals.races_over_pool > 0 {
        warn!(
            "   - {} races paid out more than pool minus house take",
            report.totals.races_over_pool
        );
    }
    info!("   - Throughput: {:.2} ops/second", report.ops_per_second());

    Ok(report)
}

fn random_bet_type(rng: &mut StdRng) -> BetType {
    match rng.gen_range(0..3) {
        0 => BetType::Win,
        1 => BetType::Place,
        _ => BetType::Show,
    }
}

/// Simulate one independent book and verify its invariants.
fn simulate_shard(shard: usize, config: &StressConfig) -> Result<ShardTotals> {
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(shard as u64));
    let book_config = BookConfig::with_owner("owner");
    let owner = book_config.owner.clone();
    let (min_bet, max_bet) = (book_config.min_bet, book_config.max_bet);
    let mut book = Book::in_memory(book_config);
    let mut totals = ShardTotals::default();

    book.set_house_edge(&owner, rng.gen_range(0..=MAX_HOUSE_EDGE_BPS))
        .map_err(|e| anyhow!("shard {}: set_house_edge failed: {}", shard, e))?;

    let users: Vec<AccountId> = (0..config.users_per_shard)
        .map(|i| AccountId::new(format!("shard{}-user{}", shard, i)))
        .collect();
    for user in &users {
        totals.deposited += book
            .deposit(user, INITIAL_DEPOSIT)
            .map_err(|e| anyhow!("shard {}: deposit failed: {}", shard, e))?;
    }

    let mut race_ids: Vec<RaceId> = Vec::with_capacity(config.races_per_shard);
    for race_number in 0..config.races_per_shard {
        let field_size = rng.gen_range(2..=8usize);
        let racers: Vec<String> = (0..field_size).map(|i| format!("Racer {}", i)).collect();
        let race_id = book
            .create_race(
                &owner,
                &format!("Race {}", race_number),
                &racers,
                100,
                race_number as u64,
            )
            .map_err(|e| anyhow!("shard {}: create_race failed: {}", shard, e))?;
        race_ids.push(race_id);

        for _ in 0..config.bets_per_race {
            let user = &users[rng.gen_range(0..users.len())];
            // Some bets are deliberately out of range or on a missing racer
            let racer_index = rng.gen_range(0..=field_size as u32);
            let amount = rng.gen_range(min_bet / 2..=max_bet / 10);
            let bet_type = random_bet_type(&mut rng);

            match book.place_bet(user, race_id, racer_index, amount, bet_type) {
                Ok(_) => {
                    totals.bets_placed += 1;
                    totals.staked += amount;
                }
                Err(BookError::InvalidRacer | BookError::InvalidBet | BookError::InsufficientFunds) => {
                    totals.bets_rejected += 1;
                }
                Err(e) => return Err(anyhow!("shard {}: unexpected bet error: {}", shard, e)),
            }

            if rng.gen_bool(config.withdraw_probability) {
                let balance = book.balance_of(user);
                let amount = rng.gen_range(0..=balance / 4);
                totals.withdrawn += book
                    .withdraw(user, amount)
                    .map_err(|e| anyhow!("shard {}: withdraw failed: {}", shard, e))?;
            }
        }

        if rng.gen_bool(config.cancel_probability) {
            book.cancel_race(&owner, race_id)
                .map_err(|e| anyhow!("shard {}: cancel failed: {}", shard, e))?;
            totals.races_cancelled += 1;
            continue;
        }

        book.start_race(&owner, race_id)
            .map_err(|e| anyhow!("shard {}: start failed: {}", shard, e))?;
        let mut order: Vec<u32> = (0..field_size as u32).collect();
        order.shuffle(&mut rng);
        book.finish_race(&owner, race_id, &order)
            .map_err(|e| anyhow!("shard {}: finish failed: {}", shard, e))?;
        totals.races_finished += 1;
    }

    for &race_id in &race_ids {
        let race = book
            .race_of(race_id)
            .ok_or_else(|| anyhow!("shard {}: race {} vanished", shard, race_id))?;
        let mut race_paid = 0u64;

        for user in &users {
            for bet_id in book.user_bets_of(user, race_id) {
                match book.claim_winnings(user, bet_id) {
                    Ok(payout) => {
                        totals.claims += 1;
                        race_paid += payout;
                        if payout > 0 {
                            totals.winning_claims += 1;
                        }
                        ensure!(
                            book.claim_winnings(user, bet_id) == Err(BookError::AlreadyClaimed),
                            "shard {}: bet {} claimed twice",
                            shard,
                            bet_id
                        );
                    }
                    Err(BookError::RaceNotEnded) if race.status == RaceStatus::Cancelled => {}
                    Err(e) => return Err(anyhow!("shard {}: claim {} failed: {}", shard, bet_id, e)),
                }
            }
        }

        if race.status == RaceStatus::Finished {
            totals.house_take += race.house_take;
            if race_paid > race.total_pool.saturating_sub(race.house_take) {
                totals.races_over_pool += 1;
            }
        }
        totals.paid_out += race_paid;
    }

    verify_shard(shard, &book, &totals)?;
    debug!(shard, ?totals, "shard verified");
    Ok(totals)
}

/// Check the book's records against themselves and against the money that moved.
fn verify_shard(shard: usize, book: &Book<MemoryStore>, totals: &ShardTotals) -> Result<()> {
    let store = book.store();

    for race in store.races() {
        let bets: Vec<_> = store.bets().filter(|b| b.race_id == race.id).collect();
        let pool: u64 = bets.iter().map(|b| b.amount).sum();
        ensure!(
            race.total_pool == pool,
            "shard {}: race {} pool {} != bets {}",
            shard,
            race.id,
            race.total_pool,
            pool
        );

        for index in 0..race.racers.len() as u32 {
            let Some(racer) = book.racer_of(race.id, index) else {
                continue;
            };
            let on_racer: u64 = bets
                .iter()
                .filter(|b| b.racer_index == index)
                .map(|b| b.amount)
                .sum();
            ensure!(
                racer.total_bets == on_racer,
                "shard {}: race {} racer {} totals {} != bets {}",
                shard,
                race.id,
                index,
                racer.total_bets,
                on_racer
            );
            ensure!(
                racer.odds >= MIN_ODDS,
                "shard {}: race {} racer {} odds {} below floor",
                shard,
                race.id,
                index,
                racer.odds
            );
        }

        for bet in &bets {
            let expect_claimed = race.status == RaceStatus::Finished;
            ensure!(
                bet.claimed == expect_claimed,
                "shard {}: bet {} claimed={} on {} race",
                shard,
                bet.id,
                bet.claimed,
                race.status.as_str()
            );
        }
    }

    let balances: u64 = store.balances().map(|(_, amount)| amount).sum();
    let expected = totals.deposited - totals.withdrawn - totals.staked + totals.paid_out;
    ensure!(
        balances == expected,
        "shard {}: balances {} != deposits {} - withdrawals {} - stakes {} + payouts {}",
        shard,
        balances,
        totals.deposited,
        totals.withdrawn,
        totals.staked,
        totals.paid_out
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> StressConfig {
        StressConfig {
            num_shards: 3,
            races_per_shard: 12,
            users_per_shard: 8,
            bets_per_race: 15,
            cancel_probability: 0.25,
            withdraw_probability: 0.1,
            seed: 42,
        }
    }

    #[test]
    fn small_simulation_keeps_invariants() {
        let report = run_stress_test(&small_config()).unwrap();
        let totals = &report.totals;

        assert_eq!(report.shards, 3);
        assert_eq!(totals.races_finished + totals.races_cancelled, 36);
        assert_eq!(totals.bets_placed + totals.bets_rejected, 36 * 15);
        assert!(totals.bets_placed > 0);
        assert_eq!(totals.deposited, 3 * 8 * INITIAL_DEPOSIT);
    }

    #[test]
    fn same_seed_same_outcome() {
        let a = run_stress_test(&small_config()).unwrap();
        let b = run_stress_test(&small_config()).unwrap();
        assert_eq!(a.totals, b.totals);
    }
}
