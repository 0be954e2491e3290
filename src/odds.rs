//! src/odds.rs
//! Fixed-point pricing and payout math for the book.
//!
//! Odds are in hundredths (100 = 1.00x), house edge in basis points (10_000 = 100%).
//! Everything is integer math with explicit floor division; intermediates are widened to
//! u128 so no step can overflow before the final clamp back to u64.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 1.00x in odds units.
pub const ODDS_SCALE: u64 = 100;
/// Odds given to every racer when a race is created (2.00x).
pub const DEFAULT_ODDS: u64 = 200;
/// Odds never drop below 1.10x.
pub const MIN_ODDS: u64 = 110;
/// 100% in basis points.
pub const BPS_DENOMINATOR: u64 = 10_000;
/// Largest house edge the owner may configure (10%).
pub const MAX_HOUSE_EDGE_BPS: u32 = 1_000;

#[inline]
fn clamp_u64(x: u128) -> u64 {
    u64::try_from(x).unwrap_or(u64::MAX)
}

/// Payout frozen into a bet at placement: floor(amount * odds / 100).
#[inline]
pub fn potential_payout(amount: u64, odds: u64) -> u64 {
    clamp_u64(amount as u128 * odds as u128 / ODDS_SCALE as u128)
}

/// Pari-mutuel style reprice of one racer after its totals were updated:
/// max(110, floor(total_pool * 100 / max(1, racer_total))).
#[inline]
pub fn recalc_odds(total_pool: u64, racer_total: u64) -> u64 {
    let raw = total_pool as u128 * ODDS_SCALE as u128 / racer_total.max(1) as u128;
    clamp_u64(raw).max(MIN_ODDS)
}

/// Operator's share of the pool at settlement: floor(total_pool * bps / 10000).
#[inline]
pub fn house_take(total_pool: u64, house_edge_bps: u32) -> u64 {
    clamp_u64(total_pool as u128 * house_edge_bps as u128 / BPS_DENOMINATOR as u128)
}

/// How a bet is settled against the finishing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetType {
    /// Pays in full on 1st place.
    Win,
    /// Pays half on 1st or 2nd, or when left out of the finishing order.
    Place,
    /// Pays a third on 1st to 3rd, or when left out of the finishing order.
    Show,
}

impl BetType {
    /// Worst finishing position that still pays.
    pub fn paying_positions(&self) -> u32 {
        match self {
            BetType::Win => 1,
            BetType::Place => 2,
            BetType::Show => 3,
        }
    }

    /// Divisor applied to the frozen potential payout.
    pub fn payout_divisor(&self) -> u64 {
        match self {
            BetType::Win => 1,
            BetType::Place => 2,
            BetType::Show => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BetType::Win => "win",
            BetType::Place => "place",
            BetType::Show => "show",
        }
    }
}

impl FromStr for BetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "win" => Ok(BetType::Win),
            "place" => Ok(BetType::Place),
            "show" => Ok(BetType::Show),
            _ => Err(format!(
                "Invalid bet type: '{}', expected 'win', 'place' or 'show'",
                s
            )),
        }
    }
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amount owed on a claim. `finish_position` is 1-based, and a racer left out of the
/// finishing order keeps 0: that never wins, but it is within Place and Show range.
#[inline]
pub fn settle_payout(bet_type: BetType, potential_payout: u64, finish_position: u32) -> u64 {
    let pays = match bet_type {
        BetType::Win => finish_position == 1,
        BetType::Place | BetType::Show => finish_position <= bet_type.paying_positions(),
    };
    if !pays {
        return 0;
    }
    potential_payout / bet_type.payout_divisor()
}

// -----------------------
// Tests
// -----------------------
