//! Error taxonomy for book operations.
//!
//! Every variant carries a stable numeric code so callers on the wire can match on it.
//! Some codes are shared between variants (e.g. `InvalidAmount` and `InvalidBet` are both 107).

use serde::{Deserialize, Serialize};

/// Result type for book operations
pub type BookResult<T> = Result<T, BookError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum BookError {
    #[error("caller is not the book owner")]
    NotOwner,

    #[error("bet not found")]
    BetNotFound,

    #[error("race not found")]
    RaceNotFound,

    #[error("race has already ended")]
    RaceEnded,

    #[error("race is not running")]
    RaceNotRunning,

    #[error("race has not ended")]
    RaceNotEnded,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("caller is not the bettor")]
    Unauthorized,

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("invalid bet")]
    InvalidBet,

    #[error("race has already started")]
    RaceAlreadyStarted,

    #[error("a race needs at least two racers")]
    InvalidRacerSet,

    #[error("racer not found")]
    InvalidRacer,

    #[error("bet already claimed")]
    AlreadyClaimed,
}

impl BookError {
    /// Numeric wire code.
    pub fn code(&self) -> u32 {
        match self {
            BookError::NotOwner => 100,
            BookError::BetNotFound => 101,
            BookError::RaceNotFound => 102,
            BookError::RaceEnded => 103,
            BookError::RaceNotRunning | BookError::RaceNotEnded => 104,
            BookError::InsufficientFunds => 105,
            BookError::Unauthorized => 106,
            BookError::InvalidAmount | BookError::InvalidBet => 107,
            BookError::RaceAlreadyStarted => 108,
            BookError::InvalidRacerSet | BookError::InvalidRacer => 110,
            BookError::AlreadyClaimed => 111,
        }
    }

    /// Variant name, used as the machine-readable error in API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookError::NotOwner => "not_owner",
            BookError::BetNotFound => "bet_not_found",
            BookError::RaceNotFound => "race_not_found",
            BookError::RaceEnded => "race_ended",
            BookError::RaceNotRunning => "race_not_running",
            BookError::RaceNotEnded => "race_not_ended",
            BookError::InsufficientFunds => "insufficient_funds",
            BookError::Unauthorized => "unauthorized",
            BookError::InvalidAmount => "invalid_amount",
            BookError::InvalidBet => "invalid_bet",
            BookError::RaceAlreadyStarted => "race_already_started",
            BookError::InvalidRacerSet => "invalid_racer_set",
            BookError::InvalidRacer => "invalid_racer",
            BookError::AlreadyClaimed => "already_claimed",
        }
    }
}
