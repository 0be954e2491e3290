//! Race Book Library
//!
//! Pari-mutuel style wagering ledger for racing events: account balances, race lifecycle,
//! bet placement with live odds, settlement and claims.

// Re-export modules for use in binaries
pub mod admin;
pub mod api;
pub mod betting;
pub mod book;
pub mod config;
pub mod error;
pub mod ledger;
pub mod odds;
pub mod persistence;
pub mod race;
pub mod settlement;
pub mod store;
pub mod stress;


pub use betting::{Bet, BetId};
pub use book::Book;
pub use config::{BookConfig, Config};
pub use error::{BookError, BookResult};
pub use ledger::AccountId;
pub use odds::BetType;
pub use race::{Race, RaceId, RaceStatus, Racer};
pub use store::{MemoryStore, Snapshot, Store};
