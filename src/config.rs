//! Configuration management for the race book
//! Supports environment variables (and a `.env` file) with defaults for book and server parameters

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::ledger::AccountId;
use crate::odds::MAX_HOUSE_EDGE_BPS;

/// Configuration for the race book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Book configuration
    pub book: BookConfig,
    /// HTTP service configuration
    pub server: ServerConfig,
}

/// Book-wide parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookConfig {
    /// The single privileged identity (default: "owner")
    pub owner: AccountId,

    /// House edge in basis points until the owner changes it (default: 250 = 2.5%)
    pub house_edge_bps: u32,

    /// Smallest accepted stake (default: 100)
    pub min_bet: u64,

    /// Largest accepted stake (default: 100_000)
    pub max_bet: u64,
}

/// Service parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (default: 0.0.0.0:3001)
    pub bind_addr: String,

    /// Where the book snapshot is persisted; `None` keeps state in memory only
    pub snapshot_path: Option<PathBuf>,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            owner: AccountId::from("owner"),
            house_edge_bps: 250,
            min_bet: 100,
            max_bet: 100_000,
        }
    }
}

impl BookConfig {
    pub fn with_owner(owner: impl Into<AccountId>) -> Self {
        Self {
            owner: owner.into(),
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3001".to_string(),
            snapshot_path: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            book: BookConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let mut config = Config::default();

        if let Ok(owner) = env::var("BOOK_OWNER") {
            if !owner.trim().is_empty() {
                config.book.owner = AccountId::from(owner.trim());
            }
        }

        if let Ok(edge) = env::var("BOOK_HOUSE_EDGE_BPS") {
            config.book.house_edge_bps = edge.parse().unwrap_or(config.book.house_edge_bps);
        }

        if let Ok(min_bet) = env::var("BOOK_MIN_BET") {
            config.book.min_bet = min_bet.parse().unwrap_or(config.book.min_bet);
        }

        if let Ok(max_bet) = env::var("BOOK_MAX_BET") {
            config.book.max_bet = max_bet.parse().unwrap_or(config.book.max_bet);
        }

        if let Ok(addr) = env::var("SERVER_BIND_ADDR") {
            config.server.bind_addr = addr;
        }

        if let Ok(path) = env::var("BOOK_SNAPSHOT_PATH") {
            if !path.is_empty() {
                config.server.snapshot_path = Some(PathBuf::from(path));
            }
        }

        config.validate();

        config
    }

    /// Validate configuration values
    fn validate(&mut self) {
        let defaults = BookConfig::default();

        if self.book.house_edge_bps > MAX_HOUSE_EDGE_BPS {
            warn!(
                house_edge_bps = self.book.house_edge_bps,
                "Invalid house edge, using default"
            );
            self.book.house_edge_bps = defaults.house_edge_bps;
        }

        // A zero minimum would let empty bets through
        if self.book.min_bet == 0 {
            warn!("Invalid min_bet 0, using default");
            self.book.min_bet = defaults.min_bet;
        }

        if self.book.max_bet < self.book.min_bet {
            warn!(
                min_bet = self.book.min_bet,
                max_bet = self.book.max_bet,
                "max_bet below min_bet, using defaults"
            );
            self.book.min_bet = defaults.min_bet;
            self.book.max_bet = defaults.max_bet;
        }
    }

    /// Log current configuration
    pub fn log_config(&self) {
        info!("🔧 Race Book Configuration:");
        info!("   Owner: {}", self.book.owner);
        info!("   House Edge: {} bps", self.book.house_edge_bps);
        info!("   Bet Limits: {} - {}", self.book.min_bet, self.book.max_bet);
        info!("   Bind Address: {}", self.server.bind_addr);
        match &self.server.snapshot_path {
            Some(path) => info!("   Snapshot: {}", path.display()),
            None => info!("   Snapshot: disabled (in-memory only)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_book_rules() {
        let config = Config::default();
        assert_eq!(config.book.house_edge_bps, 250);
        assert_eq!(config.book.min_bet, 100);
        assert_eq!(config.book.max_bet, 100_000);
        assert!(config.server.snapshot_path.is_none());
    }

    #[test]
    fn validate_repairs_out_of_range_values() {
        let mut config = Config::default();
        config.book.house_edge_bps = 5_000;
        config.book.min_bet = 0;
        config.validate();
        assert_eq!(config.book.house_edge_bps, 250);
        assert_eq!(config.book.min_bet, 100);

        let mut config = Config::default();
        config.book.min_bet = 500;
        config.book.max_bet = 10;
        config.validate();
        assert_eq!(config.book.min_bet, 100);
        assert_eq!(config.book.max_bet, 100_000);
    }
}
