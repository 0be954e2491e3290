//! Binary entry point for running stress tests
//! Run with: cargo run --release --bin stress_test

use anyhow::Result;
use race_book::stress::{self, StressConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,race_book=debug")),
        )
        .init();

    println!("🏇 Race Book Stress Test");
    println!("========================\n");

    let config = StressConfig::from_env();
    println!("Configuration loaded:");
    println!("  - Shards: {}", config.num_shards);
    println!("  - Races per shard: {}", config.races_per_shard);
    println!("  - Users per shard: {}", config.users_per_shard);
    println!("  - Bets per race: {}", config.bets_per_race);
    println!("  - Seed: {}\n", config.seed);

    let report = stress::run_stress_test(&config)?;

    println!(
        "\n✅ Stress test completed: {} bets, {} claims in {:.2?}",
        report.totals.bets_placed, report.totals.claims, report.duration
    );
    Ok(())
}
