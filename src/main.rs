use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use race_book::api::{self, AppState};
use race_book::persistence;
use race_book::{Book, Config, MemoryStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,race_book=debug")),
        )
        .init();

    info!("🏇 Starting Race Book...");

    let config = Config::from_env();
    config.log_config();

    let store = match &config.server.snapshot_path {
        Some(path) => match persistence::load_snapshot(path).await? {
            Some(snapshot) => {
                info!("📂 Restored book from {}", path.display());
                MemoryStore::from_snapshot(snapshot)
            }
            None => MemoryStore::new(),
        },
        None => MemoryStore::new(),
    };
    let book = Book::new(config.book.clone(), store);
    let app = api::router(AppState::new(book, config.server.snapshot_path.clone()));

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    info!("🚀 Server running on http://{}", config.server.bind_addr);
    info!("📊 Available endpoints:");
    info!("  GET  /health");
    info!("  GET  /balances/:account | POST /deposit | POST /withdraw");
    info!("  POST /races | /races/:race_id/start | /races/:race_id/finish | /races/:race_id/cancel");
    info!("  GET  /races/:race_id | /races/:race_id/results | /races/:race_id/racers/:index");
    info!("  POST /races/:race_id/bets | /bets/:bet_id/claim");
    info!("  GET  /bets/:bet_id | /races/:race_id/bets/:account");
    info!("  PUT  /admin/house-edge");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Race Book stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received");
}
