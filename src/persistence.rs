//! JSON snapshot files standing in for host persistence.
//! Writes go to a sibling temp file first and are renamed into place, so a crash mid-write
//! leaves the previous snapshot intact.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::store::Snapshot;

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

pub async fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(snapshot).context("Failed to encode snapshot")?;
    let tmp = temp_path(path);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(&tmp, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move snapshot into {}", path.display()))?;

    debug!(path = %path.display(), bytes = bytes.len(), "snapshot saved");
    Ok(())
}

/// Load a snapshot; a missing file is an empty book, not an error.
pub async fn load_snapshot(path: &Path) -> Result<Option<Snapshot>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No snapshot found, starting with an empty book");
            return Ok(None);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let snapshot = serde_json::from_slice(&bytes)
        .with_context(|| format!("Corrupt snapshot at {}", path.display()))?;
    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Book;
    use crate::config::BookConfig;
    use crate::ledger::AccountId;
    use crate::odds::BetType;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn snapshot_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");

        let config = BookConfig::with_owner("owner");
        let owner = config.owner.clone();
        let user = AccountId::from("user1");
        let mut book = Book::in_memory(config.clone());
        let racers = vec!["A".to_string(), "B".to_string()];
        let race_id = book.create_race(&owner, "r", &racers, 10, 0).unwrap();
        book.deposit(&user, 1000).unwrap();
        book.place_bet(&user, race_id, 1, 400, BetType::Win).unwrap();

        save_snapshot(&path, &book.store().snapshot()).await.unwrap();
        assert!(!temp_path(&path).exists());

        let loaded = load_snapshot(&path).await.unwrap().unwrap();
        let mut restored = Book::new(config, MemoryStore::from_snapshot(loaded));
        assert_eq!(restored.balance_of(&user), 600);
        assert_eq!(restored.user_bets_of(&user, race_id), vec![1]);
        // sequences continue where they left off
        assert_eq!(restored.place_bet(&user, race_id, 0, 100, BetType::Win), Ok(2));
    }

    #[tokio::test]
    async fn save_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("nested").join("book.json");

        save_snapshot(&path, &Snapshot::default()).await.unwrap();
        assert_eq!(load_snapshot(&path).await.unwrap(), Some(Snapshot::default()));
    }

    #[tokio::test]
    async fn missing_file_is_empty_book() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_snapshot(&dir.path().join("absent.json")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();
        let err = load_snapshot(&path).await.unwrap_err();
        assert!(err.to_string().contains("Corrupt snapshot"));
    }
}
