//! Backup-before-mutation routine (§4.5): before committing a
//! `mark_passing` transition, copy the SQLite file to
//! `<project>/.features_backups/features_<UTC yyyymmdd_HHMMSS>.db`,
//! skipping the copy if the last one ran within the cooldown window,
//! and pruning down to the most recent 20 files afterward.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use feature_core::{error::FeatureError, error::Result, queue_service::BackupHook};
use tokio::sync::Mutex;

const COOLDOWN: Duration = Duration::from_secs(60);
const MAX_BACKUPS: usize = 20;

/// Copies the live database file into a sibling backup directory,
/// rate-limited by [`COOLDOWN`] and pruned to [`MAX_BACKUPS`] files.
pub struct BackupManager {
    db_path: PathBuf,
    backup_dir: PathBuf,
    last_backup: Mutex<Option<Instant>>,
}

impl BackupManager {
    pub fn new(db_path: impl Into<PathBuf>, project_root: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.into(),
            backup_dir: project_root.as_ref().join(".features_backups"),
            last_backup: Mutex::new(None),
        }
    }

    fn prune(&self) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(&self.backup_dir)
            .map_err(|e| FeatureError::Filesystem(format!("failed to list backups: {e}")))?
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("features_")
            })
            .collect();

        if entries.len() <= MAX_BACKUPS {
            return Ok(());
        }

        entries.sort_by_key(|e| e.file_name());
        let overflow = entries.len() - MAX_BACKUPS;
        for entry in entries.into_iter().take(overflow) {
            let _ = std::fs::remove_file(entry.path());
        }
        Ok(())
    }
}

#[async_trait]
impl BackupHook for BackupManager {
    async fn maybe_backup(&self) -> Result<()> {
        let mut last = self.last_backup.lock().await;
        if let Some(at) = *last {
            if at.elapsed() < COOLDOWN {
                return Ok(());
            }
        }

        if !self.db_path.exists() {
            // In-memory databases have no file to copy.
            return Ok(());
        }

        std::fs::create_dir_all(&self.backup_dir)
            .map_err(|e| FeatureError::Filesystem(format!("failed to create backup dir: {e}")))?;

        let name = format!(
            "features_{}.db",
            crate::common::backup_timestamp(Utc::now())
        );
        let dest = self.backup_dir.join(name);

        std::fs::copy(&self.db_path, &dest)
            .map_err(|e| FeatureError::Filesystem(format!("failed to copy backup: {e}")))?;

        *last = Some(Instant::now());
        drop(last);

        self.prune()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn skips_backup_when_db_file_absent() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path().join("nonexistent.db"), dir.path());
        manager.maybe_backup().await.unwrap();
        assert!(!dir.path().join(".features_backups").exists());
    }

    #[tokio::test]
    async fn copies_db_file_into_backup_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("features.db");
        std::fs::write(&db_path, b"fake db contents").unwrap();

        let manager = BackupManager::new(&db_path, dir.path());
        manager.maybe_backup().await.unwrap();

        let backups: Vec<_> = std::fs::read_dir(dir.path().join(".features_backups"))
            .unwrap()
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[tokio::test]
    async fn second_call_within_cooldown_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("features.db");
        std::fs::write(&db_path, b"fake db contents").unwrap();

        let manager = BackupManager::new(&db_path, dir.path());
        manager.maybe_backup().await.unwrap();
        manager.maybe_backup().await.unwrap();

        let backups: Vec<_> = std::fs::read_dir(dir.path().join(".features_backups"))
            .unwrap()
            .collect();
        assert_eq!(backups.len(), 1);
    }
}
