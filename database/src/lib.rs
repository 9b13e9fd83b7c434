//! SQLite persistence for the feature queue orchestrator.
//!
//! This crate provides the SQLite implementation of the `feature-core`
//! repository traits, plus the on-disk backup routine invoked from the
//! `mark_passing` gate.
//!
//! # Features
//!
//! - SQLite with WAL mode (file-backed) or shared-cache memory mode
//!   (`:memory:`) for tests
//! - Schema migrations via `sqlx::migrate!`
//! - Atomic compare-and-set claiming for race-free `mark_in_progress`
//! - Backup-before-mutation with cooldown and rotation
//!
//! # Usage
//!
//! ```rust,no_run
//! use database::{BackupManager, FeatureRepository, SqliteFeatureRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = SqliteFeatureRepository::new("features.db").await?;
//!     repo.migrate().await?;
//!     repo.health_check().await?;
//!
//!     let _backup = BackupManager::new("features.db", ".");
//!     Ok(())
//! }
//! ```

mod backup;
mod common;
mod sqlite;

pub use backup::BackupManager;
pub use sqlite::SqliteFeatureRepository;

// Re-export commonly used types from feature-core for convenience.
pub use feature_core::{
    error::{FeatureError, Result},
    models::{
        Agent, AgentStatus, DependencyKind, Feature, FeatureDependency, FeatureFilter,
        FeatureStats, NewFeature, StatusChangeLog,
    },
    repository::{AgentRepository, DependencyRepository, FeatureRepository},
};
