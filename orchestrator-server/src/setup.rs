use std::path::{Path, PathBuf};
use std::sync::Arc;

use agent_pool::AgentPoolManager;
use anyhow::{Context, Result};
use database::{BackupManager, SqliteFeatureRepository};
use feature_core::events::EventBus;
use feature_core::queue_service::FeatureQueueService;
use feature_core::repository::DependencyRepository;
use task_runner::TaskRunner;
use tracing::info;

use crate::config::Config;

/// Create a feature repository based on the complete configuration
pub async fn create_repository(config: &Config) -> Result<Arc<SqliteFeatureRepository>> {
    info!("Creating feature repository");

    // Get validated database URL from config (already handles defaults and validation)
    let database_url = config.database_url();
    info!("Using database URL: {}", database_url);

    // Create SQLite repository
    info!("Initializing SQLite repository at: {}", database_url);
    let repo = SqliteFeatureRepository::new(&database_url)
        .await
        .context("Failed to create SQLite repository")?;

    // Run database migrations
    info!("Running database migrations");
    repo.migrate()
        .await
        .context("Failed to run database migrations")?;

    info!("Feature repository created successfully");
    Ok(Arc::new(repo))
}

/// Everything a transport layer (HTTP, WebSocket, CLI REPL, ...) needs to
/// drive the orchestrator core: the queue service, the agent pool, the
/// task runner, the backup hook, and the event bus they all publish to.
pub struct AppState {
    pub queue: Arc<FeatureQueueService<SqliteFeatureRepository>>,
    pub pool: Arc<AgentPoolManager<SqliteFeatureRepository>>,
    pub task_runner: Arc<TaskRunner>,
    pub backup: Arc<BackupManager>,
    pub events: EventBus,
}

/// Initialize the complete application: repository, migrations, queue
/// service, agent pool supervisor, task runner, and backup hook, all
/// wired to one shared event bus.
pub async fn initialize_app(
    config: &Config,
    project_root: PathBuf,
    project_name: impl Into<String>,
    agent_binary: PathBuf,
) -> Result<AppState> {
    info!("Initializing application");

    let repository = create_repository(config)
        .await
        .context("Failed to create repository")?;

    let events = EventBus::new();

    let queue = Arc::new(
        FeatureQueueService::new(repository.clone(), project_root.clone(), events.clone())
            .with_dependencies(repository.clone() as Arc<dyn DependencyRepository>),
    );

    let pool = Arc::new(
        AgentPoolManager::new(
            project_name,
            project_root.clone(),
            agent_binary,
            repository.clone(),
            events.clone(),
        )
        .with_max_agents(config.pool.max_agents),
    );

    let task_runner = Arc::new(TaskRunner::new(project_root.clone()));

    let database_url = config.database_url();
    let db_path = database_url
        .strip_prefix("sqlite://")
        .unwrap_or(&database_url);
    let backup = Arc::new(BackupManager::new(PathBuf::from(db_path), project_root));

    info!("Application initialized successfully");
    Ok(AppState {
        queue,
        pool,
        task_runner,
        backup,
        events,
    })
}

/// Ensure the database directory exists using config
pub fn ensure_database_directory_from_config(config: &Config) -> Result<()> {
    let database_url = config.database_url();
    ensure_database_directory(&database_url)
}

/// Ensure the database directory exists
pub fn ensure_database_directory(database_url: &str) -> Result<()> {
    if let Some(db_path) = database_url.strip_prefix("sqlite://") {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                info!("Creating database directory: {}", parent.display());
                std::fs::create_dir_all(parent).context("Failed to create database directory")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, LogFormat, LoggingConfig, PoolConfig};
    use tempfile::TempDir;

    fn test_config(database_url: Option<String>) -> Config {
        Config {
            database: DatabaseConfig {
                url: database_url,
                max_connections: 5,
                connection_timeout: 30,
            },
            pool: PoolConfig {
                max_agents: 2,
                agent_binary: "claude".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }

    #[tokio::test]
    async fn test_create_repository_with_custom_url() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let database_url = format!("sqlite://{}", db_path.display());

        let config = test_config(Some(database_url));
        let repo = create_repository(&config).await;
        assert!(repo.is_ok());
    }

    #[tokio::test]
    async fn test_create_repository_invalid_url() {
        let config = test_config(Some("postgres://invalid".to_string()));
        let repo = create_repository(&config).await;
        assert!(repo.is_err());
    }

    #[test]
    fn test_ensure_database_directory() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("subdir").join("test.db");
        let database_url = format!("sqlite://{}", db_path.display());

        let result = ensure_database_directory(&database_url);
        assert!(result.is_ok());
        assert!(db_path.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn test_initialize_app() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("app_test.db");
        let database_url = format!("sqlite://{}", db_path.display());

        let config = test_config(Some(database_url));
        let state = initialize_app(
            &config,
            temp_dir.path().to_path_buf(),
            "demo-project",
            PathBuf::from("claude"),
        )
        .await
        .unwrap();

        let stats = state.queue.get_stats().await.unwrap();
        assert_eq!(stats.total, 0);
    }
}
