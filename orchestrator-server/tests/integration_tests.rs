use orchestrator_server::config::{Config, DatabaseConfig, LogFormat, LoggingConfig, PoolConfig};
use orchestrator_server::setup::{create_repository, ensure_database_directory};
use std::env;
use tempfile::TempDir;

fn test_config(database_url: Option<String>) -> Config {
    Config {
        database: DatabaseConfig {
            url: database_url,
            max_connections: 5,
            connection_timeout: 30,
        },
        pool: PoolConfig {
            max_agents: 5,
            agent_binary: "claude".to_string(),
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        },
    }
}

#[tokio::test]
async fn test_repository_creation_with_sqlite() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite://{}", db_path.display());

    let config = test_config(Some(database_url));

    let repo = create_repository(&config).await;
    assert!(
        repo.is_ok(),
        "Failed to create repository: {:?}",
        repo.err()
    );
}

#[test]
fn test_configuration_loading() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.pool.max_agents, 10);
}

#[test]
fn test_environment_overrides() {
    env::set_var("DATABASE_URL", "sqlite://test_env.db");
    env::set_var("MAX_AGENTS", "3");
    env::set_var("LOG_LEVEL", "debug");

    let config = Config::default().merge_with_env().unwrap();

    assert_eq!(
        config.database.url,
        Some("sqlite://test_env.db".to_string())
    );
    assert_eq!(config.logging.level, "debug");

    env::remove_var("DATABASE_URL");
    env::remove_var("MAX_AGENTS");
    env::remove_var("LOG_LEVEL");
}

#[test]
fn test_default_database_path_creation() {
    let config = Config::default();
    let url = config.database_url();

    assert!(url.starts_with("sqlite://"));
    assert!(url.contains(".sqlite"));
}

#[test]
fn test_database_directory_creation() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("subdir").join("test.db");
    let database_url = format!("sqlite://{}", db_path.display());

    let result = ensure_database_directory(&database_url);
    assert!(result.is_ok());
    assert!(db_path.parent().unwrap().exists());
}

#[test]
fn test_config_validation_errors() {
    let mut config = Config::default();

    config.logging.level = "invalid".to_string();
    assert!(config.validate().is_err());

    config.logging.level = "info".to_string();
    config.database.url = Some("postgres://invalid".to_string());
    assert!(config.validate().is_err());

    config.database.url = None;
    config.pool.max_agents = 0;
    assert!(config.validate().is_err());

    config.pool.max_agents = 5;
    config.database.max_connections = 0;
    assert!(config.validate().is_err());
}

#[tokio::test]
async fn test_repository_creation_with_migrations() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("migration_test.db");
    let database_url = format!("sqlite://{}", db_path.display());

    let config = test_config(Some(database_url));

    let repo = create_repository(&config).await;
    assert!(repo.is_ok());

    // Verify the database file was created
    assert!(db_path.exists());
}

#[tokio::test]
async fn test_multiple_repository_instances() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("multi_test.db");
    let database_url = format!("sqlite://{}", db_path.display());

    let config = test_config(Some(database_url));

    let repo1 = create_repository(&config).await;
    let repo2 = create_repository(&config).await;

    assert!(repo1.is_ok());
    assert!(repo2.is_ok());
}
