mod config;
mod setup;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use setup::{ensure_database_directory_from_config, initialize_app};
use std::path::{Path, PathBuf};
use telemetry::{init_telemetry, log_config_validation, log_shutdown_info, log_startup_info};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "feature-orchestrator")]
#[command(about = "Feature queue orchestrator and agent pool supervisor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Start the orchestrator
    #[arg(long)]
    start: bool,

    /// Project name for database scoping (creates features.PROJECT_NAME.sqlite)
    #[arg(long, env = "PROJECT_NAME")]
    project: Option<String>,

    /// Project root directory (required - will create .features/ and .features_backups/ subdirectories)
    #[arg(long, env = "PROJECT_ROOT")]
    project_root: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<String>,

    /// Database URL override (overrides --project scoping)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of concurrently running agents override
    #[arg(long, env = "MAX_AGENTS")]
    max_agents: Option<usize>,

    /// Agent binary to spawn for each pool slot
    #[arg(long, env = "AGENT_BINARY", default_value = "claude")]
    agent_binary: String,

    /// Log level override
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(config_file) => {
            info!("Loading configuration from file: {}", config_file);
            Config::from_file(config_file)?
        }
        None => {
            info!("Loading configuration from environment");
            Config::from_env()?
        }
    };

    // Apply CLI overrides for database URL
    if let Some(ref database_url) = cli.database_url {
        info!("Overriding database URL from CLI");
        config.database.url = Some(database_url.clone());
    } else if let Some(ref project_name) = cli.project {
        // Generate project-scoped database path in .features directory
        if let Some(ref project_root) = cli.project_root {
            let db_path = Path::new(project_root)
                .join(".features")
                .join(format!("features.{}.sqlite", project_name));
            let db_url = format!("sqlite://{}", db_path.display());
            info!("Using project-scoped database: {}", db_url);
            config.database.url = Some(db_url);
        }
    }

    if let Some(max_agents) = cli.max_agents {
        info!("Overriding max_agents from CLI: {}", max_agents);
        config.pool.max_agents = max_agents;
    }

    config.pool.agent_binary = cli.agent_binary.clone();

    if let Some(ref log_level) = cli.log_level {
        info!("Overriding log level from CLI");
        config.logging.level = log_level.clone();
    }

    Ok(config)
}

/// Create the `.features` and `.features_backups` directories in the project root
fn create_project_directories(project_root: &str) -> Result<()> {
    let project_path = Path::new(project_root);

    if !project_path.exists() {
        return Err(anyhow::anyhow!(
            "Project root directory does not exist: {}",
            project_root
        ));
    }

    if !project_path.is_dir() {
        return Err(anyhow::anyhow!(
            "Project root is not a directory: {}",
            project_root
        ));
    }

    let features_dir = project_path.join(".features");
    if !features_dir.exists() {
        std::fs::create_dir_all(&features_dir)
            .with_context(|| format!("Failed to create .features directory: {:?}", features_dir))?;
        info!("Created .features directory: {:?}", features_dir);
    }

    let backups_dir = project_path.join(".features_backups");
    if !backups_dir.exists() {
        std::fs::create_dir_all(&backups_dir).with_context(|| {
            format!(
                "Failed to create .features_backups directory: {:?}",
                backups_dir
            )
        })?;
        info!("Created .features_backups directory: {:?}", backups_dir);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Require --start flag
    if !cli.start {
        println!("Feature Orchestrator");
        println!();
        println!("Usage:");
        println!(
            "  feature-orchestrator --start --project=my-project --project-root=/path/to/project"
        );
        println!();
        println!("This will:");
        println!("  - Use database: /path/to/project/.features/features.my-project.sqlite");
        println!("  - Create .features/ and .features_backups/ directories in project root");
        println!("  - Spawn up to --max-agents agent subprocesses on demand");
        println!();
        println!("For more options, use: feature-orchestrator --help");
        return Ok(());
    }

    // Validate required parameters
    if cli.project_root.is_none() {
        error!("--project-root parameter is required");
        std::process::exit(1);
    }

    if cli.project.is_none() && cli.database_url.is_none() {
        error!("Either --project or --database-url must be specified");
        std::process::exit(1);
    }

    // Create project directories (.features and .features_backups)
    if let Some(ref project_root) = cli.project_root {
        create_project_directories(project_root)
            .context("Failed to create project directories")?;
    }

    // Load configuration
    let config = load_config(&cli).context("Failed to load configuration")?;

    // Initialize telemetry/logging system
    init_telemetry(&config.logging).context("Failed to initialize telemetry")?;

    // Log configuration validation
    log_config_validation(&config);

    // Validate configuration (will exit if invalid)
    if let Err(e) = config.validate() {
        error!(error = %e, "Configuration validation failed");
        std::process::exit(1);
    }

    // Log startup information
    log_startup_info(&config);

    // Ensure database directory exists
    ensure_database_directory_from_config(&config)
        .context("Failed to create database directory")?;

    let project_root = PathBuf::from(cli.project_root.as_ref().unwrap());
    let project_name = cli.project.clone().unwrap_or_else(|| "default".to_string());

    info!("Starting feature orchestrator");
    info!("Project: {}", project_name);
    info!("Max agents: {}", config.pool.max_agents);

    // Initialize application (repository, queue service, agent pool, task runner)
    let state = initialize_app(
        &config,
        project_root,
        project_name.clone(),
        PathBuf::from(&config.pool.agent_binary),
    )
    .await
    .context("Failed to initialize application")?;

    println!("Feature orchestrator is ready!");
    println!("   Project: {}", project_name);
    println!("   Database: {}", config.database_url());
    println!("   Max agents: {}", config.pool.max_agents);
    println!();
    println!("Press Ctrl+C to shutdown");
    println!();

    // Setup graceful shutdown handling
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler");
            let mut sigint =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
                    .expect("Failed to register SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                }
            }
        }

        #[cfg(windows)]
        {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for ctrl+c");
            info!("Received Ctrl+C, initiating graceful shutdown");
        }

        let _ = shutdown_tx.send(());
    });

    let _ = shutdown_rx.await;
    println!("Shutdown signal received, stopping all agents...");
    log_shutdown_info();

    let (stopped, errors) = state.pool.stop_all_agents().await;
    info!(stopped, errors = errors.len(), "Agent pool stopped");
    for err in &errors {
        error!(error = %err, "Error stopping agent during shutdown");
    }

    println!("Feature orchestrator shut down cleanly");
    Ok(())
}
