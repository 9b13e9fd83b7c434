//! Feature Orchestrator Library
//!
//! Wires together the feature queue service, the agent pool supervisor,
//! and the task runner behind one configuration and telemetry layer.
//! The binary crate (`src/main.rs`) is a thin CLI over this library;
//! a transport layer (HTTP, WebSocket, ...) would sit here too, driving
//! the [`setup::AppState`] this crate assembles.

pub mod config;
pub mod setup;
pub mod telemetry;

pub use config::Config;
pub use setup::{create_repository, ensure_database_directory, initialize_app, AppState};
pub use telemetry::init_telemetry;
