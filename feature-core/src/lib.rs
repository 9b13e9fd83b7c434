//! Feature Core Library
//!
//! Foundational domain models, business logic, and trait interfaces for
//! the feature-queue orchestrator. Every other crate in the workspace
//! depends on the types defined here; this crate depends on nothing but
//! `serde`, `chrono`, `thiserror`, `async-trait`, and `tokio::sync`.
//!
//! # Architecture
//!
//! - [`models`] - Feature, Agent, StatusChangeLog, FeatureDependency
//! - [`error`] - `FeatureError` and its classification into the five
//!   error kinds of the error-handling design
//! - [`repository`] - persistence traits (`FeatureRepository`,
//!   `DependencyRepository`, `AgentRepository`)
//! - [`validation`] - input validation shared by every transport
//! - [`rate_limiter`] - the process-wide sliding-window limiter on
//!   `mark_passing`
//! - [`events`] - the typed event bus that replaces ad-hoc callbacks
//! - [`api`] - wire-shape DTOs for the Feature/Agent Pool/Task Runner
//!   JSON APIs
//! - [`queue_service`] - orchestrates the eight-step `mark_passing` gate
//!
//! # Example
//!
//! ```rust
//! use feature_core::{models::NewFeature, validation::FeatureValidator};
//!
//! let new_feature = NewFeature {
//!     category: "backend".to_string(),
//!     name: "Add health check".to_string(),
//!     description: "Expose a liveness endpoint".to_string(),
//!     steps: vec!["Add handler".to_string(), "Wire route".to_string()],
//!     verification_command: None,
//! };
//!
//! FeatureValidator::validate_new_feature(&new_feature).unwrap();
//! ```

pub mod api;
pub mod error;
pub mod events;
pub mod models;
pub mod queue_service;
pub mod rate_limiter;
pub mod repository;
pub mod validation;

pub use error::{FeatureError, Result};
pub use events::{Event, EventBus};
pub use models::{
    Agent, AgentStatus, DependencyKind, Feature, FeatureDependency, FeatureFilter, FeatureStats,
    NewFeature, StatusChangeLog,
};
pub use queue_service::{BackupHook, FeatureQueueService, Verifier};
pub use rate_limiter::RateLimiter;
pub use repository::{
    AgentRepository, DependencyRepository, FeatureRepository, SkipOutcome, VerificationOutcome,
};
pub use validation::FeatureValidator;

/// Current version of the feature-core crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current crate name.
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(CRATE_NAME, "feature-core");
    }

    #[test]
    fn test_re_exports() {
        let error = FeatureError::FeatureNotFound(1);
        assert!(error.is_not_found());
    }
}
