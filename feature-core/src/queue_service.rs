//! Orchestrates the eight-step `mark_passing` gate (§4.1) by composing
//! the repository with two collaborator traits that live outside this
//! crate: a [`Verifier`] (the task runner) and a [`BackupHook`] (the
//! database crate's on-disk backup routine). Keeping those as traits
//! here, rather than depending on the `task-runner`/`database` crates
//! directly, keeps `feature-core` the foundational, dependency-free
//! layer — mirroring how the adapted workspace's `task-core` depends on
//! nothing but its own models and `database` depends on `task-core`,
//! never the reverse.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    error::{FeatureError, Result},
    events::{Event, EventBus},
    models::{Feature, FeatureFilter, NewFeature, FeatureStats},
    rate_limiter::RateLimiter,
    repository::{DependencyRepository, FeatureRepository, SkipOutcome, VerificationOutcome},
    validation::FeatureValidator,
};

/// Runs a verification command (allow-listed, timed, size-capped) for
/// the `mark_passing` gate. Implemented by the `task-runner` crate.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn run(&self, command: &str, working_dir: &Path) -> Result<VerificationOutcome>;
}

/// Performs the on-disk backup-before-mutation routine (§4.5).
/// Implemented by the `database` crate, which owns the SQLite file.
#[async_trait]
pub trait BackupHook: Send + Sync {
    async fn maybe_backup(&self) -> Result<()>;
}

/// Truncates `bytes` to at most `limit` trailing bytes, matching the
/// "last N bytes" truncation semantics of §4.1 step 4 and §4.3.
pub fn truncate_tail(s: &str, limit: usize) -> String {
    if s.len() <= limit {
        return s.to_string();
    }
    let start = s.len() - limit;
    // Avoid splitting a multi-byte UTF-8 character.
    let mut start = start;
    while start < s.len() && !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

/// Coordinates the feature queue's business logic on top of a
/// [`FeatureRepository`], owning the process-wide rate limiter and the
/// typed event bus.
pub struct FeatureQueueService<R: FeatureRepository> {
    repository: Arc<R>,
    rate_limiter: Mutex<RateLimiter>,
    events: EventBus,
    project_root: PathBuf,
    dependencies: Option<Arc<dyn DependencyRepository>>,
}

impl<R: FeatureRepository> FeatureQueueService<R> {
    pub fn new(repository: Arc<R>, project_root: PathBuf, events: EventBus) -> Self {
        Self {
            repository,
            rate_limiter: Mutex::new(RateLimiter::new()),
            events,
            project_root,
            dependencies: None,
        }
    }

    /// Enables the optional dependency graph extension (§4.4):
    /// `get_next` and `get_ready_and_blocked` then consult `deps` to
    /// skip features that are not yet ready.
    pub fn with_dependencies(mut self, deps: Arc<dyn DependencyRepository>) -> Self {
        self.dependencies = Some(deps);
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn create(&self, feature: NewFeature) -> Result<Feature> {
        FeatureValidator::validate_new_feature(&feature)?;
        self.repository.create(feature).await
    }

    pub async fn create_bulk(&self, features: Vec<NewFeature>) -> Result<Vec<Feature>> {
        for f in &features {
            FeatureValidator::validate_new_feature(f)?;
        }
        self.repository.create_bulk(features).await
    }

    pub async fn get_stats(&self) -> Result<FeatureStats> {
        let stats = self.repository.get_stats().await?;
        self.events.publish(Event::Progress {
            passing: stats.passing,
            total: stats.total,
            percentage: stats.percentage,
        });
        Ok(stats)
    }

    /// With the dependency graph disabled, the repository's own
    /// priority-ordered candidate. With it enabled, the first
    /// priority-ordered candidate that is also *ready* (§4.4).
    pub async fn get_next(&self) -> Result<Option<Feature>> {
        let Some(deps) = &self.dependencies else {
            return self.repository.get_next().await;
        };

        let candidates = self
            .repository
            .list(FeatureFilter {
                passes: Some(false),
                ..Default::default()
            })
            .await?;
        for feature in candidates {
            if deps.is_ready(feature.id).await? {
                return Ok(Some(feature));
            }
        }
        Ok(None)
    }

    /// Splits every unfinished feature into the set ready to work on and
    /// the set still blocked on an unfinished dependency. With the
    /// dependency graph disabled, every unfinished feature is ready.
    pub async fn get_ready_and_blocked(&self) -> Result<(Vec<Feature>, Vec<Feature>)> {
        let candidates = self
            .repository
            .list(FeatureFilter {
                passes: Some(false),
                ..Default::default()
            })
            .await?;
        let Some(deps) = &self.dependencies else {
            return Ok((candidates, Vec::new()));
        };

        let mut ready = Vec::new();
        let mut blocked = Vec::new();
        for feature in candidates {
            if deps.is_ready(feature.id).await? {
                ready.push(feature);
            } else {
                blocked.push(feature);
            }
        }
        Ok((ready, blocked))
    }

    pub async fn get_for_regression(&self, limit: i64) -> Result<Vec<Feature>> {
        let limit = FeatureValidator::validate_regression_limit(limit)?;
        self.repository.get_for_regression(limit).await
    }

    pub async fn mark_in_progress(&self, feature_id: i64) -> Result<Feature> {
        self.repository.mark_in_progress(feature_id).await
    }

    pub async fn clear_in_progress(&self, feature_id: i64) -> Result<Feature> {
        self.repository.clear_in_progress(feature_id).await
    }

    pub async fn skip(&self, feature_id: i64) -> Result<SkipOutcome> {
        self.repository.skip(feature_id).await
    }

    /// The eight-step gate of §4.1. Each numbered comment corresponds to
    /// a step in the specification; none may be reordered.
    pub async fn mark_passing(
        &self,
        feature_id: i64,
        evidence: &str,
        verifier: &dyn Verifier,
        backup: &dyn BackupHook,
    ) -> Result<Feature> {
        // 1. Rate limit — checked, not yet recorded.
        self.rate_limiter.lock().await.check()?;

        // 2. Evidence length, on the stripped string.
        let stripped_evidence = FeatureValidator::validate_and_strip_evidence(evidence)?;

        // 3. State precondition.
        let feature = self.repository.get_by_id(feature_id).await?;
        if feature.passes {
            return Err(FeatureError::NotInProgress(feature_id));
        }
        if !feature.in_progress {
            return Err(FeatureError::NotInProgress(feature_id));
        }

        // 4. Verification command, if any.
        let verification_output = match &feature.verification_command {
            Some(command) => {
                let outcome = verifier.run(command, &self.project_root).await?;
                if outcome.exit_code != 0 {
                    return Err(FeatureError::VerificationFailed {
                        exit_code: outcome.exit_code,
                        stdout: truncate_tail(&outcome.stdout, 500),
                        stderr: truncate_tail(&outcome.stderr, 500),
                    });
                }
                Some(VerificationOutcome {
                    exit_code: outcome.exit_code,
                    stdout: truncate_tail(&outcome.stdout, 1000),
                    stderr: truncate_tail(&outcome.stderr, 1000),
                })
            }
            None => None,
        };

        // 5. Backup before mutation.
        backup.maybe_backup().await?;

        // 6 + 7. Commit the state transition and append the audit row.
        let updated = self
            .repository
            .commit_passing(feature_id, &stripped_evidence, verification_output.as_ref())
            .await?;

        // 8. Only now record the successful call against the rate limit.
        self.rate_limiter.lock().await.record_success();

        self.events.publish(Event::FeatureUpdate {
            feature_id,
            passes: true,
        });

        if let Some(deps) = &self.dependencies {
            let dependents = deps.dependents_of(feature_id).await?;
            let mut unblocked = Vec::new();
            for edge in dependents {
                if deps.is_ready(edge.feature_id).await? {
                    unblocked.push(edge.feature_id);
                }
            }
            if !unblocked.is_empty() {
                self.events.publish(Event::DependencyResolved {
                    feature_id,
                    unblocked_feature_ids: unblocked,
                });
            }
        }

        Ok(updated)
    }
}
