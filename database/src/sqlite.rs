use crate::common::{
    agent_status_to_string, row_to_agent, row_to_feature, row_to_status_change_log,
    sqlx_error_to_feature_error, steps_to_json,
};
use async_trait::async_trait;
use chrono::Utc;
use feature_core::{
    error::{FeatureError, Result},
    models::{
        Agent, DependencyKind, Feature, FeatureDependency, FeatureFilter, FeatureStats,
        NewFeature, StatusChangeLog,
    },
    repository::{
        AgentRepository, DependencyRepository, FeatureRepository, SkipOutcome,
        VerificationOutcome,
    },
    validation::FeatureValidator,
};
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqlitePool};
use tokio::sync::Mutex as AsyncMutex;

/// SQLite implementation of the feature-queue persistence traits.
///
/// `priority_lock` serializes priority assignment across `create`,
/// `create_bulk`, and `skip` (§5 "Priority lock"), following the same
/// shape as the adapted workspace's `claim_task` compare-and-set, which
/// this repository reuses for `mark_in_progress`.
#[derive(Clone)]
pub struct SqliteFeatureRepository {
    pool: SqlitePool,
    priority_lock: std::sync::Arc<AsyncMutex<()>>,
}

impl SqliteFeatureRepository {
    /// Create a new SQLite repository for the given database URL.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use database::SqliteFeatureRepository;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let repo = SqliteFeatureRepository::new(":memory:").await?;
    /// repo.migrate().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(database_url: &str) -> Result<Self> {
        let db_url = if database_url.starts_with(":memory:") {
            database_url.to_string()
        } else if database_url.starts_with("sqlite://") {
            database_url.to_string()
        } else {
            format!("sqlite://{database_url}")
        };

        if !db_url.contains(":memory:")
            && !Sqlite::database_exists(&db_url).await.unwrap_or(false)
        {
            Sqlite::create_database(&db_url)
                .await
                .map_err(|e| FeatureError::Database(format!("Failed to create database: {e}")))?;
        }

        let connect_options = if db_url.contains(":memory:") {
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(&db_url)
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Memory)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
        } else {
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(db_url.replace("sqlite://", ""))
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
        };

        let pool = SqlitePool::connect_with(connect_options)
            .await
            .map_err(sqlx_error_to_feature_error)?;

        Ok(Self {
            pool,
            priority_lock: std::sync::Arc::new(AsyncMutex::new(())),
        })
    }

    /// Apply pending migrations, adding any column the schema is
    /// missing (§4.5).
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/sqlite")
            .run(&self.pool)
            .await
            .map_err(|e| FeatureError::Database(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations completed successfully");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn next_priority_locked(&self, tx: &mut sqlx::Transaction<'_, Sqlite>) -> Result<i64> {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(priority) FROM features")
            .fetch_one(&mut **tx)
            .await
            .map_err(sqlx_error_to_feature_error)?;
        Ok(max.unwrap_or(0) + 1)
    }

    async fn insert_one(
        &self,
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        feature: &NewFeature,
        priority: i64,
    ) -> Result<Feature> {
        let now = Utc::now();
        let steps_json = steps_to_json(&feature.steps);
        let row = sqlx::query(
            r#"
            INSERT INTO features
                (priority, category, name, description, steps, passes, in_progress,
                 attempt_count, verification_command, inserted_at)
            VALUES (?, ?, ?, ?, ?, 0, 0, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(priority)
        .bind(&feature.category)
        .bind(&feature.name)
        .bind(&feature.description)
        .bind(steps_json)
        .bind(&feature.verification_command)
        .bind(now)
        .fetch_one(&mut **tx)
        .await
        .map_err(sqlx_error_to_feature_error)?;

        row_to_feature(&row)
    }

    async fn append_log(
        &self,
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        feature_id: i64,
        feature_name: &str,
        old_status: &str,
        new_status: &str,
        evidence: Option<&str>,
        verification_output: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO status_change_log
                (feature_id, feature_name, old_status, new_status, evidence, verification_output, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(feature_id)
        .bind(feature_name)
        .bind(old_status)
        .bind(new_status)
        .bind(evidence)
        .bind(verification_output)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await
        .map_err(sqlx_error_to_feature_error)?;
        Ok(())
    }
}

#[async_trait]
impl FeatureRepository for SqliteFeatureRepository {
    async fn create(&self, feature: NewFeature) -> Result<Feature> {
        FeatureValidator::validate_new_feature(&feature)?;

        let _guard = self.priority_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_feature_error)?;
        let priority = self.next_priority_locked(&mut tx).await?;
        let created = self.insert_one(&mut tx, &feature, priority).await?;
        tx.commit().await.map_err(sqlx_error_to_feature_error)?;
        Ok(created)
    }

    async fn create_bulk(&self, features: Vec<NewFeature>) -> Result<Vec<Feature>> {
        for f in &features {
            FeatureValidator::validate_new_feature(f)?;
        }

        let _guard = self.priority_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_feature_error)?;
        let mut next_priority = self.next_priority_locked(&mut tx).await?;

        let mut created = Vec::with_capacity(features.len());
        for f in &features {
            let row = self.insert_one(&mut tx, f, next_priority).await?;
            next_priority += 1;
            created.push(row);
        }

        tx.commit().await.map_err(sqlx_error_to_feature_error)?;
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Feature> {
        let row = sqlx::query("SELECT * FROM features WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_feature_error)?
            .ok_or(FeatureError::FeatureNotFound(id))?;
        row_to_feature(&row)
    }

    async fn list(&self, filter: FeatureFilter) -> Result<Vec<Feature>> {
        let mut query = sqlx::QueryBuilder::new("SELECT * FROM features WHERE 1=1");

        if let Some(category) = &filter.category {
            query.push(" AND category = ").push_bind(category);
        }
        if let Some(passes) = filter.passes {
            query.push(" AND passes = ").push_bind(passes);
        }
        if let Some(in_progress) = filter.in_progress {
            query.push(" AND in_progress = ").push_bind(in_progress);
        }
        query.push(" ORDER BY priority ASC, id ASC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = filter.offset {
            query.push(" OFFSET ").push_bind(offset);
        }

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_feature_error)?;

        rows.iter().map(row_to_feature).collect()
    }

    async fn get_next(&self) -> Result<Option<Feature>> {
        let row = sqlx::query(
            "SELECT * FROM features WHERE passes = 0 ORDER BY priority ASC, id ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_error_to_feature_error)?;

        row.as_ref().map(row_to_feature).transpose()
    }

    async fn get_for_regression(&self, limit: i64) -> Result<Vec<Feature>> {
        let rows = sqlx::query(
            "SELECT * FROM features WHERE passes = 1 ORDER BY RANDOM() LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_error_to_feature_error)?;

        rows.iter().map(row_to_feature).collect()
    }

    async fn get_stats(&self) -> Result<FeatureStats> {
        let (total_result, passing_result, in_progress_result) = tokio::join!(
            sqlx::query("SELECT COUNT(*) as c FROM features").fetch_one(&self.pool),
            sqlx::query("SELECT COUNT(*) as c FROM features WHERE passes = 1").fetch_one(&self.pool),
            sqlx::query("SELECT COUNT(*) as c FROM features WHERE in_progress = 1")
                .fetch_one(&self.pool),
        );

        let total: i64 = total_result.map_err(sqlx_error_to_feature_error)?.get("c");
        let passing: i64 = passing_result.map_err(sqlx_error_to_feature_error)?.get("c");
        let in_progress: i64 = in_progress_result
            .map_err(sqlx_error_to_feature_error)?
            .get("c");

        Ok(FeatureStats::compute(passing, in_progress, total))
    }

    async fn mark_in_progress(&self, feature_id: i64) -> Result<Feature> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_feature_error)?;

        let updated = sqlx::query(
            "UPDATE features SET in_progress = 1, attempt_count = attempt_count + 1 WHERE id = ? AND in_progress = 0 AND passes = 0",
        )
        .bind(feature_id)
        .execute(&mut *tx)
        .await
        .map_err(sqlx_error_to_feature_error)?;

        if updated.rows_affected() == 0 {
            let current = sqlx::query_as::<_, (bool, bool)>(
                "SELECT passes, in_progress FROM features WHERE id = ?",
            )
            .bind(feature_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(sqlx_error_to_feature_error)?;

            return match current {
                None => Err(FeatureError::FeatureNotFound(feature_id)),
                Some((true, _)) => Err(FeatureError::AlreadyPassing(feature_id)),
                Some((false, true)) => Err(FeatureError::AlreadyInProgress(feature_id)),
                Some((false, false)) => Err(FeatureError::Internal(format!(
                    "failed to claim feature {feature_id} due to concurrent modification"
                ))),
            };
        }

        tx.commit().await.map_err(sqlx_error_to_feature_error)?;
        self.get_by_id(feature_id).await
    }

    async fn clear_in_progress(&self, feature_id: i64) -> Result<Feature> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_feature_error)?;

        let was_in_progress: Option<bool> =
            sqlx::query_scalar("SELECT in_progress FROM features WHERE id = ?")
                .bind(feature_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(sqlx_error_to_feature_error)?;

        let was_in_progress = was_in_progress.ok_or(FeatureError::FeatureNotFound(feature_id))?;

        sqlx::query("UPDATE features SET in_progress = 0 WHERE id = ?")
            .bind(feature_id)
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_feature_error)?;

        if was_in_progress {
            let name: String = sqlx::query_scalar("SELECT name FROM features WHERE id = ?")
                .bind(feature_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(sqlx_error_to_feature_error)?;
            self.append_log(
                &mut tx,
                feature_id,
                &name,
                "in_progress",
                "pending",
                None,
                None,
            )
            .await?;
        }

        tx.commit().await.map_err(sqlx_error_to_feature_error)?;
        self.get_by_id(feature_id).await
    }

    async fn skip(&self, feature_id: i64) -> Result<SkipOutcome> {
        let _guard = self.priority_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_feature_error)?;

        let current: Option<(i64, bool)> =
            sqlx::query_as("SELECT priority, passes FROM features WHERE id = ?")
                .bind(feature_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(sqlx_error_to_feature_error)?;

        let (old_priority, passes) = current.ok_or(FeatureError::FeatureNotFound(feature_id))?;
        if passes {
            return Err(FeatureError::AlreadyPassing(feature_id));
        }

        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(priority) FROM features")
            .fetch_one(&mut *tx)
            .await
            .map_err(sqlx_error_to_feature_error)?;
        let new_priority = max.unwrap_or(0) + 1;

        sqlx::query("UPDATE features SET priority = ?, in_progress = 0 WHERE id = ?")
            .bind(new_priority)
            .bind(feature_id)
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_feature_error)?;

        tx.commit().await.map_err(sqlx_error_to_feature_error)?;

        Ok(SkipOutcome {
            old_priority,
            new_priority,
        })
    }

    async fn commit_passing(
        &self,
        feature_id: i64,
        stripped_evidence: &str,
        verification_output: Option<&VerificationOutcome>,
    ) -> Result<Feature> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_feature_error)?;

        let current: Option<(bool, String)> =
            sqlx::query_as("SELECT in_progress, name FROM features WHERE id = ?")
                .bind(feature_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(sqlx_error_to_feature_error)?;

        let (in_progress, name) = current.ok_or(FeatureError::FeatureNotFound(feature_id))?;
        if !in_progress {
            return Err(FeatureError::NotInProgress(feature_id));
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE features
            SET passes = 1, in_progress = 0, verification_evidence = ?, marked_passing_at = ?
            WHERE id = ?
            "#,
        )
        .bind(stripped_evidence)
        .bind(now)
        .bind(feature_id)
        .execute(&mut *tx)
        .await
        .map_err(sqlx_error_to_feature_error)?;

        let output_text = verification_output.map(|o| {
            format!(
                "exit_code={} stdout={} stderr={}",
                o.exit_code, o.stdout, o.stderr
            )
        });

        self.append_log(
            &mut tx,
            feature_id,
            &name,
            "in_progress",
            "passing",
            Some(stripped_evidence),
            output_text.as_deref(),
        )
        .await?;

        tx.commit().await.map_err(sqlx_error_to_feature_error)?;
        self.get_by_id(feature_id).await
    }

    async fn list_status_changes(&self, feature_id: i64) -> Result<Vec<StatusChangeLog>> {
        let rows = sqlx::query(
            "SELECT * FROM status_change_log WHERE feature_id = ? ORDER BY timestamp ASC",
        )
        .bind(feature_id)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_error_to_feature_error)?;

        rows.iter().map(row_to_status_change_log).collect()
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(sqlx_error_to_feature_error)?;
        Ok(())
    }
}

#[async_trait]
impl DependencyRepository for SqliteFeatureRepository {
    /// Rejects self-edges, exact duplicates, and any edge whose reverse
    /// already exists — the constant-time check documented as the
    /// resolved Open Question in SPEC_FULL.md §9. This does not detect
    /// longer cycles.
    async fn add_edge(
        &self,
        feature_id: i64,
        depends_on_id: i64,
        kind: DependencyKind,
        notes: Option<String>,
    ) -> Result<FeatureDependency> {
        if feature_id == depends_on_id {
            return Err(FeatureError::SelfDependency(feature_id));
        }

        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_feature_error)?;

        let duplicate: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM feature_dependencies WHERE feature_id = ? AND depends_on_id = ?",
        )
        .bind(feature_id)
        .bind(depends_on_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(sqlx_error_to_feature_error)?;

        if duplicate.is_some() {
            return Err(FeatureError::DuplicateDependency {
                feature_id,
                depends_on_id,
            });
        }

        let reverse: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM feature_dependencies WHERE feature_id = ? AND depends_on_id = ?",
        )
        .bind(depends_on_id)
        .bind(feature_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(sqlx_error_to_feature_error)?;

        if reverse.is_some() {
            return Err(FeatureError::CircularDependency {
                feature_id,
                depends_on_id,
            });
        }

        let kind_str = kind.to_string();
        let row = sqlx::query(
            r#"
            INSERT INTO feature_dependencies (feature_id, depends_on_id, kind, notes)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(feature_id)
        .bind(depends_on_id)
        .bind(&kind_str)
        .bind(&notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(sqlx_error_to_feature_error)?;

        tx.commit().await.map_err(sqlx_error_to_feature_error)?;

        Ok(FeatureDependency {
            id: row.get("id"),
            feature_id: row.get("feature_id"),
            depends_on_id: row.get("depends_on_id"),
            kind,
            notes,
        })
    }

    async fn remove_edge(&self, edge_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM feature_dependencies WHERE id = ?")
            .bind(edge_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error_to_feature_error)?;
        Ok(())
    }

    async fn dependencies_of(&self, feature_id: i64) -> Result<Vec<FeatureDependency>> {
        let rows = sqlx::query("SELECT * FROM feature_dependencies WHERE feature_id = ?")
            .bind(feature_id)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_feature_error)?;
        rows.iter().map(row_to_dependency).collect()
    }

    async fn dependents_of(&self, feature_id: i64) -> Result<Vec<FeatureDependency>> {
        let rows = sqlx::query("SELECT * FROM feature_dependencies WHERE depends_on_id = ?")
            .bind(feature_id)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_feature_error)?;
        rows.iter().map(row_to_dependency).collect()
    }

    async fn is_ready(&self, feature_id: i64) -> Result<bool> {
        let unmet: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM feature_dependencies fd
            JOIN features f ON f.id = fd.depends_on_id
            WHERE fd.feature_id = ? AND f.passes = 0
            "#,
        )
        .bind(feature_id)
        .fetch_one(&self.pool)
        .await
        .map_err(sqlx_error_to_feature_error)?;
        Ok(unmet == 0)
    }
}

fn row_to_dependency(row: &sqlx::sqlite::SqliteRow) -> Result<FeatureDependency> {
    let kind_str: String = row.get("kind");
    let kind = match kind_str.as_str() {
        "blocks" => DependencyKind::Blocks,
        "requires" => DependencyKind::Requires,
        "related" => DependencyKind::Related,
        other => {
            return Err(FeatureError::Internal(format!(
                "unknown dependency kind in database: {other}"
            )))
        }
    };
    Ok(FeatureDependency {
        id: row.get("id"),
        feature_id: row.get("feature_id"),
        depends_on_id: row.get("depends_on_id"),
        kind,
        notes: row.try_get("notes").ok(),
    })
}

#[async_trait]
impl AgentRepository for SqliteFeatureRepository {
    async fn upsert(&self, agent: &Agent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO agents
                (agent_id, project_name, status, model, yolo_mode, pid, created_at, started_at, last_heartbeat, current_feature_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(agent_id) DO UPDATE SET
                status = excluded.status,
                pid = excluded.pid,
                started_at = excluded.started_at,
                last_heartbeat = excluded.last_heartbeat,
                current_feature_id = excluded.current_feature_id
            "#,
        )
        .bind(&agent.agent_id)
        .bind(&agent.project_name)
        .bind(agent_status_to_string(agent.status))
        .bind(&agent.model)
        .bind(agent.yolo_mode)
        .bind(agent.pid.map(|p| p as i64))
        .bind(agent.created_at)
        .bind(agent.started_at)
        .bind(agent.last_heartbeat)
        .bind(agent.current_feature_id)
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_feature_error)?;
        Ok(())
    }

    async fn get(&self, agent_id: &str) -> Result<Agent> {
        let row = sqlx::query("SELECT * FROM agents WHERE agent_id = ?")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_feature_error)?
            .ok_or_else(|| FeatureError::AgentNotFound(agent_id.to_string()))?;
        row_to_agent(&row)
    }

    async fn list_by_project(&self, project_name: &str) -> Result<Vec<Agent>> {
        let rows = sqlx::query("SELECT * FROM agents WHERE project_name = ?")
            .bind(project_name)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_feature_error)?;
        rows.iter().map(row_to_agent).collect()
    }

    async fn delete(&self, agent_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM agents WHERE agent_id = ?")
            .bind(agent_id)
            .execute(&self.pool)
            .await
            .map_err(sqlx_error_to_feature_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_core::models::FeatureFilter;

    async fn create_test_repository() -> SqliteFeatureRepository {
        let db_name = format!(
            "file:test_{}_{}?mode=memory&cache=shared",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        );
        let repo = SqliteFeatureRepository::new(&db_name)
            .await
            .expect("failed to create test repository");
        repo.migrate().await.expect("failed to run migrations");
        repo
    }

    fn sample_new_feature(name: &str) -> NewFeature {
        NewFeature {
            category: "A".to_string(),
            name: name.to_string(),
            description: "D".to_string(),
            steps: vec!["s".to_string()],
            verification_command: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_incrementing_priority() {
        let repo = create_test_repository().await;
        let f1 = repo.create(sample_new_feature("one")).await.unwrap();
        let f2 = repo.create(sample_new_feature("two")).await.unwrap();
        assert_eq!(f1.priority, 1);
        assert_eq!(f2.priority, 2);
    }

    #[tokio::test]
    async fn get_next_orders_by_priority_then_id() {
        let repo = create_test_repository().await;
        repo.create(sample_new_feature("one")).await.unwrap();
        let next = repo.get_next().await.unwrap().unwrap();
        assert_eq!(next.name, "one");
    }

    #[tokio::test]
    async fn mark_in_progress_then_commit_passing_happy_path() {
        let repo = create_test_repository().await;
        let f = repo.create(sample_new_feature("one")).await.unwrap();
        repo.mark_in_progress(f.id).await.unwrap();

        let evidence = "x".repeat(60);
        let updated = repo.commit_passing(f.id, &evidence, None).await.unwrap();
        assert!(updated.passes);
        assert!(!updated.in_progress);
        assert!(updated.marked_passing_at.is_some());

        let logs = repo.list_status_changes(f.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].new_status, "passing");
    }

    #[tokio::test]
    async fn commit_passing_rejects_when_not_in_progress() {
        let repo = create_test_repository().await;
        let f = repo.create(sample_new_feature("one")).await.unwrap();
        let evidence = "x".repeat(60);
        let err = repo.commit_passing(f.id, &evidence, None).await.unwrap_err();
        assert!(matches!(err, FeatureError::NotInProgress(_)));
    }

    #[tokio::test]
    async fn skip_moves_feature_to_tail() {
        let repo = create_test_repository().await;
        let f1 = repo.create(sample_new_feature("one")).await.unwrap();
        repo.create(sample_new_feature("two")).await.unwrap();
        repo.create(sample_new_feature("three")).await.unwrap();

        let outcome = repo.skip(f1.id).await.unwrap();
        assert_eq!(outcome.old_priority, 1);
        assert_eq!(outcome.new_priority, 4);

        let next = repo.get_next().await.unwrap().unwrap();
        assert_eq!(next.name, "two");
    }

    #[tokio::test]
    async fn concurrent_claims_only_one_succeeds() {
        use std::sync::Arc;

        let repo = Arc::new(create_test_repository().await);
        let f = repo.create(sample_new_feature("one")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let repo = repo.clone();
            let id = f.id;
            handles.push(tokio::spawn(async move { repo.mark_in_progress(id).await }));
        }

        let results = futures::future::join_all(handles).await;
        let successes = results
            .iter()
            .filter(|r| r.as_ref().unwrap().is_ok())
            .count();
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn dependency_add_edge_rejects_self_edge() {
        let repo = create_test_repository().await;
        let f = repo.create(sample_new_feature("one")).await.unwrap();
        let err = repo
            .add_edge(f.id, f.id, DependencyKind::Blocks, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FeatureError::SelfDependency(_)));
    }

    #[tokio::test]
    async fn dependency_add_edge_rejects_reverse_edge() {
        let repo = create_test_repository().await;
        let f1 = repo.create(sample_new_feature("one")).await.unwrap();
        let f2 = repo.create(sample_new_feature("two")).await.unwrap();

        repo.add_edge(f1.id, f2.id, DependencyKind::Blocks, None)
            .await
            .unwrap();

        let err = repo
            .add_edge(f2.id, f1.id, DependencyKind::Blocks, None)
            .await
            .unwrap_err();
        assert!(matches!(err, FeatureError::CircularDependency { .. }));
    }

    #[tokio::test]
    async fn list_filters_by_passes() {
        let repo = create_test_repository().await;
        let f = repo.create(sample_new_feature("one")).await.unwrap();
        repo.create(sample_new_feature("two")).await.unwrap();

        repo.mark_in_progress(f.id).await.unwrap();
        let evidence = "x".repeat(60);
        repo.commit_passing(f.id, &evidence, None).await.unwrap();

        let passing = repo
            .list(FeatureFilter {
                passes: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(passing.len(), 1);
        assert_eq!(passing[0].name, "one");
    }
}
