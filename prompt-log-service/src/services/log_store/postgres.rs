//! PostgreSQL-backed interaction log.

use super::InteractionStore;
use crate::error::StorageError;
use crate::models::{DailyCount, NewInteraction, PromptFrequency, PromptInteraction};
use crate::services::metrics::{record_db_error, DB_QUERY_DURATION};
use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

const INTERACTION_COLUMNS: &str =
    "id, prompt, response, model, regenerated, latency_ms, created_at";

/// Interaction log stored in the `prompt_interactions` table.
#[derive(Clone)]
pub struct PgInteractionStore {
    pool: PgPool,
}

impl PgInteractionStore {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "prompt-log-service"))]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

fn read_failed(operation: &str, err: sqlx::Error) -> StorageError {
    tracing::error!(operation = operation, error = %err, "Interaction log read failed");
    record_db_error(operation);
    StorageError::read(err)
}

#[async_trait]
impl InteractionStore for PgInteractionStore {
    #[instrument(skip(self, record), fields(model = %record.model, regenerated = record.regenerated))]
    async fn append(&self, record: &NewInteraction) -> Result<i64, StorageError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["append"])
            .start_timer();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO prompt_interactions (prompt, response, model, regenerated, latency_ms)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&record.prompt)
        .bind(&record.response)
        .bind(&record.model)
        .bind(record.regenerated)
        .bind(record.latency_ms)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to append interaction");
            record_db_error("append");
            StorageError::write(e)
        })?;

        timer.observe_duration();

        info!(interaction_id = id, "Interaction recorded");

        Ok(id)
    }

    #[instrument(skip(self))]
    async fn recent(&self, limit: i64) -> Result<Vec<PromptInteraction>, StorageError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["recent"])
            .start_timer();

        let rows = sqlx::query_as::<_, PromptInteraction>(&format!(
            r#"
            SELECT {INTERACTION_COLUMNS}
            FROM prompt_interactions
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#
        ))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_failed("recent", e))?;

        timer.observe_duration();

        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn count(&self) -> Result<i64, StorageError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["count"])
            .start_timer();

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM prompt_interactions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| read_failed("count", e))?;

        timer.observe_duration();

        Ok(total)
    }

    #[instrument(skip(self))]
    async fn average_latency(&self) -> Result<Option<f64>, StorageError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["average_latency"])
            .start_timer();

        // AVG ignores NULLs and yields NULL over an empty set.
        let avg: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(latency_ms)::DOUBLE PRECISION FROM prompt_interactions",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| read_failed("average_latency", e))?;

        timer.observe_duration();

        Ok(avg)
    }

    #[instrument(skip(self))]
    async fn count_per_day(&self, limit: i64) -> Result<Vec<DailyCount>, StorageError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["count_per_day"])
            .start_timer();

        let rows = sqlx::query_as::<_, DailyCount>(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS date, COUNT(*) AS count
            FROM prompt_interactions
            GROUP BY 1
            ORDER BY 1 DESC
            LIMIT $1
            "#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_failed("count_per_day", e))?;

        timer.observe_duration();

        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn top_prompts(&self, limit: i64) -> Result<Vec<PromptFrequency>, StorageError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["top_prompts"])
            .start_timer();

        let rows = sqlx::query_as::<_, PromptFrequency>(
            r#"
            SELECT prompt, COUNT(*) AS count
            FROM prompt_interactions
            GROUP BY prompt
            ORDER BY count DESC, prompt ASC
            LIMIT $1
            "#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_failed("top_prompts", e))?;

        timer.observe_duration();

        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn slowest(&self, limit: i64) -> Result<Vec<PromptInteraction>, StorageError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["slowest"])
            .start_timer();

        let rows = sqlx::query_as::<_, PromptInteraction>(&format!(
            r#"
            SELECT {INTERACTION_COLUMNS}
            FROM prompt_interactions
            WHERE latency_ms IS NOT NULL
            ORDER BY latency_ms DESC, id DESC
            LIMIT $1
            "#
        ))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| read_failed("slowest", e))?;

        timer.observe_duration();

        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::ReadFailed(anyhow::Error::new(e).context("Health check failed")))?;
        Ok(())
    }
}
