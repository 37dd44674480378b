use async_trait::async_trait;
use sqlx::migrate::Migrator;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

use super::{SessionStatus, Storage, StoredEvent, StoredSession};
use crate::config::DatabaseConfig;
use crate::engine::SummaryReport;
use crate::error::{StorageError, StorageResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Open {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Open {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        Self::connect(options, config.max_connections).await
    }

    /// Create an in-memory instance. Each instance is an isolated database.
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::Open {
                message: format!("Invalid database URL: {}", e),
            })?
            .foreign_keys(true);

        // Every pooled connection to :memory: is a separate database
        Self::connect(options, 1).await
    }

    async fn connect(options: SqliteConnectOptions, max_connections: u32) -> StorageResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Open {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn session_exists(&self, id: &str) -> StorageResult<bool> {
        let found: Option<(String,)> = sqlx::query_as("SELECT id FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_session(&self, session: &StoredSession) -> StorageResult<()> {
        let summary = session
            .summary
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO sessions (id, game_id, status, created_at, updated_at, summary)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&session.game_id)
        .bind(session.status.to_string())
        .bind(session.created_at.to_rfc3339())
        .bind(session.updated_at.to_rfc3339())
        .bind(&summary)
        .execute(&self.pool)
        .await?;

        debug!(session_id = %session.id, game_id = %session.game_id, "Session created");
        Ok(())
    }

    async fn get_session(&self, id: &str) -> StorageResult<Option<StoredSession>> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, game_id, status, created_at, updated_at, summary
            FROM sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoredSession::try_from).transpose()
    }

    async fn list_sessions(&self, game_id: Option<&str>) -> StorageResult<Vec<StoredSession>> {
        let rows: Vec<SessionRow> = match game_id {
            Some(game_id) => {
                sqlx::query_as(
                    r#"
                    SELECT id, game_id, status, created_at, updated_at, summary
                    FROM sessions
                    WHERE game_id = ?
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(game_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT id, game_id, status, created_at, updated_at, summary
                    FROM sessions
                    ORDER BY created_at DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(StoredSession::try_from).collect()
    }

    async fn delete_session(&self, id: &str) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM choice_events WHERE session_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn append_event(&self, event: &StoredEvent) -> StorageResult<()> {
        if !self.session_exists(&event.session_id).await? {
            return Err(StorageError::SessionNotFound {
                session_id: event.session_id.clone(),
            });
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO choice_events (session_id, sequence, scenario_id, choice_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.session_id)
        .bind(event.sequence)
        .bind(&event.scenario_id)
        .bind(&event.choice_id)
        .bind(event.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE sessions SET updated_at = ? WHERE id = ?")
            .bind(event.created_at.to_rfc3339())
            .bind(&event.session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_events(&self, session_id: &str) -> StorageResult<Vec<StoredEvent>> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT session_id, sequence, scenario_id, choice_id, created_at
            FROM choice_events
            WHERE session_id = ?
            ORDER BY sequence ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoredEvent::try_from).collect()
    }

    async fn pop_event(&self, session_id: &str) -> StorageResult<Option<StoredEvent>> {
        let mut tx = self.pool.begin().await?;

        let row: Option<EventRow> = sqlx::query_as(
            r#"
            SELECT session_id, sequence, scenario_id, choice_id, created_at
            FROM choice_events
            WHERE session_id = ?
            ORDER BY sequence DESC
            LIMIT 1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?;

        // Decode before deleting so a corrupt row stays in place
        let Some(last) = row.map(StoredEvent::try_from).transpose()? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM choice_events WHERE session_id = ? AND sequence = ?")
            .bind(session_id)
            .bind(last.sequence)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(last))
    }

    async fn complete_session(
        &self,
        session_id: &str,
        report: &SummaryReport,
    ) -> StorageResult<()> {
        let summary = serde_json::to_string(report)?;

        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET status = ?, updated_at = ?, summary = ?
            WHERE id = ?
            "#,
        )
        .bind(SessionStatus::Complete.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(&summary)
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::SessionNotFound {
                session_id: session_id.to_string(),
            });
        }

        info!(session_id = %session_id, score = report.score, "Session marked complete");
        Ok(())
    }
}

fn parse_timestamp(session_id: &str, column: &str, value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::CorruptRow {
            session_id: session_id.to_string(),
            message: format!("{}: {}", column, e),
        })
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    game_id: String,
    status: String,
    created_at: String,
    updated_at: String,
    summary: Option<String>,
}

impl TryFrom<SessionRow> for StoredSession {
    type Error = StorageError;

    fn try_from(row: SessionRow) -> StorageResult<Self> {
        let corrupt = |message: String| StorageError::CorruptRow {
            session_id: row.id.clone(),
            message,
        };
        let status: SessionStatus = row.status.parse().map_err(corrupt)?;
        let summary: Option<SummaryReport> = row
            .summary
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| corrupt(format!("summary: {}", e)))?;

        Ok(Self {
            created_at: parse_timestamp(&row.id, "created_at", &row.created_at)?,
            updated_at: parse_timestamp(&row.id, "updated_at", &row.updated_at)?,
            id: row.id,
            game_id: row.game_id,
            status,
            summary,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    session_id: String,
    sequence: i64,
    scenario_id: String,
    choice_id: String,
    created_at: String,
}

impl TryFrom<EventRow> for StoredEvent {
    type Error = StorageError;

    fn try_from(row: EventRow) -> StorageResult<Self> {
        Ok(Self {
            created_at: parse_timestamp(&row.session_id, "created_at", &row.created_at)?,
            session_id: row.session_id,
            sequence: row.sequence,
            scenario_id: row.scenario_id,
            choice_id: row.choice_id,
        })
    }
}
