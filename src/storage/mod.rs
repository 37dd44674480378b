//! Storage layer for play session persistence.
//!
//! Sessions are stored as their event logs: one row per session plus one
//! row per choice made. Derived state is never stored; it is rebuilt by
//! replaying the events through the engine.

mod sqlite;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{ChoiceMade, SummaryReport};
use crate::error::StorageResult;

/// Lifecycle status of a stored session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Still being played.
    #[default]
    Active,
    /// Finished; the summary is stored.
    Complete,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Complete => write!(f, "complete"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SessionStatus::Active),
            "complete" => Ok(SessionStatus::Complete),
            _ => Err(format!("Unknown session status: {}", s)),
        }
    }
}

/// A persisted play session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    /// Unique session identifier.
    pub id: String,
    /// Game being played.
    pub game_id: String,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last updated.
    pub updated_at: DateTime<Utc>,
    /// Final report, once complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryReport>,
}

impl StoredSession {
    /// Create a new active session for a game.
    pub fn new(game_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            game_id: game_id.into(),
            status: SessionStatus::Active,
            created_at: now,
            updated_at: now,
            summary: None,
        }
    }
}

/// One persisted choice event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Owning session.
    pub session_id: String,
    /// 0-based position in the log.
    pub sequence: i64,
    /// Scenario the choice was made in.
    pub scenario_id: String,
    /// Chosen choice.
    pub choice_id: String,
    /// When the choice was made.
    pub created_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Create a stored event from an engine event.
    pub fn new(session_id: impl Into<String>, sequence: i64, event: &ChoiceMade) -> Self {
        Self {
            session_id: session_id.into(),
            sequence,
            scenario_id: event.scenario_id.clone(),
            choice_id: event.choice_id.clone(),
            created_at: Utc::now(),
        }
    }

    /// Convert back to an engine event.
    pub fn to_choice(&self) -> ChoiceMade {
        ChoiceMade::new(&self.scenario_id, &self.choice_id)
    }
}

/// Storage trait for database operations.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Create a new session.
    async fn create_session(&self, session: &StoredSession) -> StorageResult<()>;
    /// Get a session by ID.
    async fn get_session(&self, id: &str) -> StorageResult<Option<StoredSession>>;
    /// List sessions, newest first, optionally for one game.
    async fn list_sessions(&self, game_id: Option<&str>) -> StorageResult<Vec<StoredSession>>;
    /// Delete a session and its events.
    async fn delete_session(&self, id: &str) -> StorageResult<()>;

    /// Append an event to a session's log.
    async fn append_event(&self, event: &StoredEvent) -> StorageResult<()>;
    /// Get a session's events in log order.
    async fn get_events(&self, session_id: &str) -> StorageResult<Vec<StoredEvent>>;
    /// Remove and return the last event of a session.
    async fn pop_event(&self, session_id: &str) -> StorageResult<Option<StoredEvent>>;

    /// Mark a session complete and store its report.
    async fn complete_session(&self, session_id: &str, report: &SummaryReport)
        -> StorageResult<()>;
}
