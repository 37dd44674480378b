//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - Shared application state management

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::engine::PlaySession;
use crate::scenarios::GameRegistry;
use crate::storage::SqliteStorage;

/// Application state shared across handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// SQLite storage backend.
    pub storage: SqliteStorage,
    /// Registered games.
    pub registry: Arc<GameRegistry>,
    /// Live sessions keyed by session id. Anything missing here is
    /// rebuilt from storage on demand.
    pub sessions: Mutex<HashMap<String, PlaySession>>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, storage: SqliteStorage, registry: Arc<GameRegistry>) -> Self {
        tracing::info!(
            games = registry.count(),
            default_game = %config.game.default_game,
            "AppState initializing"
        );

        Self {
            config,
            storage,
            registry,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Number of sessions currently held in memory.
    pub async fn live_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, GameConfig, LogFormat, LoggingConfig};
    use std::path::PathBuf;

    fn create_test_config() -> Config {
        Config {
            database: DatabaseConfig {
                path: PathBuf::from(":memory:"),
                max_connections: 5,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
            game: GameConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_app_state_new() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let registry = Arc::new(GameRegistry::new());
        let state = AppState::new(create_test_config(), storage, registry);

        assert_eq!(state.registry.count(), 3);
        assert_eq!(state.live_sessions().await, 0);
        assert_eq!(state.config.game.default_game, "multi_path_stage1");
    }

    #[tokio::test]
    async fn test_shared_state_is_shareable() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let state: SharedState = Arc::new(AppState::new(
            create_test_config(),
            storage,
            Arc::new(GameRegistry::empty()),
        ));

        let cloned = Arc::clone(&state);
        let handle = tokio::spawn(async move { cloned.live_sessions().await });
        assert_eq!(handle.await.unwrap(), 0);
        assert_eq!(Arc::strong_count(&state), 1);
    }
}
