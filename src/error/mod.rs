use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Scenario graph and data-integrity errors.
///
/// These are programmer/data errors: they fail fast at load or walk time
/// and are never recovered from silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    #[error("Unknown scenario '{scenario_id}' in game '{game_id}'")]
    UnknownScenario { game_id: String, scenario_id: String },

    #[error("Unknown choice '{choice_id}' in scenario '{scenario_id}'")]
    UnknownChoice {
        scenario_id: String,
        choice_id: String,
    },

    #[error("Dangling reference: choice '{choice_id}' in scenario '{scenario_id}' points to '{target}'")]
    DanglingReference {
        scenario_id: String,
        choice_id: String,
        target: String,
    },

    #[error("Duplicate scenario id '{scenario_id}' in game '{game_id}'")]
    DuplicateScenario { game_id: String, scenario_id: String },

    #[error("Duplicate choice id '{choice_id}' in scenario '{scenario_id}'")]
    DuplicateChoice {
        scenario_id: String,
        choice_id: String,
    },

    #[error("Start scenario '{start}' not found in game '{game_id}'")]
    UnknownStart { game_id: String, start: String },

    #[error("Scenario '{scenario_id}' has {count} choices (expected 1-5)")]
    ChoiceCount { scenario_id: String, count: usize },

    #[error("Invalid bounds for {target} in game '{game_id}': min {min} > max {max}")]
    InvalidBounds {
        game_id: String,
        target: String,
        min: i64,
        max: i64,
    },

    #[error("Game '{game_id}' already registered")]
    DuplicateGame { game_id: String },

    #[error("Unknown game: {game_id}")]
    UnknownGame { game_id: String },

    #[error("Scenario pack error: {message}")]
    Pack { message: String },
}

/// Session and presentation-loop errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error("Cannot {action} while {phase}")]
    InvalidTransition { action: String, phase: String },

    #[error("Session is already complete")]
    SessionComplete,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}

/// Errors from the session store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Could not open database: {message}")]
    Open { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Corrupt row for session {session_id}: {message}")]
    CorruptRow { session_id: String, message: String },

    #[error("Could not encode summary: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Errors surfaced to tool callers. Lower layers collapse into
/// `ExecutionFailed` with their display text.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    #[error("Invalid parameters for {tool_name}: {message}")]
    InvalidParameters { tool_name: String, message: String },

    #[error("Tool execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

macro_rules! execution_failed_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for McpError {
                fn from(err: $source) -> Self {
                    McpError::ExecutionFailed {
                        message: err.to_string(),
                    }
                }
            }
        )+
    };
}

execution_failed_from!(AppError, ScenarioError, EngineError, StorageError);

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for scenario graph operations
pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// Result type alias for session/presenter operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;
