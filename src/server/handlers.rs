use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::SharedState;
use crate::engine::{
    AdvanceOutcome, ChoiceMade, FeedbackView, Phase, PlaySession, ScenarioView, Session,
    SessionState, SummaryReport,
};
use crate::error::{EngineError, McpError, McpResult, StorageError};
use crate::scenarios::{validate, GameDefinition, GameSummary, ValidationReport};
use crate::storage::{SessionStatus, Storage, StoredEvent, StoredSession};

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        // Catalog tools
        "game_list" => handle_list(state, arguments).await,
        "game_validate" => handle_validate(state, arguments).await,
        // Play tools
        "game_start" => handle_start(state, arguments).await,
        "game_select" => handle_select(state, arguments).await,
        "game_advance" => handle_advance(state, arguments).await,
        "game_undo" => handle_undo(state, arguments).await,
        "game_state" => handle_state(state, arguments).await,
        "game_resume" => handle_resume(state, arguments).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

// ============================================================================
// Parameters and responses
// ============================================================================

/// Parameters for game_validate
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidateParams {
    /// Registered game to validate; all games when omitted.
    pub game_id: Option<String>,
    /// Inline definition to validate instead of a registered game.
    pub definition: Option<GameDefinition>,
}

/// Parameters for game_start
#[derive(Debug, Clone, Deserialize)]
pub struct StartParams {
    /// Game to play; the configured default when omitted.
    pub game_id: Option<String>,
}

/// Parameters for game_select
#[derive(Debug, Clone, Deserialize)]
pub struct SelectParams {
    pub session_id: String,
    pub choice_id: String,
}

/// Parameters for tools that only address a session
#[derive(Debug, Clone, Deserialize)]
pub struct SessionParams {
    pub session_id: String,
}

/// Response for game_list
#[derive(Debug, Clone, Serialize)]
pub struct GameListResponse {
    pub games: Vec<GameSummary>,
    pub count: usize,
}

/// Response for game_validate
#[derive(Debug, Clone, Serialize)]
pub struct ValidateResponse {
    pub reports: Vec<ValidationReport>,
    pub valid: bool,
}

/// Response for game_start
#[derive(Debug, Clone, Serialize)]
pub struct StartResponse {
    pub session_id: String,
    pub game_id: String,
    pub view: ScenarioView,
}

/// Response for game_select
#[derive(Debug, Clone, Serialize)]
pub struct SelectResponse {
    pub session_id: String,
    pub feedback: FeedbackView,
}

/// Response for game_advance
#[derive(Debug, Clone, Serialize)]
pub struct AdvanceResponse {
    pub session_id: String,
    #[serde(flatten)]
    pub outcome: AdvanceOutcome,
}

/// Snapshot of a session, returned by game_state, game_resume and game_undo
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<ScenarioView>,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SummaryReport>,
}

impl SessionSnapshot {
    fn of(session_id: &str, play: &PlaySession) -> Self {
        Self {
            session_id: session_id.to_string(),
            phase: play.phase(),
            view: play.current_view(),
            state: play.session().state().clone(),
            report: play.report().cloned(),
        }
    }
}

// ============================================================================
// Catalog handlers
// ============================================================================

/// Handle game_list tool call
async fn handle_list(state: &SharedState, _arguments: Option<Value>) -> McpResult<Value> {
    let games = state.registry.list();
    let count = games.len();

    serde_json::to_value(GameListResponse { games, count }).map_err(McpError::Json)
}

/// Handle game_validate tool call
async fn handle_validate(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: ValidateParams = match arguments {
        Some(args) => parse_arguments("game_validate", Some(args))?,
        None => ValidateParams::default(),
    };

    let reports = match (params.definition, params.game_id) {
        (Some(definition), _) => vec![validate(&definition)],
        (None, Some(game_id)) => {
            let graph = state.registry.require(&game_id)?;
            vec![validate(graph.definition())]
        }
        (None, None) => state
            .registry
            .list()
            .iter()
            .filter_map(|summary| state.registry.get(&summary.id))
            .map(|graph| validate(graph.definition()))
            .collect(),
    };

    let valid = reports.iter().all(|r| r.is_valid());
    info!(reports = reports.len(), valid, "Validated games");

    serde_json::to_value(ValidateResponse { reports, valid }).map_err(McpError::Json)
}

// ============================================================================
// Play handlers
// ============================================================================

/// Handle game_start tool call
async fn handle_start(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: StartParams = match arguments {
        Some(args) => parse_arguments("game_start", Some(args))?,
        None => StartParams { game_id: None },
    };
    let game_id = params
        .game_id
        .unwrap_or_else(|| state.config.game.default_game.clone());

    let graph = state.registry.require(&game_id)?;
    let stored = StoredSession::new(graph.id());
    state.storage.create_session(&stored).await?;

    let play = PlaySession::new(graph);
    let view = play.current_view().ok_or(EngineError::SessionComplete)?;

    info!(session_id = %stored.id, game_id = %game_id, "Session started");
    state.sessions.lock().await.insert(stored.id.clone(), play);

    serde_json::to_value(StartResponse {
        session_id: stored.id,
        game_id,
        view,
    })
    .map_err(McpError::Json)
}

/// Handle game_select tool call
async fn handle_select(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SelectParams = parse_arguments("game_select", arguments)?;

    let mut sessions = state.sessions.lock().await;
    if !sessions.contains_key(&params.session_id) {
        let play = restore_session(state, &params.session_id).await?;
        sessions.insert(params.session_id.clone(), play);
    }
    let play = sessions
        .get_mut(&params.session_id)
        .ok_or_else(|| StorageError::SessionNotFound {
            session_id: params.session_id.clone(),
        })?;

    let feedback = play.select_choice(&params.choice_id)?;

    let sequence = play.session().events().len() as i64 - 1;
    let event = ChoiceMade::new(&feedback.scenario_id, &feedback.choice_id);
    let stored = StoredEvent::new(&params.session_id, sequence, &event);
    if let Err(e) = state.storage.append_event(&stored).await {
        // The live copy is ahead of the log; rebuild it on next use
        sessions.remove(&params.session_id);
        return Err(e.into());
    }

    serde_json::to_value(SelectResponse {
        session_id: params.session_id,
        feedback,
    })
    .map_err(McpError::Json)
}

/// Handle game_advance tool call
async fn handle_advance(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionParams = parse_arguments("game_advance", arguments)?;

    let mut sessions = state.sessions.lock().await;
    if !sessions.contains_key(&params.session_id) {
        let play = restore_session(state, &params.session_id).await?;
        sessions.insert(params.session_id.clone(), play);
    }
    let play = sessions
        .get_mut(&params.session_id)
        .ok_or_else(|| StorageError::SessionNotFound {
            session_id: params.session_id.clone(),
        })?;

    let outcome = play.advance()?;
    if let AdvanceOutcome::Complete { ref report } = outcome {
        if let Err(e) = state
            .storage
            .complete_session(&params.session_id, report)
            .await
        {
            sessions.remove(&params.session_id);
            return Err(e.into());
        }
    }

    serde_json::to_value(AdvanceResponse {
        session_id: params.session_id,
        outcome,
    })
    .map_err(McpError::Json)
}

/// Handle game_undo tool call
///
/// Drops the last choice and resumes at the scenario it was made in.
async fn handle_undo(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionParams = parse_arguments("game_undo", arguments)?;

    let mut sessions = state.sessions.lock().await;
    let play = match sessions.remove(&params.session_id) {
        Some(play) => play,
        None => restore_session(state, &params.session_id).await?,
    };

    if play.phase() == Phase::Complete {
        sessions.insert(params.session_id.clone(), play);
        return Err(EngineError::SessionComplete.into());
    }

    let mut session = play.session().clone();
    if let Err(e) = session.undo() {
        sessions.insert(params.session_id.clone(), play);
        return Err(e.into());
    }
    state.storage.pop_event(&params.session_id).await?;

    let play = PlaySession::from_session(session);
    let snapshot = SessionSnapshot::of(&params.session_id, &play);
    sessions.insert(params.session_id, play);

    serde_json::to_value(snapshot).map_err(McpError::Json)
}

/// Handle game_state tool call
async fn handle_state(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionParams = parse_arguments("game_state", arguments)?;

    let sessions = state.sessions.lock().await;
    let snapshot = match sessions.get(&params.session_id) {
        Some(play) => SessionSnapshot::of(&params.session_id, play),
        None => {
            let play = restore_session(state, &params.session_id).await?;
            SessionSnapshot::of(&params.session_id, &play)
        }
    };

    serde_json::to_value(snapshot).map_err(McpError::Json)
}

/// Handle game_resume tool call
///
/// Always rebuilds from storage, replacing any in-memory copy.
async fn handle_resume(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionParams = parse_arguments("game_resume", arguments)?;

    let play = restore_session(state, &params.session_id).await?;
    let snapshot = SessionSnapshot::of(&params.session_id, &play);

    info!(
        session_id = %params.session_id,
        phase = %play.phase(),
        choices = play.session().events().len(),
        "Session resumed"
    );
    state
        .sessions
        .lock()
        .await
        .insert(params.session_id, play);

    serde_json::to_value(snapshot).map_err(McpError::Json)
}

// ============================================================================
// Helper functions
// ============================================================================

/// Rebuild a play session by replaying its stored event log.
async fn restore_session(state: &SharedState, session_id: &str) -> McpResult<PlaySession> {
    let stored = state
        .storage
        .get_session(session_id)
        .await?
        .ok_or_else(|| StorageError::SessionNotFound {
            session_id: session_id.to_string(),
        })?;

    let graph = state.registry.require(&stored.game_id)?;
    let events: Vec<ChoiceMade> = state
        .storage
        .get_events(session_id)
        .await?
        .iter()
        .map(StoredEvent::to_choice)
        .collect();

    let session = Session::from_events(Arc::clone(&graph), events)?;
    match (session.is_complete(), stored.status) {
        // Terminal choice made but never advanced: finish on next advance
        (true, SessionStatus::Active) => Ok(PlaySession::pending_completion(session)),
        (false, SessionStatus::Complete) => {
            warn!(
                session_id = %session_id,
                status = %stored.status,
                "Stored status disagrees with replayed log"
            );
            Ok(PlaySession::from_session(session))
        }
        _ => Ok(PlaySession::from_session(session)),
    }
}

/// Helper to parse arguments with consistent error handling
fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::config::{DatabaseConfig, GameConfig, LogFormat, LoggingConfig};
    use crate::scenarios::GameRegistry;
    use crate::server::AppState;
    use crate::storage::SqliteStorage;
    use serde_json::json;
    use std::path::PathBuf;

    async fn test_state() -> SharedState {
        let config = Config {
            database: DatabaseConfig {
                path: PathBuf::from(":memory:"),
                max_connections: 1,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
            game: GameConfig::default(),
        };
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        Arc::new(AppState::new(config, storage, Arc::new(GameRegistry::new())))
    }

    async fn start(state: &SharedState, game_id: &str) -> String {
        let result = handle_tool_call(state, "game_start", Some(json!({ "game_id": game_id })))
            .await
            .unwrap();
        result["session_id"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_parse_start_params() {
        let params: StartParams =
            parse_arguments("game_start", Some(json!({ "game_id": "salaried_fire" }))).unwrap();
        assert_eq!(params.game_id.as_deref(), Some("salaried_fire"));

        let params: StartParams = parse_arguments("game_start", Some(json!({}))).unwrap();
        assert!(params.game_id.is_none());
    }

    #[test]
    fn test_parse_session_params_missing_arguments() {
        let result: McpResult<SessionParams> = parse_arguments("game_advance", None);
        let err = result.unwrap_err();
        assert!(matches!(err, McpError::InvalidParameters { .. }));
        assert!(err.to_string().contains("Missing arguments"));
        assert!(err.to_string().contains("game_advance"));
    }

    #[test]
    fn test_parse_select_params_wrong_type() {
        let args = Some(json!({
            "session_id": "abc",
            "choice_id": 3
        }));

        let result: McpResult<SelectParams> = parse_arguments("game_select", args);
        let err = result.unwrap_err();
        assert!(matches!(err, McpError::InvalidParameters { .. }));
        assert!(err.to_string().contains("game_select"));
    }

    #[test]
    fn test_parse_select_params_missing_choice() {
        let result: McpResult<SelectParams> =
            parse_arguments("game_select", Some(json!({ "session_id": "abc" })));
        assert!(matches!(
            result.unwrap_err(),
            McpError::InvalidParameters { .. }
        ));
    }

    #[test]
    fn test_parse_select_params() {
        let params: SelectParams = parse_arguments(
            "game_select",
            Some(json!({ "session_id": "abc", "choice_id": "skip_trip" })),
        )
        .unwrap();
        assert_eq!(params.session_id, "abc");
        assert_eq!(params.choice_id, "skip_trip");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let state = test_state().await;
        let err = handle_tool_call(&state, "game_teleport", None)
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::UnknownTool { .. }));
    }

    #[tokio::test]
    async fn test_list_and_validate() {
        let state = test_state().await;

        let list = handle_tool_call(&state, "game_list", None).await.unwrap();
        assert_eq!(list["count"], 3);

        let report = handle_tool_call(&state, "game_validate", None)
            .await
            .unwrap();
        assert_eq!(report["valid"], true);
        assert_eq!(report["reports"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_validate_inline_definition() {
        let state = test_state().await;
        let definition = json!({
            "id": "broken",
            "name": "Broken",
            "start": "missing",
            "scenarios": []
        });
        let report = handle_tool_call(
            &state,
            "game_validate",
            Some(json!({ "definition": definition })),
        )
        .await
        .unwrap();
        assert_eq!(report["valid"], false);
    }

    #[tokio::test]
    async fn test_full_playthrough_persists() {
        let state = test_state().await;
        let session_id = start(&state, "multi_path_stage1").await;

        let selected = handle_tool_call(
            &state,
            "game_select",
            Some(json!({ "session_id": session_id, "choice_id": "strategic_planner" })),
        )
        .await
        .unwrap();
        assert_eq!(selected["feedback"]["ends_session"], true);

        let advanced = handle_tool_call(
            &state,
            "game_advance",
            Some(json!({ "session_id": session_id })),
        )
        .await
        .unwrap();
        assert_eq!(advanced["status"], "complete");
        assert_eq!(advanced["report"]["score"], 95);

        let stored = state.storage.get_session(&session_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Complete);
        assert_eq!(stored.summary.unwrap().score, 95);
    }

    #[tokio::test]
    async fn test_resume_rebuilds_from_storage() {
        let state = test_state().await;
        let session_id = start(&state, "multi_path_stage1").await;
        handle_tool_call(
            &state,
            "game_select",
            Some(json!({ "session_id": session_id, "choice_id": "social_first" })),
        )
        .await
        .unwrap();

        // Forget the live copy
        state.sessions.lock().await.clear();

        let resumed = handle_tool_call(
            &state,
            "game_resume",
            Some(json!({ "session_id": session_id })),
        )
        .await
        .unwrap();
        assert_eq!(resumed["phase"], "presenting_choices");
        assert_eq!(resumed["view"]["scenario_id"], "social_pressure_test");
        assert_eq!(resumed["state"]["score"], 40);
    }

    #[tokio::test]
    async fn test_undo_drops_last_choice() {
        let state = test_state().await;
        let session_id = start(&state, "multi_path_stage1").await;
        handle_tool_call(
            &state,
            "game_select",
            Some(json!({ "session_id": session_id, "choice_id": "social_first" })),
        )
        .await
        .unwrap();

        let undone = handle_tool_call(
            &state,
            "game_undo",
            Some(json!({ "session_id": session_id })),
        )
        .await
        .unwrap();
        assert_eq!(undone["view"]["scenario_id"], "money_mindset_start");
        assert_eq!(undone["state"]["score"], 0);
        assert!(state.storage.get_events(&session_id).await.unwrap().is_empty());

        let err = handle_tool_call(
            &state,
            "game_undo",
            Some(json!({ "session_id": session_id })),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Nothing to undo"));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let state = test_state().await;
        let err = handle_tool_call(
            &state,
            "game_state",
            Some(json!({ "session_id": "missing" })),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Session not found"));
    }

    #[tokio::test]
    async fn test_invalid_choice_is_not_persisted() {
        let state = test_state().await;
        let session_id = start(&state, "salaried_fire").await;
        let err = handle_tool_call(
            &state,
            "game_select",
            Some(json!({ "session_id": session_id, "choice_id": "nope" })),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, McpError::ExecutionFailed { .. }));
        assert!(state.storage.get_events(&session_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unadvanced_terminal_choice_completes_after_restart() {
        let state = test_state().await;
        let session_id = start(&state, "multi_path_stage1").await;
        handle_tool_call(
            &state,
            "game_select",
            Some(json!({ "session_id": session_id, "choice_id": "strategic_planner" })),
        )
        .await
        .unwrap();

        // Restart before the feedback was acknowledged
        state.sessions.lock().await.clear();

        let snapshot = handle_tool_call(
            &state,
            "game_state",
            Some(json!({ "session_id": session_id })),
        )
        .await
        .unwrap();
        assert_eq!(snapshot["phase"], "showing_feedback");
        assert!(snapshot.get("report").is_none());

        let advanced = handle_tool_call(
            &state,
            "game_advance",
            Some(json!({ "session_id": session_id })),
        )
        .await
        .unwrap();
        assert_eq!(advanced["status"], "complete");
        assert_eq!(advanced["report"]["score"], 95);

        let stored = state.storage.get_session(&session_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Complete);
        assert_eq!(stored.summary.unwrap().score, 95);
    }

    #[tokio::test]
    async fn test_failed_append_evicts_live_session() {
        let state = test_state().await;
        let session_id = start(&state, "multi_path_stage1").await;
        sqlx::query("DROP TABLE choice_events")
            .execute(state.storage.pool())
            .await
            .unwrap();

        let err = handle_tool_call(
            &state,
            "game_select",
            Some(json!({ "session_id": session_id, "choice_id": "social_first" })),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, McpError::ExecutionFailed { .. }));
        assert!(!state.sessions.lock().await.contains_key(&session_id));

        // Without the log the session cannot be rebuilt, so it is never
        // reported past the unrecorded choice
        let result = handle_tool_call(
            &state,
            "game_state",
            Some(json!({ "session_id": session_id })),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_failed_completion_is_retried_on_next_advance() {
        let state = test_state().await;
        let session_id = start(&state, "multi_path_stage1").await;
        handle_tool_call(
            &state,
            "game_select",
            Some(json!({ "session_id": session_id, "choice_id": "strategic_planner" })),
        )
        .await
        .unwrap();

        sqlx::query(
            "CREATE TRIGGER hold_sessions BEFORE UPDATE ON sessions \
             BEGIN SELECT RAISE(ABORT, 'sessions are read-only'); END",
        )
        .execute(state.storage.pool())
        .await
        .unwrap();

        let err = handle_tool_call(
            &state,
            "game_advance",
            Some(json!({ "session_id": session_id })),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, McpError::ExecutionFailed { .. }));
        assert!(!state.sessions.lock().await.contains_key(&session_id));

        sqlx::query("DROP TRIGGER hold_sessions")
            .execute(state.storage.pool())
            .await
            .unwrap();

        let advanced = handle_tool_call(
            &state,
            "game_advance",
            Some(json!({ "session_id": session_id })),
        )
        .await
        .unwrap();
        assert_eq!(advanced["status"], "complete");

        let stored = state.storage.get_session(&session_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Complete);
        assert!(stored.summary.is_some());
    }
}
