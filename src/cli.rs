//! Command-line interface: game catalog commands and the terminal presenter.
//!
//! The terminal presenter drives a [`PlaySession`] over any async
//! reader/writer pair, so the same loop serves stdin/stdout and tests.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::engine::{
    summarize, AdvanceOutcome, ChoiceMade, FeedbackView, Phase, PlaySession, ScenarioView,
    Session, SummaryReport,
};
use crate::error::{AppError, AppResult, EngineError, StorageError};
use crate::scenarios::{validate, GameRegistry, ScenarioGraph, ScenarioPack, ValidationReport};
use crate::storage::{SessionStatus, Storage, StoredEvent, StoredSession};

/// Branching financial-literacy scenario engine.
#[derive(Parser, Debug)]
#[command(name = "finquest", version, about)]
pub struct Cli {
    /// Command to run (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the MCP server over stdio
    Serve,

    /// List registered games
    List,

    /// Validate scenario graphs
    Validate {
        /// Only validate this game
        #[arg(long)]
        game: Option<String>,

        /// Validate a scenario pack file instead of the registered games
        #[arg(long)]
        pack: Option<PathBuf>,
    },

    /// Play a game in the terminal
    Play {
        /// Game to play (defaults to DEFAULT_GAME)
        game: Option<String>,

        /// Continue a stored session instead of starting a new one
        #[arg(long, value_name = "SESSION_ID", conflicts_with = "game")]
        resume: Option<String>,

        /// Skip transition delays between scenarios
        #[arg(long)]
        no_delay: bool,
    },

    /// Print the summary of a stored session
    Replay {
        /// Session ID
        session_id: String,
    },

    /// List stored sessions
    Sessions {
        /// Only sessions of this game
        #[arg(long)]
        game: Option<String>,
    },
}

/// Result of CLI command execution.
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

const RULE: &str = "───────────────────────────────────────────────────────────────\n";

/// Execute the catalog commands that need no storage.
pub fn execute_catalog_command(command: &Commands, registry: &GameRegistry) -> Option<CliResult> {
    match command {
        Commands::List => Some(execute_list(registry)),
        Commands::Validate { game, pack } => Some(execute_validate(registry, game, pack)),
        _ => None,
    }
}

/// Execute the commands that read stored sessions.
pub async fn execute_storage_command<S: Storage>(
    command: &Commands,
    registry: &GameRegistry,
    storage: &S,
) -> Option<CliResult> {
    match command {
        Commands::Replay { session_id } => Some(execute_replay(registry, storage, session_id).await),
        Commands::Sessions { game } => Some(execute_sessions(storage, game.as_deref()).await),
        _ => None,
    }
}

fn execute_list(registry: &GameRegistry) -> CliResult {
    let games = registry.list();
    let mut output = format!("\nRegistered games ({})\n", games.len());
    output.push_str(RULE);

    for game in games {
        output.push_str(&format!(
            "  {:<24} {:>3} scenarios  {}\n",
            game.id, game.scenario_count, game.name
        ));
    }

    CliResult::success(output)
}

fn execute_validate(
    registry: &GameRegistry,
    game: &Option<String>,
    pack: &Option<PathBuf>,
) -> CliResult {
    let reports: Vec<ValidationReport> = if let Some(path) = pack {
        match ScenarioPack::from_file(path) {
            Ok(pack) => pack
                .games
                .iter()
                .filter(|g| game.as_ref().map_or(true, |id| &g.id == id))
                .map(validate)
                .collect(),
            Err(e) => return CliResult::error(format!("Failed to load pack: {}", e)),
        }
    } else if let Some(id) = game {
        match registry.require(id) {
            Ok(graph) => vec![validate(graph.definition())],
            Err(e) => return CliResult::error(e.to_string()),
        }
    } else {
        registry
            .list()
            .iter()
            .filter_map(|g| registry.get(&g.id))
            .map(|graph| validate(graph.definition()))
            .collect()
    };

    let output = render_validation(&reports);
    if reports.iter().all(|r| r.is_valid()) {
        CliResult::success(output)
    } else {
        CliResult::error(output)
    }
}

async fn execute_replay<S: Storage>(
    registry: &GameRegistry,
    storage: &S,
    session_id: &str,
) -> CliResult {
    let stored = match storage.get_session(session_id).await {
        Ok(Some(s)) => s,
        Ok(None) => return CliResult::error(format!("Session not found: {}", session_id)),
        Err(e) => return CliResult::error(format!("Failed to load session: {}", e)),
    };

    if let Some(report) = stored.summary {
        return CliResult::success(render_report(&report));
    }

    // Still in progress: report on the choices made so far
    let graph = match registry.require(&stored.game_id) {
        Ok(g) => g,
        Err(e) => return CliResult::error(e.to_string()),
    };
    let events = match storage.get_events(session_id).await {
        Ok(events) => events.iter().map(StoredEvent::to_choice).collect(),
        Err(e) => return CliResult::error(format!("Failed to load events: {}", e)),
    };
    match Session::from_events(graph, events) {
        Ok(session) => {
            let report = summarize(session.graph().definition(), session.state());
            let mut output = format!(
                "\nSession {} is in progress ({} choices made)\n",
                session_id,
                session.events().len()
            );
            output.push_str(&render_report(&report));
            CliResult::success(output)
        }
        Err(e) => CliResult::error(format!("Stored log does not replay: {}", e)),
    }
}

async fn execute_sessions<S: Storage>(storage: &S, game: Option<&str>) -> CliResult {
    let sessions = match storage.list_sessions(game).await {
        Ok(s) => s,
        Err(e) => return CliResult::error(format!("Failed to list sessions: {}", e)),
    };

    let mut output = format!("\nStored sessions ({})\n", sessions.len());
    output.push_str(RULE);
    for session in sessions {
        let score = session
            .summary
            .as_ref()
            .map(|r| r.score.to_string())
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!(
            "  {}  {:<20} {:<8} score {:>5}  {}\n",
            session.id,
            session.game_id,
            session.status.to_string(),
            score,
            session.created_at.format("%Y-%m-%d %H:%M")
        ));
    }

    CliResult::success(output)
}

/// Play a game interactively, persisting every choice.
///
/// Returns the report when the game was finished, or `None` when the
/// player quit or input ended first. A quit session stays resumable.
pub async fn execute_play<S, R, W>(
    graph: Arc<ScenarioGraph>,
    storage: &S,
    reader: R,
    writer: W,
    delay: Option<Duration>,
) -> AppResult<Option<SummaryReport>>
where
    S: Storage,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let stored = StoredSession::new(graph.id());
    storage.create_session(&stored).await?;
    info!(session_id = %stored.id, game_id = %graph.id(), "Terminal session started");

    let play = PlaySession::new(graph).with_on_complete(log_finished);

    let report = play_loop(play, &stored.id, storage, reader, writer, delay).await?;
    if let Some(ref report) = report {
        storage.complete_session(&stored.id, report).await?;
    }
    Ok(report)
}

/// Rebuild an unfinished stored session for terminal play.
pub async fn load_session<S: Storage>(
    registry: &GameRegistry,
    storage: &S,
    session_id: &str,
) -> AppResult<Session> {
    let stored = storage
        .get_session(session_id)
        .await?
        .ok_or_else(|| StorageError::SessionNotFound {
            session_id: session_id.to_string(),
        })?;
    if stored.status == SessionStatus::Complete {
        return Err(EngineError::SessionComplete.into());
    }

    let graph = registry.require(&stored.game_id)?;
    let events = storage
        .get_events(session_id)
        .await?
        .iter()
        .map(StoredEvent::to_choice)
        .collect();
    Ok(Session::from_events(graph, events)?)
}

/// Continue a stored session interactively.
///
/// A session whose final choice was saved but never acknowledged is
/// finished straight away.
pub async fn execute_resume<S, R, W>(
    session: Session,
    session_id: &str,
    storage: &S,
    reader: R,
    mut writer: W,
    delay: Option<Duration>,
) -> AppResult<Option<SummaryReport>>
where
    S: Storage,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!(
        session_id = %session_id,
        choices = session.events().len(),
        "Terminal session resumed"
    );
    let mut play = PlaySession::pending_completion(session).with_on_complete(log_finished);

    let report = if play.phase() == Phase::ShowingFeedback {
        match play.advance()? {
            AdvanceOutcome::Complete { report } => {
                write_out(&mut writer, &render_report(&report)).await?;
                Some(report)
            }
            AdvanceOutcome::Next { .. } => {
                play_loop(play, session_id, storage, reader, writer, delay).await?
            }
        }
    } else {
        play_loop(play, session_id, storage, reader, writer, delay).await?
    };

    if let Some(ref report) = report {
        storage.complete_session(session_id, report).await?;
    }
    Ok(report)
}

fn log_finished(report: &SummaryReport) {
    info!(
        game_id = %report.game_id,
        tier = ?report.tier.as_ref().map(|t| t.label.as_str()),
        "Playthrough finished"
    );
}

/// Select-then-continue loop over a reader and writer.
pub async fn play_loop<S, R, W>(
    mut play: PlaySession,
    session_id: &str,
    storage: &S,
    mut reader: R,
    mut writer: W,
    delay: Option<Duration>,
) -> AppResult<Option<SummaryReport>>
where
    S: Storage,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    while let Some(view) = play.current_view() {
        write_out(&mut writer, &render_view(&view)).await?;

        let choice_id = loop {
            write_out(&mut writer, &format!("Choose 1-{} (q to quit): ", view.choices.len()))
                .await?;
            line.clear();
            if reader.read_line(&mut line).await.map_err(io_error)? == 0 {
                return Ok(None);
            }
            let input = line.trim();
            if input.eq_ignore_ascii_case("q") {
                write_out(
                    &mut writer,
                    &format!(
                        "\nProgress saved. Resume with: finquest play --resume {}\n",
                        session_id
                    ),
                )
                .await?;
                return Ok(None);
            }
            match resolve_choice(&view, input) {
                Some(id) => break id,
                None => write_out(&mut writer, "Not a valid choice.\n").await?,
            }
        };

        let feedback = play.select_choice(&choice_id)?;
        let sequence = play.session().events().len() as i64 - 1;
        let event = ChoiceMade::new(&feedback.scenario_id, &feedback.choice_id);
        storage
            .append_event(&StoredEvent::new(session_id, sequence, &event))
            .await?;
        write_out(&mut writer, &render_feedback(&feedback)).await?;

        write_out(&mut writer, "Press Enter to continue...").await?;
        line.clear();
        reader.read_line(&mut line).await.map_err(io_error)?;

        match play.advance()? {
            AdvanceOutcome::Next { .. } => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
            }
            AdvanceOutcome::Complete { report } => {
                write_out(&mut writer, &render_report(&report)).await?;
                return Ok(Some(report));
            }
        }
    }

    Ok(play.report().cloned())
}

/// Map player input (1-based index or choice id) to a choice id.
fn resolve_choice(view: &ScenarioView, input: &str) -> Option<String> {
    if let Ok(index) = input.parse::<usize>() {
        return index
            .checked_sub(1)
            .and_then(|i| view.choices.get(i))
            .map(|c| c.id.clone());
    }
    view.choices
        .iter()
        .find(|c| c.id == input)
        .map(|c| c.id.clone())
}

async fn write_out<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> AppResult<()> {
    writer.write_all(text.as_bytes()).await.map_err(io_error)?;
    writer.flush().await.map_err(io_error)
}

fn io_error(e: std::io::Error) -> AppError {
    AppError::Internal {
        message: format!("Terminal I/O failed: {}", e),
    }
}

/// Render a scenario and its numbered choices.
pub fn render_view(view: &ScenarioView) -> String {
    let mut output = format!("\n{}. {}\n", view.step, view.title);
    output.push_str(RULE);
    if !view.description.is_empty() {
        output.push_str(&view.description);
        output.push_str("\n\n");
    }
    for (i, choice) in view.choices.iter().enumerate() {
        output.push_str(&format!("  {}) {}\n", i + 1, choice.text));
    }
    output
}

/// Render the consequences of a choice.
pub fn render_feedback(feedback: &FeedbackView) -> String {
    let mut output = format!("\n> {}\n", feedback.text);
    output.push_str(&format!("  Score {:+}\n", feedback.score));
    for (name, delta) in &feedback.impact {
        output.push_str(&format!("  {} {:+}\n", name, delta));
    }
    for item in &feedback.feedback {
        output.push_str(&format!("  [{}] {}\n", item.horizon, item.text));
    }
    if feedback.ends_session {
        output.push_str("\nThis was your final decision.\n");
    }
    output
}

/// Render an end-of-game report.
pub fn render_report(report: &SummaryReport) -> String {
    let mut output = format!("\n{} - Summary\n", report.game_name);
    output.push_str(RULE);
    output.push_str(&format!("Score: {}\n", report.score));
    output.push_str(&format!("Scenarios completed: {}\n", report.scenarios_completed));

    if !report.traits.is_empty() {
        output.push_str("Traits:\n");
        for (name, value) in &report.traits {
            output.push_str(&format!("  {:<18} {}\n", name, value));
        }
    }

    if let Some(ref tier) = report.tier {
        output.push_str(&format!("\n{}\n{}\n", tier.label, tier.narrative));
    }

    if !report.mistakes.is_empty() {
        output.push_str("\nMistakes:\n");
        for (mistake, advice) in report.mistakes.iter().zip(&report.advice) {
            output.push_str(&format!("  - {}\n    Tip: {}\n", mistake, advice));
        }
    }

    for highlight in &report.highlights {
        output.push_str(&format!("\n{}\n", highlight));
    }

    output
}

/// Render validation reports, one block per game.
pub fn render_validation(reports: &[ValidationReport]) -> String {
    let mut output = String::new();
    for report in reports {
        let status = if report.is_valid() { "OK" } else { "INVALID" };
        output.push_str(&format!("{:<24} {}\n", report.game_id, status));
        for error in &report.errors {
            output.push_str(&format!("  error: {}\n", error));
        }
        for id in &report.unreachable {
            output.push_str(&format!("  warning: unreachable scenario {}\n", id));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ChoiceOption;
    use crate::scenarios::multi_path_stage1_game;
    use crate::storage::{SessionStatus, SqliteStorage};

    fn view() -> ScenarioView {
        ScenarioView {
            game_id: "g".to_string(),
            scenario_id: "s".to_string(),
            title: "First Salary".to_string(),
            description: String::new(),
            choices: vec![
                ChoiceOption {
                    id: "save".to_string(),
                    text: "Save it".to_string(),
                },
                ChoiceOption {
                    id: "spend".to_string(),
                    text: "Spend it".to_string(),
                },
            ],
            step: 1,
        }
    }

    #[test]
    fn test_cli_result_success() {
        let result = CliResult::success("test message");
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.message, "test message");
    }

    #[test]
    fn test_cli_result_error() {
        let result = CliResult::error("error message");
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.message, "error message");
    }

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["finquest"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["finquest", "play", "salaried_fire", "--no-delay"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Play {
                game: Some("salaried_fire".to_string()),
                resume: None,
                no_delay: true,
            })
        );

        let cli = Cli::try_parse_from(["finquest", "play", "--resume", "abc"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Play {
                game: None,
                resume: Some("abc".to_string()),
                no_delay: false,
            })
        );
        assert!(Cli::try_parse_from(["finquest", "play", "x", "--resume", "abc"]).is_err());

        let cli = Cli::try_parse_from(["finquest", "validate", "--game", "x"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Validate {
                game: Some("x".to_string()),
                pack: None,
            })
        );

        assert!(Cli::try_parse_from(["finquest", "replay"]).is_err());
    }

    #[test]
    fn test_resolve_choice() {
        let view = view();
        assert_eq!(resolve_choice(&view, "1").as_deref(), Some("save"));
        assert_eq!(resolve_choice(&view, "spend").as_deref(), Some("spend"));
        assert!(resolve_choice(&view, "0").is_none());
        assert!(resolve_choice(&view, "3").is_none());
        assert!(resolve_choice(&view, "invest").is_none());
    }

    #[test]
    fn test_render_view_numbers_choices() {
        let text = render_view(&view());
        assert!(text.contains("1. First Salary"));
        assert!(text.contains("  1) Save it"));
        assert!(text.contains("  2) Spend it"));
    }

    #[test]
    fn test_list_and_validate_builtins() {
        let registry = GameRegistry::new();
        let list = execute_catalog_command(&Commands::List, &registry).unwrap();
        assert_eq!(list.exit_code, 0);
        assert!(list.message.contains("salaried_fire"));

        let validate = execute_catalog_command(
            &Commands::Validate {
                game: None,
                pack: None,
            },
            &registry,
        )
        .unwrap();
        assert_eq!(validate.exit_code, 0);
        assert!(validate.message.contains("multi_path_stage1"));
        assert!(!validate.message.contains("INVALID"));

        let unknown = execute_catalog_command(
            &Commands::Validate {
                game: Some("nope".to_string()),
                pack: None,
            },
            &registry,
        )
        .unwrap();
        assert_eq!(unknown.exit_code, 1);
    }

    #[tokio::test]
    async fn test_play_to_completion() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let graph = Arc::new(ScenarioGraph::new(multi_path_stage1_game()).unwrap());

        // social_first -> skip_trip -> accept_course
        let input = "2\n\nskip_trip\n\n9\n1\n\n";
        let mut output = Vec::new();
        let report = execute_play(graph, &storage, input.as_bytes(), &mut output, None)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.choices, vec!["social_first", "skip_trip", "accept_course"]);
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Not a valid choice."));
        assert!(text.contains("Summary"));

        let sessions = storage.list_sessions(None).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status, SessionStatus::Complete);
        assert_eq!(storage.get_events(&sessions[0].id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_quit_leaves_session_active() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let graph = Arc::new(ScenarioGraph::new(multi_path_stage1_game()).unwrap());

        let mut output = Vec::new();
        let report = execute_play(graph, &storage, "2\n\nq\n".as_bytes(), &mut output, None)
            .await
            .unwrap();
        assert!(report.is_none());

        let sessions = storage.list_sessions(None).await.unwrap();
        assert_eq!(sessions[0].status, SessionStatus::Active);

        let registry = GameRegistry::new();
        let replay = execute_storage_command(
            &Commands::Replay {
                session_id: sessions[0].id.clone(),
            },
            &registry,
            &storage,
        )
        .await
        .unwrap();
        assert_eq!(replay.exit_code, 0);
        assert!(replay.message.contains("in progress (1 choices made)"));
    }

    #[tokio::test]
    async fn test_quit_then_resume_to_completion() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let registry = GameRegistry::new();
        let graph = registry.require("multi_path_stage1").unwrap();

        let mut output = Vec::new();
        execute_play(graph, &storage, "2\n\nq\n".as_bytes(), &mut output, None)
            .await
            .unwrap();
        let session_id = storage.list_sessions(None).await.unwrap()[0].id.clone();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains(&format!("finquest play --resume {}", session_id)));

        let session = load_session(&registry, &storage, &session_id).await.unwrap();
        assert_eq!(session.events().len(), 1);

        let mut output = Vec::new();
        let report = execute_resume(
            session,
            &session_id,
            &storage,
            "skip_trip\n\n1\n\n".as_bytes(),
            &mut output,
            None,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(report.choices, vec!["social_first", "skip_trip", "accept_course"]);

        let stored = storage.get_session(&session_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Complete);
        assert_eq!(storage.get_events(&session_id).await.unwrap().len(), 3);

        let err = load_session(&registry, &storage, &session_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Engine(EngineError::SessionComplete)));
    }

    #[tokio::test]
    async fn test_resume_finishes_unacknowledged_final_choice() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let registry = GameRegistry::new();

        // Final choice saved, session never marked complete
        let stored = StoredSession::new("multi_path_stage1");
        storage.create_session(&stored).await.unwrap();
        let event = ChoiceMade::new("money_mindset_start", "strategic_planner");
        storage
            .append_event(&StoredEvent::new(&stored.id, 0, &event))
            .await
            .unwrap();

        let session = load_session(&registry, &storage, &stored.id).await.unwrap();
        let mut output = Vec::new();
        let report = execute_resume(session, &stored.id, &storage, "".as_bytes(), &mut output, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.score, 95);
        assert!(String::from_utf8(output).unwrap().contains("Summary"));

        let stored = storage.get_session(&stored.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Complete);

        let err = load_session(&registry, &storage, "missing").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Storage(StorageError::SessionNotFound { .. })
        ));
    }
}
