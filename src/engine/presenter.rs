//! Presentation/input loop state machine.
//!
//! Per scenario: `PresentingChoices` -> (select) -> `ShowingFeedback` ->
//! (advance) -> `PresentingChoices` for the next scenario or `Complete`.
//! There is no back-navigation at this level.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use super::session::Session;
use super::summary::{summarize, SummaryReport};
use crate::error::{EngineError, EngineResult};
use crate::scenarios::{Feedback, Scenario, ScenarioGraph};

/// Phase of the presentation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for the player to pick a choice.
    PresentingChoices,
    /// Showing the feedback of the picked choice.
    ShowingFeedback,
    /// The session has ended and the report is available.
    Complete,
}

impl Phase {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::PresentingChoices => "presenting choices",
            Phase::ShowingFeedback => "showing feedback",
            Phase::Complete => "complete",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A selectable choice as shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub text: String,
}

/// The current scenario as shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioView {
    pub game_id: String,
    pub scenario_id: String,
    pub title: String,
    pub description: String,
    pub choices: Vec<ChoiceOption>,
    /// 1-based position in the playthrough.
    pub step: usize,
}

impl ScenarioView {
    fn new(game_id: &str, scenario: &Scenario, step: usize) -> Self {
        Self {
            game_id: game_id.to_string(),
            scenario_id: scenario.id.clone(),
            title: scenario.title.clone(),
            description: scenario.description.clone(),
            choices: scenario
                .choices
                .iter()
                .map(|c| ChoiceOption {
                    id: c.id.clone(),
                    text: c.text.clone(),
                })
                .collect(),
            step,
        }
    }
}

/// Feedback payload for the selected choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackView {
    pub scenario_id: String,
    pub choice_id: String,
    pub text: String,
    pub score: i64,
    pub impact: BTreeMap<String, i64>,
    pub feedback: Vec<Feedback>,
    /// Whether continuing will end the session.
    pub ends_session: bool,
}

/// Outcome of `advance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// Next scenario to present.
    Next { view: ScenarioView },
    /// The session ended with this report.
    Complete { report: SummaryReport },
}

/// Callback fired once when a session completes.
pub type OnComplete = Box<dyn FnMut(&SummaryReport) + Send>;

/// A session wrapped in the select-then-continue loop.
pub struct PlaySession {
    session: Session,
    phase: Phase,
    report: Option<SummaryReport>,
    on_complete: Option<OnComplete>,
}

impl PlaySession {
    /// Start a new playthrough.
    pub fn new(graph: Arc<ScenarioGraph>) -> Self {
        Self::from_session(Session::new(graph))
    }

    /// Wrap an existing (possibly restored) session.
    ///
    /// A restored session resumes at `PresentingChoices` of its current
    /// scenario, or at `Complete` if its last choice was terminal. The
    /// completion callback is not fired for an already-complete session.
    pub fn from_session(session: Session) -> Self {
        let (phase, report) = if session.is_complete() {
            let report = summarize(session.graph().definition(), session.state());
            (Phase::Complete, Some(report))
        } else {
            (Phase::PresentingChoices, None)
        };

        Self {
            session,
            phase,
            report,
            on_complete: None,
        }
    }

    /// Wrap a restored session whose terminal choice was never advanced.
    ///
    /// Resumes at `ShowingFeedback` of the last scenario, so the next
    /// `advance` builds the report and fires the completion callback. A
    /// session still in progress resumes as in `from_session`.
    pub fn pending_completion(session: Session) -> Self {
        if !session.is_complete() {
            return Self::from_session(session);
        }

        Self {
            session,
            phase: Phase::ShowingFeedback,
            report: None,
            on_complete: None,
        }
    }

    /// Register the completion callback.
    pub fn with_on_complete(mut self, callback: impl FnMut(&SummaryReport) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Final report, once complete.
    pub fn report(&self) -> Option<&SummaryReport> {
        self.report.as_ref()
    }

    /// Scenario currently on screen: the one awaiting a choice, or the one
    /// whose feedback is shown. `None` once complete.
    pub fn current_view(&self) -> Option<ScenarioView> {
        let state = self.session.state();
        let (scenario_id, step) = match self.phase {
            Phase::PresentingChoices => (state.current.as_deref()?, state.history.len() + 1),
            Phase::ShowingFeedback => {
                (state.history.last()?.scenario_id.as_str(), state.history.len())
            }
            Phase::Complete => return None,
        };
        let scenario = self.session.graph().get(scenario_id)?;
        Some(ScenarioView::new(self.session.graph().id(), scenario, step))
    }

    /// Pick a choice in the current scenario and show its feedback.
    pub fn select_choice(&mut self, choice_id: &str) -> EngineResult<FeedbackView> {
        self.expect_phase(Phase::PresentingChoices, "select a choice")?;

        let record = self.session.choose(choice_id)?.clone();
        let graph = self.session.graph();
        let feedback = graph
            .get(&record.scenario_id)
            .and_then(|s| s.choice(&record.choice_id))
            .map(|c| c.feedback.clone())
            .unwrap_or_default();

        self.phase = Phase::ShowingFeedback;

        Ok(FeedbackView {
            scenario_id: record.scenario_id,
            choice_id: record.choice_id,
            text: record.text,
            score: record.score,
            impact: record.impact,
            feedback,
            ends_session: self.session.is_complete(),
        })
    }

    /// Confirm the feedback and move on.
    ///
    /// On a terminal choice this builds the report, fires the completion
    /// callback exactly once and enters `Complete`.
    pub fn advance(&mut self) -> EngineResult<AdvanceOutcome> {
        self.expect_phase(Phase::ShowingFeedback, "advance")?;

        if self.session.is_complete() {
            let report = summarize(self.session.graph().definition(), self.session.state());
            info!(
                game_id = %report.game_id,
                score = report.score,
                scenarios_completed = report.scenarios_completed,
                "Session complete"
            );
            if let Some(mut callback) = self.on_complete.take() {
                callback(&report);
            }
            self.phase = Phase::Complete;
            self.report = Some(report.clone());
            return Ok(AdvanceOutcome::Complete { report });
        }

        self.phase = Phase::PresentingChoices;
        let view = self.current_view().ok_or(EngineError::SessionComplete)?;
        Ok(AdvanceOutcome::Next { view })
    }

    fn expect_phase(&self, expected: Phase, action: &str) -> EngineResult<()> {
        if self.phase == Phase::Complete {
            return Err(EngineError::SessionComplete);
        }
        if self.phase != expected {
            return Err(EngineError::InvalidTransition {
                action: action.to_string(),
                phase: self.phase.to_string(),
            });
        }
        Ok(())
    }
}
