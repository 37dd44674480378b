//! Event-sourced play sessions.
//!
//! A session is an append-only log of [`ChoiceMade`] events. Every derived
//! value (position, path, score, traits) is a pure fold over that log via
//! [`fold`], which makes replay, undo and redo trivial.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

use super::accumulator::Accumulator;
use crate::error::{EngineError, EngineResult};
use crate::scenarios::{Advance, Scenario, ScenarioGraph, Walker};

/// One choice the player made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceMade {
    /// Scenario the choice was made in.
    pub scenario_id: String,
    /// Chosen choice id.
    pub choice_id: String,
}

impl ChoiceMade {
    /// Create an event.
    pub fn new(scenario_id: impl Into<String>, choice_id: impl Into<String>) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            choice_id: choice_id.into(),
        }
    }
}

/// Snapshot of a made choice and its consequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRecord {
    pub scenario_id: String,
    pub choice_id: String,
    pub text: String,
    pub tags: BTreeSet<String>,
    pub score: i64,
    pub impact: BTreeMap<String, i64>,
}

/// State derived from a session's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Game being played.
    pub game_id: String,
    /// Scenario awaiting a choice; `None` once complete.
    pub current: Option<String>,
    /// Visited scenario ids, in order, starting with the start scenario.
    pub path: Vec<String>,
    /// Choices made, in order.
    pub history: Vec<ChoiceRecord>,
    /// Score with the policy applied.
    pub score: i64,
    /// Unbounded score sum.
    pub raw_score: i64,
    /// Trait totals with the policy applied.
    pub traits: BTreeMap<String, i64>,
    /// Unbounded trait sums, seeds included.
    pub raw_traits: BTreeMap<String, i64>,
    /// Number of scenarios completed.
    pub scenarios_completed: usize,
    /// Whether a terminal choice has been made.
    pub complete: bool,
}

impl SessionState {
    /// Trait total with the policy applied; 0 when absent.
    pub fn trait_value(&self, name: &str) -> i64 {
        self.traits.get(name).copied().unwrap_or(0)
    }
}

/// Fold an event log into session state.
///
/// Every event is re-validated against the graph: the event's scenario must
/// be the current one and its choice must exist there. An event after
/// completion is rejected with `SessionComplete`.
pub fn fold(graph: &ScenarioGraph, events: &[ChoiceMade]) -> EngineResult<SessionState> {
    let definition = graph.definition();
    let walker = Walker::new(graph);
    let mut acc = Accumulator::new(&definition.policy, &definition.initial_traits);

    let mut current = Some(graph.start().to_string());
    let mut path = vec![graph.start().to_string()];
    let mut history = Vec::with_capacity(events.len());

    for event in events {
        let Some(at) = current.as_deref() else {
            return Err(EngineError::SessionComplete);
        };
        if at != event.scenario_id {
            return Err(EngineError::InvalidTransition {
                action: format!("choose in '{}'", event.scenario_id),
                phase: format!("at scenario '{}'", at),
            });
        }

        let step = walker.step(at, &event.choice_id)?;
        acc.apply(step.choice);
        history.push(ChoiceRecord {
            scenario_id: event.scenario_id.clone(),
            choice_id: step.choice.id.clone(),
            text: step.choice.text.clone(),
            tags: step.choice.tags.clone(),
            score: step.choice.score,
            impact: step.choice.impact.clone(),
        });

        current = match step.next {
            Advance::To(next) => {
                path.push(next.clone());
                Some(next)
            }
            Advance::Complete => None,
        };
    }

    Ok(SessionState {
        game_id: graph.id().to_string(),
        complete: current.is_none(),
        current,
        path,
        scenarios_completed: history.len(),
        history,
        score: acc.score(),
        raw_score: acc.raw_score(),
        traits: acc.traits(),
        raw_traits: acc.raw_traits().clone(),
    })
}

/// A single-player playthrough of one game.
#[derive(Debug, Clone)]
pub struct Session {
    graph: Arc<ScenarioGraph>,
    events: Vec<ChoiceMade>,
    undone: Vec<ChoiceMade>,
    state: SessionState,
}

impl Session {
    /// Start a new session at the game's start scenario with seed traits.
    pub fn new(graph: Arc<ScenarioGraph>) -> Self {
        let state = SessionState {
            game_id: graph.id().to_string(),
            current: Some(graph.start().to_string()),
            path: vec![graph.start().to_string()],
            history: Vec::new(),
            score: graph.definition().policy.score.apply(0),
            raw_score: 0,
            traits: Accumulator::new(
                &graph.definition().policy,
                &graph.definition().initial_traits,
            )
            .traits(),
            raw_traits: graph.definition().initial_traits.clone(),
            scenarios_completed: 0,
            complete: false,
        };

        Self {
            graph,
            events: Vec::new(),
            undone: Vec::new(),
            state,
        }
    }

    /// Rebuild a session by replaying stored events.
    pub fn from_events(graph: Arc<ScenarioGraph>, events: Vec<ChoiceMade>) -> EngineResult<Self> {
        let state = fold(&graph, &events)?;
        Ok(Self {
            graph,
            events,
            undone: Vec::new(),
            state,
        })
    }

    /// Make a choice in the current scenario.
    ///
    /// Appends one event, clears the redo stack and returns the record of
    /// the choice.
    pub fn choose(&mut self, choice_id: &str) -> EngineResult<&ChoiceRecord> {
        let event = self.next_event(choice_id)?;
        self.push(event)?;
        self.undone.clear();
        self.last_record()
    }

    /// Remove the most recent event.
    pub fn undo(&mut self) -> EngineResult<ChoiceMade> {
        let event = self.events.pop().ok_or(EngineError::NothingToUndo)?;
        self.state = fold(&self.graph, &self.events)?;
        debug!(game_id = %self.graph.id(), choice_id = %event.choice_id, "Undid choice");
        self.undone.push(event.clone());
        Ok(event)
    }

    /// Re-apply the most recently undone event.
    pub fn redo(&mut self) -> EngineResult<&ChoiceRecord> {
        let event = self.undone.pop().ok_or(EngineError::NothingToRedo)?;
        self.push(event)?;
        self.last_record()
    }

    fn next_event(&self, choice_id: &str) -> EngineResult<ChoiceMade> {
        let current = self
            .state
            .current
            .as_deref()
            .ok_or(EngineError::SessionComplete)?;
        // Fail fast before touching the log
        Walker::new(&self.graph).choice(current, choice_id)?;
        Ok(ChoiceMade::new(current, choice_id))
    }

    fn push(&mut self, event: ChoiceMade) -> EngineResult<()> {
        self.events.push(event);
        match fold(&self.graph, &self.events) {
            Ok(state) => {
                self.state = state;
                Ok(())
            }
            Err(e) => {
                self.events.pop();
                Err(e)
            }
        }
    }

    fn last_record(&self) -> EngineResult<&ChoiceRecord> {
        self.state.history.last().ok_or(EngineError::NothingToUndo)
    }

    /// Derived state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Event log.
    pub fn events(&self) -> &[ChoiceMade] {
        &self.events
    }

    /// The game graph.
    pub fn graph(&self) -> &Arc<ScenarioGraph> {
        &self.graph
    }

    /// Scenario awaiting a choice.
    pub fn current_scenario(&self) -> Option<&Scenario> {
        self.state
            .current
            .as_deref()
            .and_then(|id| self.graph.get(id))
    }

    /// Whether a terminal choice has been made.
    pub fn is_complete(&self) -> bool {
        self.state.complete
    }
}
