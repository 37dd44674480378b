//! One-edge-at-a-time traversal of a scenario graph.

use tracing::debug;

use super::graph::ScenarioGraph;
use super::types::{Choice, Scenario};
use crate::error::{ScenarioError, ScenarioResult};

/// Where a step leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Move to this scenario.
    To(String),
    /// No further node: the session ends.
    Complete,
}

impl Advance {
    /// Whether this step ends the session.
    pub fn is_complete(&self) -> bool {
        matches!(self, Advance::Complete)
    }
}

/// Result of taking one edge.
#[derive(Debug, Clone)]
pub struct Step<'g> {
    /// The matched choice.
    pub choice: &'g Choice,
    /// Where the choice leads.
    pub next: Advance,
}

/// Stateless walker over a validated graph.
///
/// A choice advances only when its `next_scenario` is present and is a key
/// of the graph. An absent target, a declared terminal id or any other
/// non-key target signals completion. Cycles are not detected.
#[derive(Debug, Clone, Copy)]
pub struct Walker<'g> {
    graph: &'g ScenarioGraph,
}

impl<'g> Walker<'g> {
    /// Create a walker for a graph.
    pub fn new(graph: &'g ScenarioGraph) -> Self {
        Self { graph }
    }

    /// Look up a scenario, failing with `UnknownScenario`.
    pub fn scenario(&self, scenario_id: &str) -> ScenarioResult<&'g Scenario> {
        self.graph
            .get(scenario_id)
            .ok_or_else(|| ScenarioError::UnknownScenario {
                game_id: self.graph.id().to_string(),
                scenario_id: scenario_id.to_string(),
            })
    }

    /// Look up a choice of a scenario, failing with `UnknownChoice`.
    pub fn choice(&self, scenario_id: &str, choice_id: &str) -> ScenarioResult<&'g Choice> {
        self.scenario(scenario_id)?
            .choice(choice_id)
            .ok_or_else(|| ScenarioError::UnknownChoice {
                scenario_id: scenario_id.to_string(),
                choice_id: choice_id.to_string(),
            })
    }

    /// Take the edge `choice_id` out of `current`.
    pub fn step(&self, current: &str, choice_id: &str) -> ScenarioResult<Step<'g>> {
        let choice = self.choice(current, choice_id)?;

        let next = match choice.next_scenario.as_deref() {
            Some(target) if self.graph.contains(target) => Advance::To(target.to_string()),
            _ => Advance::Complete,
        };

        debug!(
            game_id = %self.graph.id(),
            scenario_id = %current,
            choice_id = %choice_id,
            next = ?next,
            "Walker step"
        );

        Ok(Step { choice, next })
    }
}
