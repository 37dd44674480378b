//! Validated scenario graphs.

use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::warn;

use super::types::{Bounds, GameDefinition, Scenario};
use crate::error::{ScenarioError, ScenarioResult};

/// Maximum number of choices a scenario may offer.
pub const MAX_CHOICES: usize = 5;

/// Outcome of a validation pass over a game definition.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// Validated game id.
    pub game_id: String,
    /// Data-integrity errors; any entry makes the game unloadable.
    #[serde(serialize_with = "serialize_errors")]
    pub errors: Vec<ScenarioError>,
    /// Scenarios no path from the start reaches. Reported, not rejected.
    pub unreachable: Vec<String>,
}

fn serialize_errors<S: Serializer>(errors: &[ScenarioError], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(errors.iter().map(|e| e.to_string()))
}

impl ValidationReport {
    /// True when the game has no errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of dangling `next_scenario` references found.
    pub fn dangling_count(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| matches!(e, ScenarioError::DanglingReference { .. }))
            .count()
    }
}

/// Run every integrity check over a definition.
///
/// Checks, in order: clamp ranges, duplicate scenario ids, start scenario
/// presence, choice counts, duplicate choice ids within a scenario, and
/// that every `next_scenario` is a scenario id or a declared terminal id.
pub fn validate(definition: &GameDefinition) -> ValidationReport {
    let mut errors = policy_errors(definition);
    let mut ids: HashSet<&str> = HashSet::new();

    for scenario in &definition.scenarios {
        if !ids.insert(scenario.id.as_str()) {
            errors.push(ScenarioError::DuplicateScenario {
                game_id: definition.id.clone(),
                scenario_id: scenario.id.clone(),
            });
        }
    }

    if !ids.contains(definition.start.as_str()) {
        errors.push(ScenarioError::UnknownStart {
            game_id: definition.id.clone(),
            start: definition.start.clone(),
        });
    }

    for scenario in &definition.scenarios {
        let count = scenario.choices.len();
        if count == 0 || count > MAX_CHOICES {
            errors.push(ScenarioError::ChoiceCount {
                scenario_id: scenario.id.clone(),
                count,
            });
        }

        let mut choice_ids: HashSet<&str> = HashSet::new();
        for choice in &scenario.choices {
            if !choice_ids.insert(choice.id.as_str()) {
                errors.push(ScenarioError::DuplicateChoice {
                    scenario_id: scenario.id.clone(),
                    choice_id: choice.id.clone(),
                });
            }

            if let Some(target) = &choice.next_scenario {
                if !ids.contains(target.as_str()) && !definition.terminal_ids.contains(target) {
                    errors.push(ScenarioError::DanglingReference {
                        scenario_id: scenario.id.clone(),
                        choice_id: choice.id.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
    }

    let unreachable = if ids.contains(definition.start.as_str()) {
        unreachable_scenarios(definition, &ids)
    } else {
        Vec::new()
    };

    ValidationReport {
        game_id: definition.id.clone(),
        errors,
        unreachable,
    }
}

fn policy_errors(definition: &GameDefinition) -> Vec<ScenarioError> {
    let policy = &definition.policy;
    let named = policy
        .traits
        .iter()
        .map(|(name, bounds)| (format!("trait '{}'", name), *bounds));

    [
        ("score".to_string(), policy.score),
        ("default trait".to_string(), policy.default_trait),
    ]
    .into_iter()
    .chain(named)
    .filter_map(|(target, bounds)| match bounds {
        Bounds::Clamped { min, max } if min > max => Some(ScenarioError::InvalidBounds {
            game_id: definition.id.clone(),
            target,
            min,
            max,
        }),
        _ => None,
    })
    .collect()
}

/// Breadth-first walk from the start over edges that land on scenario ids.
fn unreachable_scenarios(definition: &GameDefinition, ids: &HashSet<&str>) -> Vec<String> {
    let by_id: HashMap<&str, &Scenario> = definition
        .scenarios
        .iter()
        .map(|s| (s.id.as_str(), s))
        .collect();

    let mut seen: HashSet<&str> = HashSet::from([definition.start.as_str()]);
    let mut queue = VecDeque::from([definition.start.as_str()]);

    while let Some(id) = queue.pop_front() {
        let Some(scenario) = by_id.get(id) else {
            continue;
        };
        for target in scenario
            .choices
            .iter()
            .filter_map(|c| c.next_scenario.as_deref())
        {
            if ids.contains(target) && seen.insert(target) {
                queue.push_back(target);
            }
        }
    }

    definition
        .scenarios
        .iter()
        .filter(|s| !seen.contains(s.id.as_str()))
        .map(|s| s.id.clone())
        .collect()
}

/// A game whose definition passed validation, indexed for lookup.
#[derive(Debug, Clone)]
pub struct ScenarioGraph {
    definition: GameDefinition,
    index: HashMap<String, usize>,
}

impl ScenarioGraph {
    /// Validate a definition and index it.
    ///
    /// # Errors
    /// Returns the first integrity error found by [`validate`].
    pub fn new(definition: GameDefinition) -> ScenarioResult<Self> {
        let report = validate(&definition);
        if let Some(err) = report.errors.into_iter().next() {
            return Err(err);
        }
        if !report.unreachable.is_empty() {
            warn!(
                game_id = %definition.id,
                unreachable = ?report.unreachable,
                "Game has scenarios unreachable from the start"
            );
        }

        let index = definition
            .scenarios
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();

        Ok(Self { definition, index })
    }

    /// Game identifier.
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    /// Starting scenario id.
    pub fn start(&self) -> &str {
        &self.definition.start
    }

    /// The underlying definition.
    pub fn definition(&self) -> &GameDefinition {
        &self.definition
    }

    /// Look up a scenario.
    pub fn get(&self, scenario_id: &str) -> Option<&Scenario> {
        self.index
            .get(scenario_id)
            .map(|&i| &self.definition.scenarios[i])
    }

    /// Whether `scenario_id` is a node of this graph.
    pub fn contains(&self, scenario_id: &str) -> bool {
        self.index.contains_key(scenario_id)
    }

    /// Whether `scenario_id` is a declared terminal id.
    pub fn is_terminal_id(&self, scenario_id: &str) -> bool {
        self.definition.terminal_ids.contains(scenario_id)
    }

    /// Number of scenarios.
    pub fn len(&self) -> usize {
        self.definition.scenarios.len()
    }

    /// Whether the graph has no scenarios. Never true for a validated graph.
    pub fn is_empty(&self) -> bool {
        self.definition.scenarios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::types::Choice;

    fn two_step_game() -> GameDefinition {
        GameDefinition {
            id: "two_step".to_string(),
            name: "Two Step".to_string(),
            description: String::new(),
            start: "first".to_string(),
            scenarios: vec![
                Scenario::new("first", "First")
                    .with_choice(Choice::new("go", "Go").leads_to("second"))
                    .with_choice(Choice::new("stop", "Stop").leads_to("the_end")),
                Scenario::new("second", "Second").with_choice(Choice::new("done", "Done")),
            ],
            terminal_ids: ["the_end".to_string()].into(),
            initial_traits: Default::default(),
            policy: Default::default(),
            summary: Default::default(),
            transition_delay_ms: None,
        }
    }

    #[test]
    fn test_valid_game_has_no_errors() {
        let report = validate(&two_step_game());
        assert!(report.is_valid());
        assert_eq!(report.dangling_count(), 0);
        assert!(report.unreachable.is_empty());
    }

    #[test]
    fn test_dangling_reference_detected() {
        let mut game = two_step_game();
        game.terminal_ids.clear();

        let report = validate(&game);
        assert_eq!(report.dangling_count(), 1);
        assert_eq!(
            report.errors[0],
            ScenarioError::DanglingReference {
                scenario_id: "first".to_string(),
                choice_id: "stop".to_string(),
                target: "the_end".to_string(),
            }
        );
        assert!(ScenarioGraph::new(game).is_err());
    }

    #[test]
    fn test_duplicate_choice_detected() {
        let mut game = two_step_game();
        game.scenarios[1]
            .choices
            .push(Choice::new("done", "Done again"));

        let report = validate(&game);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ScenarioError::DuplicateChoice { choice_id, .. } if choice_id == "done")));
    }

    #[test]
    fn test_duplicate_scenario_detected() {
        let mut game = two_step_game();
        game.scenarios
            .push(Scenario::new("second", "Copy").with_choice(Choice::new("x", "X")));

        let report = validate(&game);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ScenarioError::DuplicateScenario { .. })));
    }

    #[test]
    fn test_choice_count_bounds() {
        let mut game = two_step_game();
        game.scenarios[1].choices.clear();
        let report = validate(&game);
        assert!(report
            .errors
            .contains(&ScenarioError::ChoiceCount {
                scenario_id: "second".to_string(),
                count: 0
            }));

        let mut game = two_step_game();
        for i in 0..5 {
            game.scenarios[1]
                .choices
                .push(Choice::new(format!("extra_{}", i), "Extra"));
        }
        let report = validate(&game);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ScenarioError::ChoiceCount { count: 6, .. })));
    }

    #[test]
    fn test_inverted_clamp_range_detected() {
        let mut game = two_step_game();
        game.policy = crate::scenarios::AccumulationPolicy::unclamped()
            .with_score(Bounds::Clamped { min: 0, max: 300 })
            .with_trait("discipline", Bounds::Clamped { min: 100, max: 0 });

        let report = validate(&game);
        assert_eq!(
            report.errors,
            vec![ScenarioError::InvalidBounds {
                game_id: "two_step".to_string(),
                target: "trait 'discipline'".to_string(),
                min: 100,
                max: 0,
            }]
        );
        assert!(ScenarioGraph::new(game).is_err());

        let mut game = two_step_game();
        game.policy.default_trait = Bounds::Clamped { min: 1, max: -1 };
        let err = ScenarioGraph::new(game).unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidBounds { .. }));
    }

    #[test]
    fn test_unknown_start() {
        let mut game = two_step_game();
        game.start = "nowhere".to_string();

        let err = ScenarioGraph::new(game).unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownStart { .. }));
    }

    #[test]
    fn test_unreachable_reported_but_loadable() {
        let mut game = two_step_game();
        game.scenarios
            .push(Scenario::new("island", "Island").with_choice(Choice::new("swim", "Swim")));

        let report = validate(&game);
        assert!(report.is_valid());
        assert_eq!(report.unreachable, vec!["island".to_string()]);
        assert!(ScenarioGraph::new(game).is_ok());
    }

    #[test]
    fn test_graph_lookup() {
        let graph = ScenarioGraph::new(two_step_game()).unwrap();
        assert_eq!(graph.id(), "two_step");
        assert_eq!(graph.start(), "first");
        assert_eq!(graph.len(), 2);
        assert!(graph.contains("second"));
        assert!(!graph.contains("the_end"));
        assert!(graph.is_terminal_id("the_end"));
        assert_eq!(graph.get("second").map(|s| s.title.as_str()), Some("Second"));
    }

    #[test]
    fn test_report_serializes_errors_as_strings() {
        let mut game = two_step_game();
        game.terminal_ids.clear();
        let json = serde_json::to_value(validate(&game)).unwrap();
        assert_eq!(json["game_id"], "two_step");
        assert!(json["errors"][0]
            .as_str()
            .unwrap()
            .starts_with("Dangling reference"));
    }
}
