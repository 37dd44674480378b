//! End-of-session assessment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::session::SessionState;
use crate::scenarios::{GameDefinition, Metric, SummaryRules, Tier};

/// Tier selected for a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierOutcome {
    pub label: String,
    pub narrative: String,
    /// Metric value the tier was chosen on.
    pub value: i64,
}

/// Human-readable end-of-session report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub game_id: String,
    pub game_name: String,
    pub score: i64,
    pub traits: BTreeMap<String, i64>,
    pub path: Vec<String>,
    pub choices: Vec<String>,
    pub scenarios_completed: usize,
    pub mistakes: Vec<String>,
    pub advice: Vec<String>,
    pub highlights: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<TierOutcome>,
}

/// Value of a metric for a session.
pub fn metric_value(metric: &Metric, state: &SessionState) -> i64 {
    match metric {
        Metric::Score => state.score,
        Metric::Trait(name) => state.trait_value(name),
    }
}

/// First tier whose lower bound the value meets.
pub fn select_tier(tiers: &[Tier], value: i64) -> Option<&Tier> {
    tiers
        .iter()
        .find(|t| t.min.map_or(true, |min| value >= min))
}

/// Mistake and advice lists fired by the tags in the history.
///
/// Each rule fires at most once, in rule order, when any recorded choice
/// carries its tag.
pub fn tag_findings(rules: &SummaryRules, state: &SessionState) -> (Vec<String>, Vec<String>) {
    let mut mistakes = Vec::new();
    let mut advice = Vec::new();

    for rule in &rules.tag_rules {
        if state.history.iter().any(|c| c.tags.contains(&rule.tag)) {
            mistakes.push(rule.mistake.clone());
            advice.push(rule.advice.clone());
        }
    }

    (mistakes, advice)
}

/// Summarize a session. Deterministic in the history and final totals.
pub fn summarize(definition: &GameDefinition, state: &SessionState) -> SummaryReport {
    let rules = &definition.summary;
    let (mistakes, advice) = tag_findings(rules, state);

    let highlights = if mistakes.is_empty() {
        vec![rules.fallback.clone()]
    } else {
        Vec::new()
    };

    let value = metric_value(&rules.tier_metric, state);
    let tier = select_tier(&rules.tiers, value).map(|t| TierOutcome {
        label: t.label.clone(),
        narrative: t.narrative.clone(),
        value,
    });

    SummaryReport {
        game_id: definition.id.clone(),
        game_name: definition.name.clone(),
        score: state.score,
        traits: state.traits.clone(),
        path: state.path.clone(),
        choices: state.history.iter().map(|c| c.choice_id.clone()).collect(),
        scenarios_completed: state.scenarios_completed,
        mistakes,
        advice,
        highlights,
        tier,
    }
}
