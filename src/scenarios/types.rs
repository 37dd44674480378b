//! Data types for scenario games.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Time horizon a piece of choice feedback talks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Horizon {
    /// Right after the choice.
    Immediate,
    /// A few weeks to months out.
    ShortTerm,
    /// Three months out.
    ThreeMonths,
    /// One year out.
    OneYear,
    /// Several years out.
    LongTerm,
    /// Five years out.
    FiveYears,
}

impl Horizon {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Horizon::Immediate => "immediate",
            Horizon::ShortTerm => "short_term",
            Horizon::ThreeMonths => "three_months",
            Horizon::OneYear => "one_year",
            Horizon::LongTerm => "long_term",
            Horizon::FiveYears => "five_years",
        }
    }

    /// Label used by the terminal presenter.
    pub fn label(&self) -> &'static str {
        match self {
            Horizon::Immediate => "Immediately",
            Horizon::ShortTerm => "Short term",
            Horizon::ThreeMonths => "In 3 months",
            Horizon::OneYear => "In 1 year",
            Horizon::LongTerm => "Long term",
            Horizon::FiveYears => "In 5 years",
        }
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Feedback text attached to a choice for one horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// Horizon this text describes.
    pub horizon: Horizon,
    /// Narrative text.
    pub text: String,
}

/// An edge in the scenario graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Identifier, unique within the owning scenario only.
    pub id: String,
    /// Display text.
    pub text: String,
    /// Scenario reached by this choice. `None` ends the game.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_scenario: Option<String>,
    /// Score contribution.
    #[serde(default)]
    pub score: i64,
    /// Named trait and financial deltas.
    #[serde(default)]
    pub impact: BTreeMap<String, i64>,
    /// Feedback for one or more horizons.
    #[serde(default)]
    pub feedback: Vec<Feedback>,
    /// Structured outcome tags read by the summarizer.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Choice {
    /// Create a terminal choice with no score or impact.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            next_scenario: None,
            score: 0,
            impact: BTreeMap::new(),
            feedback: Vec::new(),
            tags: BTreeSet::new(),
        }
    }

    /// Set the scenario this choice leads to.
    pub fn leads_to(mut self, scenario_id: impl Into<String>) -> Self {
        self.next_scenario = Some(scenario_id.into());
        self
    }

    /// Set the score contribution.
    pub fn with_score(mut self, score: i64) -> Self {
        self.score = score;
        self
    }

    /// Add a trait or financial delta.
    pub fn with_impact(mut self, name: impl Into<String>, delta: i64) -> Self {
        self.impact.insert(name.into(), delta);
        self
    }

    /// Add feedback for a horizon.
    pub fn with_feedback(mut self, horizon: Horizon, text: impl Into<String>) -> Self {
        self.feedback.push(Feedback {
            horizon,
            text: text.into(),
        });
        self
    }

    /// Add an outcome tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// A node in the scenario graph: one decision point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Identifier, unique within the game.
    pub id: String,
    /// Short title.
    pub title: String,
    /// Situation description shown to the player.
    #[serde(default)]
    pub description: String,
    /// Outgoing edges (1-5).
    pub choices: Vec<Choice>,
}

impl Scenario {
    /// Create a scenario without choices.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            choices: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a choice.
    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    /// Find a choice by id.
    pub fn choice(&self, choice_id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }
}

/// Range policy for one accumulated value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Bounds {
    /// Plain running sum.
    #[default]
    Unclamped,
    /// Sum clamped to `[min, max]`.
    Clamped {
        /// Lower bound (inclusive).
        min: i64,
        /// Upper bound (inclusive).
        max: i64,
    },
}

impl Bounds {
    /// Apply the bounds to a total. `validate` rejects `min > max`.
    pub fn apply(&self, value: i64) -> i64 {
        match *self {
            Bounds::Unclamped => value,
            Bounds::Clamped { min, max } => value.clamp(min, max),
        }
    }
}

/// Accumulation policy for a game, configured per trait name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulationPolicy {
    /// Bounds for the total score.
    #[serde(default)]
    pub score: Bounds,
    /// Bounds per trait name.
    #[serde(default)]
    pub traits: BTreeMap<String, Bounds>,
    /// Bounds for traits not listed in `traits`.
    #[serde(default)]
    pub default_trait: Bounds,
}

impl AccumulationPolicy {
    /// Policy that never clamps anything.
    pub fn unclamped() -> Self {
        Self::default()
    }

    /// Set the score bounds.
    pub fn with_score(mut self, bounds: Bounds) -> Self {
        self.score = bounds;
        self
    }

    /// Set the bounds for one trait.
    pub fn with_trait(mut self, name: impl Into<String>, bounds: Bounds) -> Self {
        self.traits.insert(name.into(), bounds);
        self
    }

    /// Bounds that apply to the named trait.
    pub fn bounds_for(&self, name: &str) -> Bounds {
        self.traits.get(name).copied().unwrap_or(self.default_trait)
    }
}

/// A summary rule fired by an outcome tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRule {
    /// Tag that triggers the rule.
    pub tag: String,
    /// Narrative describing the mistake.
    pub mistake: String,
    /// Narrative with the corresponding advice.
    pub advice: String,
}

impl TagRule {
    /// Create a tag rule.
    pub fn new(
        tag: impl Into<String>,
        mistake: impl Into<String>,
        advice: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            mistake: mistake.into(),
            advice: advice.into(),
        }
    }
}

/// Value a game's tiers are bucketed on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// The final score.
    #[default]
    Score,
    /// A named trait total (after policy).
    Trait(String),
}

/// One outcome tier. Tiers are checked in order; the first match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    /// Short label (e.g. "FIRE Achieved").
    pub label: String,
    /// Minimum metric value (inclusive). `None` matches anything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    /// Narrative for this tier.
    pub narrative: String,
}

impl Tier {
    /// Create a tier with a lower bound.
    pub fn at_least(min: i64, label: impl Into<String>, narrative: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            min: Some(min),
            narrative: narrative.into(),
        }
    }

    /// Create a catch-all tier.
    pub fn otherwise(label: impl Into<String>, narrative: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            min: None,
            narrative: narrative.into(),
        }
    }
}

/// Narrative tuning for the end-of-game report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRules {
    /// Tag rules, evaluated in order.
    #[serde(default)]
    pub tag_rules: Vec<TagRule>,
    /// Value the tiers are bucketed on.
    #[serde(default)]
    pub tier_metric: Metric,
    /// Ordered tiers.
    #[serde(default)]
    pub tiers: Vec<Tier>,
    /// Highlight used when no tag rule fires.
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

fn default_fallback() -> String {
    "Excellent decision making! You avoided the common money traps in this game.".to_string()
}

impl Default for SummaryRules {
    fn default() -> Self {
        Self {
            tag_rules: Vec::new(),
            tier_metric: Metric::Score,
            tiers: Vec::new(),
            fallback: default_fallback(),
        }
    }
}

/// A complete, serializable game: the scenario graph plus its tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDefinition {
    /// Unique game identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// What the game teaches.
    #[serde(default)]
    pub description: String,
    /// Starting scenario id.
    pub start: String,
    /// Scenario nodes.
    pub scenarios: Vec<Scenario>,
    /// Ids that end the game when referenced as `next_scenario`.
    #[serde(default)]
    pub terminal_ids: BTreeSet<String>,
    /// Seed trait values.
    #[serde(default)]
    pub initial_traits: BTreeMap<String, i64>,
    /// Accumulation policy.
    #[serde(default)]
    pub policy: AccumulationPolicy,
    /// End-of-game narrative rules.
    #[serde(default)]
    pub summary: SummaryRules,
    /// Visual delay before the next scenario is shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_delay_ms: Option<u64>,
}

/// Brief game summary for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    /// Game identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Number of scenarios.
    pub scenario_count: usize,
    /// Starting scenario id.
    pub start: String,
}

impl GameDefinition {
    /// Create a summary from the full definition.
    pub fn to_summary(&self) -> GameSummary {
        GameSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            scenario_count: self.scenarios.len(),
            start: self.start.clone(),
        }
    }
}
