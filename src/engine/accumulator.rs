//! Score and trait accumulation.
//!
//! Raw totals are plain sums (`seed + Σ delta`). The game's policy is applied
//! to the folded total, so a clamped value is `clamp(seed + Σ delta, min, max)`.

use std::collections::BTreeMap;

use crate::scenarios::{AccumulationPolicy, Choice};

/// Running totals for one session.
#[derive(Debug, Clone)]
pub struct Accumulator<'p> {
    policy: &'p AccumulationPolicy,
    raw_score: i64,
    raw_traits: BTreeMap<String, i64>,
}

impl<'p> Accumulator<'p> {
    /// Start from the given seed values.
    pub fn new(policy: &'p AccumulationPolicy, seeds: &BTreeMap<String, i64>) -> Self {
        Self {
            policy,
            raw_score: 0,
            raw_traits: seeds.clone(),
        }
    }

    /// Add a choice's score and every declared delta.
    pub fn apply(&mut self, choice: &Choice) {
        self.raw_score = self.raw_score.saturating_add(choice.score);
        for (name, delta) in &choice.impact {
            let total = self.raw_traits.entry(name.clone()).or_insert(0);
            *total = total.saturating_add(*delta);
        }
    }

    /// Score with the policy applied.
    pub fn score(&self) -> i64 {
        self.policy.score.apply(self.raw_score)
    }

    /// Unbounded score sum.
    pub fn raw_score(&self) -> i64 {
        self.raw_score
    }

    /// Trait totals with the policy applied.
    pub fn traits(&self) -> BTreeMap<String, i64> {
        self.raw_traits
            .iter()
            .map(|(name, &v)| (name.clone(), self.policy.bounds_for(name).apply(v)))
            .collect()
    }

    /// Unbounded trait sums, seeds included.
    pub fn raw_traits(&self) -> &BTreeMap<String, i64> {
        &self.raw_traits
    }

    /// One trait with the policy applied; 0 if never seeded or touched.
    pub fn trait_value(&self, name: &str) -> i64 {
        let raw = self.raw_traits.get(name).copied().unwrap_or(0);
        self.policy.bounds_for(name).apply(raw)
    }
}
