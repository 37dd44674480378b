//! Scenario engine: sessions, accumulation, assessment and the play loop.
//!
//! Dependency order: `session` (event log + fold, built on `accumulator`)
//! -> `summary` (reads session state) -> `presenter` (drives both).

mod accumulator;
mod presenter;
mod session;
mod summary;

pub use accumulator::Accumulator;
pub use presenter::{
    AdvanceOutcome, ChoiceOption, FeedbackView, OnComplete, Phase, PlaySession, ScenarioView,
};
pub use session::{fold, ChoiceMade, ChoiceRecord, Session, SessionState};
pub use summary::{metric_value, select_tier, summarize, tag_findings, SummaryReport, TierOutcome};
