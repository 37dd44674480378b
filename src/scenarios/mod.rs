//! Scenario graphs: the static data the games are walked over.
//!
//! This module provides:
//! - `GameDefinition`: serializable scenario graph plus per-game tuning
//! - `validate` / `ScenarioGraph`: load-time integrity checks and lookup
//! - `Walker`: one-edge-at-a-time traversal
//! - `GameRegistry`: registration and lookup of games
//! - Built-in games and JSON pack loading

mod builtins;
mod graph;
mod pack;
mod registry;
mod types;
mod walker;

pub use builtins::*;
pub use graph::{validate, ScenarioGraph, ValidationReport, MAX_CHOICES};
pub use pack::ScenarioPack;
pub use registry::GameRegistry;
pub use types::*;
pub use walker::{Advance, Step, Walker};
