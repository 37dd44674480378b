//! # finquest
//!
//! A branching financial-literacy scenario engine. Players walk a directed
//! graph of scenarios, pick one choice per scenario, accumulate a score and
//! named personality/financial traits, and receive an end-of-game summary
//! of mistakes, advice and a narrative tier.
//!
//! ## Features
//!
//! - **Scenario graphs**: validated data-defined games with built-in titles
//!   and optional JSON scenario packs
//! - **Event-sourced sessions**: state is a pure fold over the choice log,
//!   with undo, redo and replay
//! - **Accumulation policies**: per-trait clamping or unbounded sums
//! - **Summaries**: tag-driven mistakes and advice plus threshold tiers
//! - **Frontends**: a terminal presenter and an MCP server over stdio
//!
//! ## Architecture
//!
//! ```text
//! CLI / MCP Client → PlaySession → Session (event log) → ScenarioGraph
//!                          ↓
//!                   SQLite (choice logs)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use finquest::engine::{AdvanceOutcome, PlaySession};
//! use finquest::scenarios::{multi_path_stage1_game, ScenarioGraph};
//!
//! let graph = Arc::new(ScenarioGraph::new(multi_path_stage1_game())?);
//! let mut play = PlaySession::new(graph);
//! play.select_choice("strategic_planner")?;
//! if let AdvanceOutcome::Complete { report } = play.advance()? {
//!     println!("{}", report.score);
//! }
//! ```

#![warn(missing_docs)]

/// Command-line interface and terminal presenter.
pub mod cli;
/// Configuration management.
pub mod config;
/// Sessions, accumulation, summaries and the presentation loop.
pub mod engine;
/// Error types and result aliases for the application.
pub mod error;
/// Scenario data model, validation, traversal and game registry.
pub mod scenarios;
/// MCP server implementation and request handling.
pub mod server;
/// SQLite storage layer for persistence.
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, McpServer, SharedState};
