//! JSON scenario packs loaded at startup.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::types::GameDefinition;
use crate::error::{ScenarioError, ScenarioResult};

/// A file containing one or more game definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioPack {
    /// Games in this pack.
    #[serde(default)]
    pub games: Vec<GameDefinition>,
}

impl ScenarioPack {
    /// Parse a pack from JSON text.
    pub fn from_json(json: &str) -> ScenarioResult<Self> {
        serde_json::from_str(json).map_err(|e| ScenarioError::Pack {
            message: format!("Invalid pack JSON: {}", e),
        })
    }

    /// Read and parse a pack file.
    pub fn from_file(path: &Path) -> ScenarioResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ScenarioError::Pack {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        Self::from_json(&text)
    }
}
