//! Game registry for managing validated scenario graphs.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::{error, info};

use super::builtins;
use super::graph::ScenarioGraph;
use super::pack::ScenarioPack;
use super::types::{GameDefinition, GameSummary};
use crate::error::{ScenarioError, ScenarioResult};

/// Registry for scenario games.
///
/// Thread-safe storage for validated graphs with built-in games
/// automatically registered on creation. Graphs are shared as `Arc`s so
/// live sessions keep their graph even if the registry is dropped.
pub struct GameRegistry {
    games: RwLock<HashMap<String, Arc<ScenarioGraph>>>,
}

impl GameRegistry {
    /// Create a new registry with built-in games.
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register_builtins();
        registry
    }

    /// Create a registry without any games.
    pub fn empty() -> Self {
        Self {
            games: RwLock::new(HashMap::new()),
        }
    }

    /// Validate and register a game.
    ///
    /// # Errors
    /// Returns the first integrity error of the definition, or
    /// `DuplicateGame` if the id is taken.
    pub fn register(&self, definition: GameDefinition) -> ScenarioResult<()> {
        let graph = ScenarioGraph::new(definition)?;

        let mut games = self.games.write().unwrap_or_else(|e| e.into_inner());
        if games.contains_key(graph.id()) {
            return Err(ScenarioError::DuplicateGame {
                game_id: graph.id().to_string(),
            });
        }

        info!(game_id = %graph.id(), scenarios = graph.len(), "Registered game");
        games.insert(graph.id().to_string(), Arc::new(graph));
        Ok(())
    }

    /// Register every game of a pack file. Stops at the first invalid game.
    pub fn load_pack(&self, path: &Path) -> ScenarioResult<usize> {
        let pack = ScenarioPack::from_file(path)?;
        let count = pack.games.len();
        for game in pack.games {
            self.register(game)?;
        }
        info!(path = %path.display(), games = count, "Loaded scenario pack");
        Ok(count)
    }

    /// Get a game by id.
    pub fn get(&self, id: &str) -> Option<Arc<ScenarioGraph>> {
        self.games
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Get a game by id, failing with `UnknownGame`.
    pub fn require(&self, id: &str) -> ScenarioResult<Arc<ScenarioGraph>> {
        self.get(id).ok_or_else(|| ScenarioError::UnknownGame {
            game_id: id.to_string(),
        })
    }

    /// List all games, sorted by id.
    pub fn list(&self) -> Vec<GameSummary> {
        let mut games: Vec<_> = self
            .games
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|g| g.definition().to_summary())
            .collect();
        games.sort_by(|a, b| a.id.cmp(&b.id));
        games
    }

    /// Get the number of registered games.
    pub fn count(&self) -> usize {
        self.games.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn register_builtins(&self) {
        for game in builtins::builtin_games() {
            let id = game.id.clone();
            if let Err(e) = self.register(game) {
                error!(
                    game_id = %id,
                    error = %e,
                    "Failed to register builtin game - this indicates a data error"
                );
            }
        }
    }
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::types::{Choice, Scenario};
    use std::io::Write;

    fn test_game(id: &str) -> GameDefinition {
        GameDefinition {
            id: id.to_string(),
            name: format!("Test {}", id),
            description: "A test game".to_string(),
            start: "only".to_string(),
            scenarios: vec![Scenario::new("only", "Only").with_choice(Choice::new("end", "End"))],
            terminal_ids: Default::default(),
            initial_traits: Default::default(),
            policy: Default::default(),
            summary: Default::default(),
            transition_delay_ms: None,
        }
    }

    #[test]
    fn test_registry_new_has_builtins() {
        let registry = GameRegistry::new();
        assert_eq!(registry.count(), 3);
        assert!(registry.get("multi_path_stage1").is_some());
        assert!(registry.get("salaried_fire").is_some());
        assert!(registry.get("enhanced_salaried").is_some());
    }

    #[test]
    fn test_registry_register_and_get() {
        let registry = GameRegistry::empty();
        registry.register(test_game("custom")).unwrap();
        assert_eq!(registry.get("custom").unwrap().id(), "custom");
    }

    #[test]
    fn test_registry_duplicate_fails() {
        let registry = GameRegistry::empty();
        registry.register(test_game("dup")).unwrap();
        let err = registry.register(test_game("dup")).unwrap_err();
        assert_eq!(
            err,
            ScenarioError::DuplicateGame {
                game_id: "dup".to_string()
            }
        );
    }

    #[test]
    fn test_registry_rejects_invalid_game() {
        let registry = GameRegistry::empty();
        let mut game = test_game("broken");
        game.scenarios[0].choices[0].next_scenario = Some("missing".to_string());

        let err = registry.register(game).unwrap_err();
        assert!(matches!(err, ScenarioError::DanglingReference { .. }));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_registry_require_unknown() {
        let registry = GameRegistry::new();
        let err = registry.require("nonexistent").unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownGame { .. }));
    }

    #[test]
    fn test_registry_list_sorted() {
        let registry = GameRegistry::new();
        let ids: Vec<_> = registry.list().into_iter().map(|g| g.id).collect();
        assert_eq!(
            ids,
            vec!["enhanced_salaried", "multi_path_stage1", "salaried_fire"]
        );
    }

    #[test]
    fn test_registry_load_pack() {
        let pack = ScenarioPack {
            games: vec![test_game("from_pack")],
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&pack).unwrap()).unwrap();

        let registry = GameRegistry::new();
        assert_eq!(registry.load_pack(file.path()).unwrap(), 1);
        assert!(registry.get("from_pack").is_some());
        assert_eq!(registry.count(), 4);
    }
}
