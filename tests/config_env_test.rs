//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Note that Config::from_env() also loads
//! from .env file via dotenvy, so these tests focus on override behavior.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use finquest::config::{Config, LogFormat};
use serial_test::serial;
use std::env;
use std::io::Write;

#[test]
#[serial]
fn test_config_from_env_defaults() {
    env::remove_var("SCENARIO_PACK_PATH");
    env::remove_var("TRANSITION_DELAYS");
    env::remove_var("DEFAULT_GAME");

    let config = Config::from_env().unwrap();
    assert!(config.game.pack_path.is_none());
    assert!(config.game.transition_delays);
    assert_eq!(config.game.default_game, "multi_path_stage1");
}

#[test]
#[serial]
fn test_config_from_env_custom_database() {
    env::set_var("DATABASE_PATH", "/custom/path.db");
    env::set_var("DATABASE_MAX_CONNECTIONS", "10");

    let config = Config::from_env().unwrap();
    assert_eq!(config.database.path.to_str().unwrap(), "/custom/path.db");
    assert_eq!(config.database.max_connections, 10);

    // Restore defaults
    env::set_var("DATABASE_PATH", "./data/finquest.db");
    env::set_var("DATABASE_MAX_CONNECTIONS", "5");
}

#[test]
#[serial]
fn test_config_from_env_json_log_format() {
    env::set_var("LOG_FORMAT", "json");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);

    // Restore default
    env::set_var("LOG_FORMAT", "pretty");
}

#[test]
#[serial]
fn test_config_from_env_game_settings() {
    env::set_var("DEFAULT_GAME", "salaried_fire");
    env::set_var("TRANSITION_DELAYS", "off");

    let config = Config::from_env().unwrap();
    assert_eq!(config.game.default_game, "salaried_fire");
    assert!(!config.game.transition_delays);

    env::remove_var("DEFAULT_GAME");
    env::remove_var("TRANSITION_DELAYS");
}

#[test]
#[serial]
fn test_config_from_env_invalid_transition_delays() {
    env::set_var("TRANSITION_DELAYS", "sometimes");

    let err = Config::from_env().unwrap_err();
    assert!(err.to_string().contains("TRANSITION_DELAYS"));

    env::remove_var("TRANSITION_DELAYS");
}

#[test]
#[serial]
fn test_config_from_env_pack_path() {
    let mut pack = tempfile::NamedTempFile::new().unwrap();
    writeln!(pack, "{{\"games\": []}}").unwrap();
    env::set_var("SCENARIO_PACK_PATH", pack.path());

    let config = Config::from_env().unwrap();
    assert_eq!(config.game.pack_path.as_deref(), Some(pack.path()));

    env::set_var("SCENARIO_PACK_PATH", "/definitely/not/here.json");
    let err = Config::from_env().unwrap_err();
    assert!(err.to_string().contains("SCENARIO_PACK_PATH"));

    env::remove_var("SCENARIO_PACK_PATH");
}
