use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub game: GameConfig,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Scenario data and presentation configuration
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Extra JSON scenario pack loaded on top of the built-in games.
    pub pack_path: Option<PathBuf>,
    /// Game played when `play` is invoked without a game id.
    pub default_game: String,
    /// Honor per-game visual transition delays in the terminal presenter.
    pub transition_delays: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/finquest.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let pack_path = match env::var("SCENARIO_PACK_PATH") {
            Ok(p) if !p.trim().is_empty() => {
                let path = PathBuf::from(p);
                if !path.is_file() {
                    return Err(AppError::Config {
                        message: format!("SCENARIO_PACK_PATH not found: {}", path.display()),
                    });
                }
                Some(path)
            }
            _ => None,
        };

        let transition_delays = match env::var("TRANSITION_DELAYS") {
            Ok(v) => parse_bool(&v).ok_or_else(|| AppError::Config {
                message: format!("TRANSITION_DELAYS must be a boolean, got '{}'", v),
            })?,
            Err(_) => true,
        };

        let game = GameConfig {
            pack_path,
            default_game: env::var("DEFAULT_GAME")
                .unwrap_or_else(|_| "multi_path_stage1".to_string()),
            transition_delays,
        };

        Ok(Config {
            database,
            logging,
            game,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/finquest.db"),
            max_connections: 5,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            pack_path: None,
            default_game: "multi_path_stage1".to_string(),
            transition_delays: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" YES "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_game_config_default() {
        let config = GameConfig::default();
        assert!(config.pack_path.is_none());
        assert_eq!(config.default_game, "multi_path_stage1");
        assert!(config.transition_delays);
    }
}
