use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use finquest::{
    cli::{
        execute_catalog_command, execute_play, execute_resume, execute_storage_command,
        load_session, Cli, Commands,
    },
    config::{Config, LogFormat},
    scenarios::{GameRegistry, ScenarioGraph},
    server::{AppState, McpServer},
    storage::SqliteStorage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "finquest starting...");

    // Built-in games plus the optional pack
    let registry = Arc::new(GameRegistry::new());
    if let Some(ref path) = config.game.pack_path {
        match registry.load_pack(path) {
            Ok(count) => info!(path = %path.display(), games = count, "Scenario pack loaded"),
            Err(e) => {
                error!(error = %e, path = %path.display(), "Failed to load scenario pack");
                return Err(e.into());
            }
        }
    }

    let command = cli.command.unwrap_or(Commands::Serve);

    if let Some(result) = execute_catalog_command(&command, &registry) {
        println!("{}", result.message.trim_end());
        std::process::exit(result.exit_code);
    }

    // Initialize storage
    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    if let Some(result) = execute_storage_command(&command, &registry, &storage).await {
        println!("{}", result.message.trim_end());
        std::process::exit(result.exit_code);
    }

    if let Commands::Play {
        game,
        resume,
        no_delay,
    } = command
    {
        let reader = BufReader::new(tokio::io::stdin());
        match resume {
            Some(session_id) => {
                let session = load_session(&registry, &storage, &session_id).await?;
                let delay = transition_delay(session.graph(), &config, no_delay);
                execute_resume(
                    session,
                    &session_id,
                    &storage,
                    reader,
                    tokio::io::stdout(),
                    delay,
                )
                .await?;
            }
            None => {
                let game_id = game.unwrap_or_else(|| config.game.default_game.clone());
                let graph = registry.require(&game_id)?;
                let delay = transition_delay(&graph, &config, no_delay);
                execute_play(graph, &storage, reader, tokio::io::stdout(), delay).await?;
            }
        }
        return Ok(());
    }

    // Create application state
    let state = Arc::new(AppState::new(config, storage, registry));

    // Start MCP server
    let server = McpServer::new(state);

    info!("Server ready, waiting for requests on stdin...");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn transition_delay(graph: &ScenarioGraph, config: &Config, no_delay: bool) -> Option<Duration> {
    graph
        .definition()
        .transition_delay_ms
        .filter(|_| config.game.transition_delays && !no_delay)
        .map(Duration::from_millis)
}
