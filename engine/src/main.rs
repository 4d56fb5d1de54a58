// Kiln code-generation assistant
// Main entry point for the kiln binary

use clap::Parser;
use kiln_engine::cli::{Cli, Command};
use kiln_engine::config::Config;
use kiln_engine::handlers::{
    handle_agent, handle_ask, handle_doctor, handle_forget, handle_generate, handle_history,
    handle_projects, handle_serve, handle_setup, OutputFormat,
};
use kiln_engine::telemetry::{init_telemetry, init_telemetry_with_level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup writes the config, so it must not require one
    if let Command::Setup = cli.command {
        init_telemetry_with_level(cli.log.as_deref().unwrap_or("warn"));
        return handle_setup(cli.config.as_deref()).await;
    }

    // Load configuration (or use custom path if provided)
    let config = match &cli.config {
        Some(config_path) => Config::load_from_path(config_path),
        None => Config::load_or_create(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            init_telemetry();
            return Err(e.into());
        }
    };

    // --log wins over the config file; RUST_LOG wins over both
    init_telemetry_with_level(cli.log.as_deref().unwrap_or(&config.core.log_level));

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Kiln v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Setup => Ok(()),

        Command::Agent => {
            tracing::info!("Starting agent session");
            handle_agent(&config, format).await
        }

        Command::Ask { prompt } => handle_ask(prompt, &config, format).await,

        Command::Generate { prompt, run, zip } => {
            tracing::info!("Generating project (run: {})", run);
            handle_generate(prompt, run, zip, &config, format).await
        }

        Command::History { limit } => {
            tracing::info!("Showing last {} turns", limit);
            handle_history(limit, &config, format).await
        }

        Command::Forget => handle_forget(&config, format).await,

        Command::Projects => handle_projects(&config, format).await,

        Command::Serve { addr } => {
            tracing::info!("Starting HTTP server on {}", addr);
            handle_serve(addr, &config).await
        }

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }
    }
}
