//! recipebox CLI - runs and maintains the recipe API server
//!
//! Subcommands:
//! - `serve`: migrate, start the session pruner, run the HTTP API
//! - `migrate`: apply schema migrations and exit
//! - `prune-sessions`: delete expired sessions once
//! - `config`: print the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use recipebox_server::Settings;

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "recipebox",
    author,
    version,
    about = "Recipe management API server",
    long_about = "Serve and maintain the recipebox HTTP API: recipes with ingredients, \
                  ordered instructions, tags, and file uploads backed by PostgreSQL."
)]
struct Cli {
    /// Path to a TOML config file (default: ~/.recipebox/config.toml)
    #[arg(long, short = 'c', global = true, env = "RECIPEBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Export traces over OTLP (requires the telemetry feature)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Apply database migrations and exit
    Migrate,
    /// Delete expired sessions and print how many were removed
    PruneSessions,
    /// Print the effective configuration (secrets redacted)
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        json: cli.json_logs,
        otel: cli.otel,
    })
    .ok();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let outcome = match cli.command {
        Commands::Serve(args) => commands::run_serve(args, settings).await,
        Commands::Migrate => commands::run_migrate(settings).await,
        Commands::PruneSessions => commands::run_prune(settings).await,
        Commands::Config(args) => commands::run_config(args, cli.config.as_deref(), &settings),
    };

    tracing_setup::shutdown_otel();
    outcome
}
