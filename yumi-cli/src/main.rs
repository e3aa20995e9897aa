//! yumi - REST API for the yumi recipe community
//!
//! Entry point for the `yumi` binary:
//! - `serve` runs the HTTP API (schema applied at startup)
//! - `migrate` and `seed` prepare a database
//! - `calc` runs the nutrition calculators offline
//! - `config` inspects `~/.yumi/config.toml`

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod tracing_setup;

use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "yumi",
    author,
    version,
    about = "REST API server for the yumi recipe community",
    long_about = "Recipes, ratings, collections, events, meal plans and shopping lists over \
                  PostgreSQL, plus offline calorie and nutrition calculators."
)]
struct Cli {
    /// Debug logging (RUST_LOG still takes precedence)
    #[arg(long, global = true)]
    debug: bool,

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
    /// Create or update the database schema
    Migrate(commands::migrate::MigrateArgs),
    /// Insert reference data (categories, diets, units, conversions, colors)
    Seed(commands::seed::SeedArgs),
    /// Nutrition calculators (daily, recipe, ideal-weight)
    Calc(commands::calc::CalcArgs),
    /// Inspect yumi configuration (path, show)
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing so `env = ...` flags see .env values
    let env_files = config::load_dotenv();
    let cli = Cli::parse();

    tracing_setup::init(&TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })?;
    for path in &env_files {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let result = match cli.command {
        Commands::Serve(args) => commands::run_serve(args).await,
        Commands::Migrate(args) => commands::run_migrate(args).await,
        Commands::Seed(args) => commands::run_seed(args).await,
        Commands::Calc(args) => commands::run_calc(args),
        Commands::Config(args) => config::run_config(args),
    };

    tracing_setup::shutdown_otel();
    result
}
