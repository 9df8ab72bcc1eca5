use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wasm_stepper::cli::{Cli, Commands, Verbosity};
use wasm_stepper::Config;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    let verbosity = cli.verbosity();
    let config = Config::load(cli.config.as_deref())?;

    // A configured level applies only when no verbosity flag was given
    let level = match (&config.logging.level, verbosity) {
        (Some(level), Verbosity::Normal) => level.clone(),
        _ => verbosity.to_log_level(),
    };
    let json = config.logging.json;

    // Logs go to stderr so that --output json keeps stdout parseable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();

    // Execute command with verbosity
    match cli.command {
        Commands::Run(args) => {
            wasm_stepper::cli::commands::run(args, verbosity, &config)?;
        }
        Commands::Interactive(args) => {
            wasm_stepper::cli::commands::interactive(args, verbosity, &config)?;
        }
        Commands::Inspect(args) => {
            wasm_stepper::cli::commands::inspect(args, verbosity, &config)?;
        }
    }

    Ok(())
}
