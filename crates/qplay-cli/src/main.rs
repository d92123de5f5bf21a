//! qplay CLI - Train and inspect the platformer Q-learning agent
//!
//! Training runs against the built-in simulated console; snapshots written
//! by `train` can be examined afterwards with `inspect`.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::unused_async)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_precision_loss)]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{inspect, train};

#[derive(Parser)]
#[command(name = "qplay")]
#[command(author, version, about = "qplay - Q-learning agent for side-scrolling platformers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to QPLAY_CONFIG, ./qplay.toml, then the user config dir)
    #[arg(short, long, global = true, env = "QPLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the agent against the simulated console
    Train(train::TrainArgs),

    /// Summarize a saved training snapshot
    Inspect(inspect::InspectArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(commands::config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load(cli.config.as_deref())?;
    init_logging(&config.logging, cli.verbose);

    match cli.command {
        Commands::Train(args) => train::run(args, config).await,
        Commands::Inspect(args) => inspect::run(&args, &config),
        Commands::Config(cmd) => commands::config::run(cmd, &config).await,
    }
}

/// Install the tracing subscriber, teeing to a log file when one is configured
fn init_logging(logging: &config::LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("qplay={level},qplay_rl={level},qplay_core={level}").into()
    });

    if logging.file.is_empty() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        return;
    }

    let log_path = std::path::Path::new(&logging.file);
    let log_dir = log_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(std::path::Path::new("."));
    let log_filename = log_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("qplay.log");

    match std::fs::create_dir_all(log_dir) {
        Ok(()) => {
            let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(non_blocking),
                )
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
                .init();

            // The writer must outlive every log call
            Box::leak(Box::new(guard));
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            eprintln!(
                "Warning: Could not set up file logging to '{}': {}. Using stdout only.",
                logging.file, e
            );
        }
    }
}
