//! Configuration management commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::config::Config;

const EXAMPLE_CONFIG: &str = include_str!("../../../../qplay.toml.example");

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration (file, environment and defaults merged)
    Show,
    /// Initialize configuration file
    Init {
        /// Where to write the file
        #[arg(short, long, default_value = "qplay.toml")]
        path: PathBuf,
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn run(cmd: ConfigCommands, config: &Config) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(config),
        ConfigCommands::Init { path, force } => init(&path, force),
    }
}

fn show(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}

fn init(path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Configuration file created: {}", path.display());
    Ok(())
}
