//! Configuration loading for the qplay CLI

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

use qplay_core::SimLevel;
use qplay_rl::AgentConfig;

/// Full CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub training: TrainingConfig,
    pub environment: EnvironmentConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Log file path; empty logs to stdout only
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Stop after this many episodes; unset trains until interrupted
    pub max_episodes: Option<u64>,
    /// RNG seed; unset seeds from the OS
    pub seed: Option<u64>,
    /// Snapshot file; empty disables snapshots
    pub snapshot_path: String,
    /// Save a snapshot every N finished episodes (0 saves only on exit)
    pub snapshot_every: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_episodes: None,
            seed: None,
            snapshot_path: String::new(),
            snapshot_every: 10,
        }
    }
}

impl TrainingConfig {
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        if self.snapshot_path.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.snapshot_path))
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Level layout for the simulated console
    pub level: SimLevel,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_file(),
        };

        let mut builder = ConfigBuilder::<config::builder::DefaultState>::default();

        if let Some(path) = &config_path {
            tracing::debug!("Loading config from: {:?}", path);
            builder = builder.add_source(File::from(path.clone()).required(explicit.is_some()));
        } else {
            tracing::debug!("No config file found, using defaults");
        }

        // Add environment variables with QPLAY_ prefix
        builder = builder.add_source(
            Environment::with_prefix("QPLAY")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.agent.validate()?;
        Ok(config)
    }

    /// Find the configuration file
    fn find_config_file() -> Option<PathBuf> {
        // Check in order: QPLAY_CONFIG env, ./qplay.toml, ~/.config/qplay/qplay.toml
        if let Ok(path) = std::env::var("QPLAY_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local = PathBuf::from("qplay.toml");
        if local.exists() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("qplay").join("qplay.toml"))
            .filter(|path| path.exists())
    }
}
