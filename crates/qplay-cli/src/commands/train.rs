//! Training command

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use qplay_core::{sim, SimulatedConsole};
use qplay_rl::{Trainer, TrainerStats, TrainingSnapshot};

use crate::config::Config;

#[derive(Args)]
pub struct TrainArgs {
    /// Stop after this many episodes (overrides training.max_episodes)
    #[arg(short, long)]
    pub episodes: Option<u64>,

    /// RNG seed (overrides training.seed)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Snapshot file (overrides training.snapshot_path)
    #[arg(short, long)]
    pub snapshot: Option<PathBuf>,

    /// Continue from the snapshot file if it exists
    #[arg(short, long)]
    pub resume: bool,
}

/// Run training on a blocking thread until the episode budget is spent or Ctrl-C
pub async fn run(args: TrainArgs, config: Config) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));

    let signal_stop = Arc::clone(&stop);
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after the current step");
            signal_stop.store(true, Ordering::Relaxed);
        }
    });

    let result = tokio::task::spawn_blocking(move || train(&args, &config, &stop))
        .await
        .context("Training task panicked")?;
    signal_task.abort();

    let stats = result?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn train(args: &TrainArgs, config: &Config, stop: &AtomicBool) -> Result<TrainerStats> {
    if config.agent.encoder.page_width != sim::PAGE_WIDTH {
        bail!(
            "agent.encoder.page_width is {} but the simulated console scrolls {} units per page",
            config.agent.encoder.page_width,
            sim::PAGE_WIDTH
        );
    }
    let rng = match args.seed.or(config.training.seed) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let console = SimulatedConsole::new(config.environment.level.clone());
    let mut trainer = Trainer::new(console, SimulatedConsole::memory_map(), &config.agent, rng)?;

    let snapshot_path = args
        .snapshot
        .clone()
        .or_else(|| config.training.snapshot_path());

    if args.resume {
        match &snapshot_path {
            Some(path) if path.exists() => {
                let snapshot = TrainingSnapshot::load(path)
                    .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
                trainer.restore(snapshot)?;
            }
            Some(path) => warn!("No snapshot at {}, starting fresh", path.display()),
            None => warn!("--resume given but no snapshot path is configured"),
        }
    }

    let max_episodes = args.episodes.or(config.training.max_episodes);
    let snapshot_every = config.training.snapshot_every;
    info!(
        "Training session {} (episodes: {})",
        trainer.session_id(),
        max_episodes.map_or_else(|| "unbounded".to_string(), |n| n.to_string())
    );

    let stats = trainer.run_with(max_episodes, stop, |trainer, summary| {
        if let Some(path) = &snapshot_path {
            if snapshot_every > 0 && summary.generation % snapshot_every == 0 {
                save_snapshot(trainer, path)?;
            }
        }
        Ok(())
    })?;

    if let Some(path) = &snapshot_path {
        save_snapshot(&trainer, path)?;
    }
    Ok(stats)
}

fn save_snapshot(trainer: &Trainer<SimulatedConsole>, path: &Path) -> Result<()> {
    let snapshot = trainer.snapshot();
    snapshot
        .save(path)
        .with_context(|| format!("Failed to save snapshot {}", path.display()))?;
    info!(
        "Saved snapshot to {} ({} states, generation {})",
        path.display(),
        snapshot.store.len(),
        snapshot.generation
    );
    Ok(())
}
