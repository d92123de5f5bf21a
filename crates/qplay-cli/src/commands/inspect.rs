//! Snapshot inspection command

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use qplay_rl::{ActionCatalog, StateId, TrainingSnapshot};

use crate::config::Config;

#[derive(Args)]
pub struct InspectArgs {
    /// Snapshot file written by `qplay train`
    pub snapshot: PathBuf,

    /// Show at most this many states
    #[arg(short, long, default_value_t = 50)]
    pub limit: usize,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StateRow {
    state: StateId,
    /// First world position covered by this state
    position: u64,
    best_action: String,
    best_value: f64,
}

#[derive(Debug, Serialize)]
struct InspectReport {
    session_id: String,
    saved_at: String,
    generation: u64,
    epsilon: f64,
    total_steps: u64,
    states_known: usize,
    states: Vec<StateRow>,
}

pub fn run(args: &InspectArgs, config: &Config) -> Result<()> {
    let snapshot = TrainingSnapshot::load(&args.snapshot)
        .with_context(|| format!("Failed to load snapshot {}", args.snapshot.display()))?;
    let catalog = ActionCatalog::standard(config.agent.actions);
    let report = build_report(&snapshot, &catalog, config.agent.encoder.bucket_size, args.limit);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Snapshot: {}", args.snapshot.display());
    println!("==========");
    println!("Session:     {}", report.session_id);
    println!("Saved at:    {}", report.saved_at);
    println!("Generation:  {}", report.generation);
    println!("Epsilon:     {:.3}", report.epsilon);
    println!("Total steps: {}", report.total_steps);
    println!("States:      {}", report.states_known);
    println!();
    println!("{:>8} {:>10} {:<20} {:>12}", "STATE", "POSITION", "BEST ACTION", "VALUE");
    for row in &report.states {
        println!(
            "{:>8} {:>10} {:<20} {:>12.3}",
            row.state, row.position, row.best_action, row.best_value
        );
    }
    if report.states.len() < report.states_known {
        println!("... {} more", report.states_known - report.states.len());
    }

    Ok(())
}

fn build_report(
    snapshot: &TrainingSnapshot,
    catalog: &ActionCatalog,
    bucket_size: u32,
    limit: usize,
) -> InspectReport {
    let states = snapshot
        .store
        .entries()
        .into_iter()
        .take(limit)
        .filter_map(|(state, _)| {
            let (best, value) = snapshot.store.peek_best(state)?;
            Some(StateRow {
                state,
                position: u64::from(state) * u64::from(bucket_size.max(1)),
                best_action: catalog
                    .get(best)
                    .map_or_else(|| format!("#{best}"), |a| a.name.clone()),
                best_value: value,
            })
        })
        .collect();

    InspectReport {
        session_id: snapshot.session_id.to_string(),
        saved_at: snapshot.saved_at.to_rfc3339(),
        generation: snapshot.generation,
        epsilon: snapshot.epsilon,
        total_steps: snapshot.total_steps,
        states_known: snapshot.store.len(),
        states,
    }
}
