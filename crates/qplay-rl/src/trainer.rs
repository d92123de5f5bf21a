//! Trainer - runs the control loop and owns all training state
//!
//! One control tick reads the environment, picks an action, executes it,
//! re-reads the environment, scores the transition, applies the learning
//! update, and lets the episode controller decide whether to reset.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use qplay_core::{Environment, MemoryMap, Observation};

use crate::action::{ActionCatalog, ActionId};
use crate::algorithm::{LearningRule, QLearning, Transition};
use crate::config::AgentConfig;
use crate::episode::{EpisodeController, EpisodeSummary, ExplorationSchedule};
use crate::policy::EpsilonGreedy;
use crate::reward::{Readings, RewardBreakdown, RewardFunction};
use crate::snapshot::TrainingSnapshot;
use crate::state::{StateEncoder, StateId};
use crate::value_store::ValueStore;

/// Reporting settings for the training loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Control ticks between progress lines (0 disables them)
    pub log_interval: u64,
    /// Number of finished episodes kept for statistics
    pub history_len: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            log_interval: 30,
            history_len: 100,
        }
    }
}

/// What happened during one control tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub state: StateId,
    pub action: ActionId,
    pub reward: f64,
    pub breakdown: RewardBreakdown,
    pub next_state: StateId,
    /// Set when this tick ended the episode and a reset ran
    pub episode: Option<EpisodeSummary>,
}

/// Training statistics
#[derive(Debug, Clone, Serialize)]
pub struct TrainerStats {
    pub session_id: Uuid,
    pub total_steps: u64,
    pub generation: u64,
    pub epsilon: f64,
    pub states_known: usize,
    pub best_progress: u32,
    pub episodes_completed: u64,
    pub average_episode_reward: f64,
}

pub struct Trainer<E: Environment> {
    session_id: Uuid,
    env: E,
    memory_map: MemoryMap,
    encoder: StateEncoder,
    catalog: ActionCatalog,
    store: ValueStore,
    policy: EpsilonGreedy,
    reward: RewardFunction,
    learner: Box<dyn LearningRule>,
    controller: EpisodeController,
    rng: StdRng,
    config: TrainerConfig,
    total_steps: u64,
    best_progress: u32,
    episodes_completed: u64,
    history: VecDeque<EpisodeSummary>,
    started: bool,
}

impl<E: Environment> Trainer<E> {
    /// Create a trainer with the standard action catalog
    pub fn new(env: E, memory_map: MemoryMap, config: &AgentConfig, rng: StdRng) -> Result<Self> {
        let catalog = ActionCatalog::standard(config.actions);
        Self::with_catalog(env, memory_map, config, catalog, rng)
    }

    /// Create a trainer with a custom action catalog
    pub fn with_catalog(
        env: E,
        memory_map: MemoryMap,
        config: &AgentConfig,
        catalog: ActionCatalog,
        rng: StdRng,
    ) -> Result<Self> {
        config.validate().context("Invalid agent configuration")?;
        if catalog.is_empty() {
            return Err(anyhow!("Action catalog is empty"));
        }

        let controller = EpisodeController::new(
            config.episode,
            ExplorationSchedule::new(&config.exploration),
            config.reward.stuck_threshold,
        );

        Ok(Self {
            session_id: Uuid::new_v4(),
            env,
            memory_map,
            encoder: StateEncoder::new(config.encoder),
            store: ValueStore::new(catalog.len()),
            catalog,
            policy: EpsilonGreedy::new(),
            reward: RewardFunction::new(config.reward),
            learner: Box::new(QLearning::from_config(&config.learning)),
            controller,
            rng,
            config: config.trainer,
            total_steps: 0,
            best_progress: 0,
            episodes_completed: 0,
            history: VecDeque::with_capacity(config.trainer.history_len),
            started: false,
        })
    }

    /// Bring the environment from power-on into play. Runs once, on the first tick.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        info!(
            "Training session {} starting (generation {}, epsilon {:.3}, {} actions, {} {})",
            self.session_id,
            self.controller.generation(),
            self.controller.epsilon(),
            self.catalog.len(),
            self.learner.name(),
            self.learner.params()
        );
        self.controller
            .start_episode(&mut self.env)
            .context("Start sequence failed")?;
        self.started = true;
        Ok(())
    }

    /// Run one control tick
    pub fn tick(&mut self) -> Result<TickOutcome> {
        self.start()?;

        let obs = Observation::read(&self.env, &self.memory_map);
        let state = self.encoder.encode(&obs);
        let action = self.policy.choose(
            &mut self.store,
            state,
            self.controller.epsilon(),
            &mut self.rng,
        );

        self.catalog
            .execute(&mut self.env, action)
            .with_context(|| format!("Failed to execute action {action}"))?;

        let next_obs = Observation::read(&self.env, &self.memory_map);
        let next_state = self.encoder.encode(&next_obs);
        let current = Readings {
            position: self.encoder.world_position(&next_obs),
            score: next_obs.score,
            dead: next_obs.dead,
        };

        let counters = *self.controller.counters();
        let outcome = self
            .reward
            .evaluate(&counters.readings(), &current, counters.stuck_counter);
        if outcome.scored {
            debug!("Score increased: {} -> {}", counters.last_score, current.score);
        }
        if outcome.died {
            debug!("Death detected at position {}", current.position);
        }

        self.learner.learn(
            &mut self.store,
            &Transition::new(state, action, outcome.reward, next_state),
        )?;
        self.controller.record(&current, &outcome);
        self.total_steps += 1;
        self.best_progress = self.best_progress.max(current.position);

        let step = counters.steps;
        if self.config.log_interval > 0 && step % self.config.log_interval == 0 {
            info!(
                "Gen: {} | Step: {} | Epsilon: {:.3} | Dist: {} | Reward: {:.1}",
                self.controller.generation(),
                step,
                self.controller.epsilon(),
                current.position,
                self.controller.counters().total_reward
            );
        }

        let episode = if self.controller.check_termination() {
            let summary = self
                .controller
                .complete_reset(&mut self.env)
                .context("Reset protocol failed")?;
            if let Some(summary) = summary {
                self.record_episode(summary);
            }
            summary
        } else {
            None
        };

        Ok(TickOutcome {
            state,
            action,
            reward: outcome.reward,
            breakdown: outcome.breakdown,
            next_state,
            episode,
        })
    }

    /// Train until `max_episodes` episodes finish (forever if `None`) or `stop` is raised
    pub fn run(&mut self, max_episodes: Option<u64>, stop: &AtomicBool) -> Result<TrainerStats> {
        self.run_with(max_episodes, stop, |_, _| Ok(()))
    }

    /// Like [`Trainer::run`], calling `on_episode` after every finished episode
    pub fn run_with<F>(
        &mut self,
        max_episodes: Option<u64>,
        stop: &AtomicBool,
        mut on_episode: F,
    ) -> Result<TrainerStats>
    where
        F: FnMut(&Self, &EpisodeSummary) -> Result<()>,
    {
        let mut completed = 0u64;
        while !stop.load(Ordering::Relaxed) {
            if max_episodes.is_some_and(|max| completed >= max) {
                break;
            }
            if let Some(summary) = self.tick()?.episode {
                completed += 1;
                on_episode(self, &summary)?;
            }
        }

        let stats = self.stats();
        info!(
            "Training stopped after {} steps: generation {}, {} states known, best distance {}",
            stats.total_steps, stats.generation, stats.states_known, stats.best_progress
        );
        Ok(stats)
    }

    fn record_episode(&mut self, summary: EpisodeSummary) {
        self.episodes_completed += 1;
        if self.config.history_len == 0 {
            return;
        }
        if self.history.len() >= self.config.history_len {
            self.history.pop_front();
        }
        self.history.push_back(summary);
    }

    /// Get statistics
    pub fn stats(&self) -> TrainerStats {
        TrainerStats {
            session_id: self.session_id,
            total_steps: self.total_steps,
            generation: self.controller.generation(),
            epsilon: self.controller.epsilon(),
            states_known: self.store.len(),
            best_progress: self.best_progress,
            episodes_completed: self.episodes_completed,
            average_episode_reward: if self.history.is_empty() {
                0.0
            } else {
                self.history.iter().map(|s| s.total_reward).sum::<f64>() / self.history.len() as f64
            },
        }
    }

    /// Capture the learned table and schedule position
    pub fn snapshot(&self) -> TrainingSnapshot {
        TrainingSnapshot {
            session_id: self.session_id,
            saved_at: Utc::now(),
            generation: self.controller.generation(),
            epsilon: self.controller.epsilon(),
            total_steps: self.total_steps,
            store: self.store.clone(),
        }
    }

    /// Resume from a snapshot taken with the same action catalog
    pub fn restore(&mut self, snapshot: TrainingSnapshot) -> Result<()> {
        if snapshot.store.action_count() != self.catalog.len() {
            return Err(anyhow!(
                "Snapshot has {} actions per state, catalog has {}",
                snapshot.store.action_count(),
                self.catalog.len()
            ));
        }
        info!(
            "Restoring snapshot from session {} ({} states, generation {})",
            snapshot.session_id,
            snapshot.store.len(),
            snapshot.generation
        );
        self.controller.restore(snapshot.generation, snapshot.epsilon);
        self.total_steps = snapshot.total_steps;
        self.store = snapshot.store;
        Ok(())
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    pub fn controller(&self) -> &EpisodeController {
        &self.controller
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    pub fn history(&self) -> impl Iterator<Item = &EpisodeSummary> {
        self.history.iter()
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionConfig, MacroAction};
    use qplay_core::{Button, SimLevel, SimMode, SimulatedConsole};
    use rand::SeedableRng;

    fn trainer_for(level: SimLevel, catalog: ActionCatalog) -> Trainer<SimulatedConsole> {
        Trainer::with_catalog(
            SimulatedConsole::new(level),
            SimulatedConsole::memory_map(),
            &AgentConfig::default(),
            catalog,
            StdRng::seed_from_u64(7),
        )
        .unwrap()
    }

    fn single_action(name: &str, buttons: &[Button]) -> ActionCatalog {
        ActionCatalog::new(vec![MacroAction::new(name, buttons)], ActionConfig::default())
    }

    #[test]
    fn test_first_tick_runs_start_sequence() {
        let mut trainer = trainer_for(SimLevel::flat(500), single_action("right", &[Button::Right]));
        let outcome = trainer.tick().unwrap();

        assert_eq!(trainer.env().mode(), SimMode::Playing);
        assert_eq!(trainer.env().frame(), 180 + 10 + 60 + 13);
        assert_eq!(trainer.env().position(), 12);
        assert_eq!(outcome.state, 0);
        assert_eq!(outcome.next_state, 1);
        assert_eq!(outcome.reward, 180.0);
    }

    #[test]
    fn test_idle_agent_ends_episode_on_stuck_ceiling() {
        let mut trainer = trainer_for(SimLevel::flat(500), single_action("idle", &[]));

        for _ in 0..99 {
            assert!(trainer.tick().unwrap().episode.is_none());
        }
        let summary = trainer.tick().unwrap().episode.unwrap();

        assert_eq!(summary.generation, 1);
        assert_eq!(summary.steps, 100);
        assert!(!summary.died);
        assert_eq!(summary.total_reward, -10.0);
        assert_eq!(trainer.controller().generation(), 2);
        assert_eq!(trainer.controller().counters().steps, 0);
    }

    #[test]
    fn test_death_ends_episode_and_is_learned() {
        let level = SimLevel {
            length: 100,
            walls: vec![],
            pits: vec![(20, 28)],
            coins: vec![],
        };
        let mut trainer = trainer_for(level, single_action("right", &[Button::Right]));

        let first = trainer.tick().unwrap();
        assert_eq!(first.reward, 180.0);
        assert!(first.episode.is_none());

        let second = trainer.tick().unwrap();
        assert_eq!(second.breakdown.death, -500.0);
        assert_eq!(second.reward, 120.0 - 500.0);

        let summary = second.episode.unwrap();
        assert!(summary.died);
        assert_eq!(summary.steps, 2);
        assert_eq!(summary.max_progress, 20);
        assert_eq!(summary.total_reward, 180.0 + 120.0 - 500.0);

        // Q(1, right) = 0 + 0.2 * (-380 + 0.9 * 0 - 0)
        let q = trainer.store().peek(1).unwrap()[0];
        assert!((q - (-76.0)).abs() < 1e-9);
        assert_eq!(trainer.env().mode(), SimMode::Playing);
    }

    #[test]
    fn test_run_respects_episode_budget() {
        let mut trainer = Trainer::new(
            SimulatedConsole::default(),
            SimulatedConsole::memory_map(),
            &AgentConfig::default(),
            StdRng::seed_from_u64(11),
        )
        .unwrap();
        let stop = AtomicBool::new(false);

        let stats = trainer.run(Some(3), &stop).unwrap();
        assert_eq!(stats.episodes_completed, 3);
        assert_eq!(stats.generation, 4);
        assert!((stats.epsilon - 0.985).abs() < 1e-9);
        assert!(stats.states_known > 0);
        assert_eq!(trainer.history().count(), 3);
    }

    #[test]
    fn test_stop_flag_halts_before_any_tick() {
        let mut trainer = trainer_for(SimLevel::flat(500), ActionCatalog::default());
        let stop = AtomicBool::new(true);

        let stats = trainer.run(None, &stop).unwrap();
        assert_eq!(stats.total_steps, 0);
        assert_eq!(trainer.env().frame(), 0);
    }

    #[test]
    fn test_environment_failure_is_fatal() {
        let mut trainer = trainer_for(SimLevel::flat(500), ActionCatalog::default());
        trainer.env_mut().set_tick_limit(Some(300));
        let stop = AtomicBool::new(false);

        assert!(trainer.run(None, &stop).is_err());
    }

    #[test]
    fn test_on_episode_error_propagates() {
        let mut trainer = trainer_for(SimLevel::flat(500), single_action("idle", &[]));
        let stop = AtomicBool::new(false);

        let result = trainer.run_with(None, &stop, |_, _| Err(anyhow!("callback failed")));
        assert!(result.is_err());
        assert_eq!(trainer.stats().episodes_completed, 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut config = AgentConfig::default();
        config.trainer.history_len = 2;
        config.reward.stuck_threshold = 1;
        let mut trainer = Trainer::with_catalog(
            SimulatedConsole::new(SimLevel::flat(500)),
            SimulatedConsole::memory_map(),
            &config,
            single_action("idle", &[]),
            StdRng::seed_from_u64(3),
        )
        .unwrap();
        let stop = AtomicBool::new(false);

        trainer.run(Some(5), &stop).unwrap();
        let generations: Vec<u64> = trainer.history().map(|s| s.generation).collect();
        assert_eq!(generations, vec![4, 5]);
        assert_eq!(trainer.stats().episodes_completed, 5);
    }

    #[test]
    fn test_snapshot_and_restore() {
        let mut trainer = trainer_for(SimLevel::flat(500), single_action("idle", &[]));
        let stop = AtomicBool::new(false);
        trainer.run(Some(2), &stop).unwrap();
        let snapshot = trainer.snapshot();

        let mut resumed = trainer_for(SimLevel::flat(500), single_action("idle", &[]));
        resumed.restore(snapshot.clone()).unwrap();

        assert_eq!(resumed.store(), trainer.store());
        assert_eq!(resumed.controller().generation(), 3);
        assert!((resumed.controller().epsilon() - 0.99).abs() < 1e-9);
        assert_eq!(resumed.stats().total_steps, snapshot.total_steps);
    }

    #[test]
    fn test_restore_rejects_mismatched_catalog() {
        let trainer = trainer_for(SimLevel::flat(500), single_action("idle", &[]));
        let snapshot = trainer.snapshot();

        let mut other = trainer_for(SimLevel::flat(500), ActionCatalog::default());
        assert!(other.restore(snapshot).is_err());
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let result = Trainer::with_catalog(
            SimulatedConsole::default(),
            SimulatedConsole::memory_map(),
            &AgentConfig::default(),
            ActionCatalog::new(vec![], ActionConfig::default()),
            StdRng::seed_from_u64(0),
        );
        assert!(result.is_err());
    }
}
