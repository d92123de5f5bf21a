//! Episode lifecycle: termination, soft reset, and exploration decay
//!
//! The controller is an explicit two-state machine. A terminal condition moves
//! it from `Running` to `Resetting`; only a completed reset protocol moves it
//! back. A reset requested while already `Resetting` is refused, so a spurious
//! double trigger cannot decay exploration or advance the generation twice.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use qplay_core::{Button, Environment, Result};

use crate::reward::{Readings, RewardOutcome};

/// Exploration schedule parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    pub initial: f64,
    pub floor: f64,
    /// Linear decrement applied once per completed episode
    pub decay: f64,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            initial: 1.0,
            floor: 0.1,
            decay: 0.005,
        }
    }
}

/// Monotonically non-increasing exploration rate clamped to a floor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplorationSchedule {
    epsilon: f64,
    floor: f64,
    decay: f64,
}

impl ExplorationSchedule {
    pub fn new(config: &ExplorationConfig) -> Self {
        Self {
            epsilon: config.initial,
            floor: config.floor,
            decay: config.decay,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn at_floor(&self) -> bool {
        self.epsilon <= self.floor
    }

    /// Step toward the floor; no-op once there
    pub fn decay(&mut self) -> f64 {
        if self.epsilon > self.floor {
            self.epsilon = (self.epsilon - self.decay).max(self.floor);
        }
        self.epsilon
    }

    /// Resume from a saved rate. The rate never rises above its current value.
    pub fn restore(&mut self, epsilon: f64) {
        self.epsilon = epsilon.max(self.floor).min(self.epsilon);
    }
}

/// Input timing for the soft reset and the start-of-episode sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeConfig {
    /// Ticks the soft-reset combination is held
    pub reset_hold_ticks: u32,
    /// Ticks advanced after releasing the soft-reset combination
    pub reset_settle_ticks: u32,
    /// Ticks waited on the boot screen before pressing Start
    pub warmup_ticks: u32,
    /// Ticks Start is held
    pub start_hold_ticks: u32,
    /// Ticks advanced after releasing Start
    pub start_settle_ticks: u32,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            reset_hold_ticks: 10,
            reset_settle_ticks: 60,
            warmup_ticks: 180,
            start_hold_ticks: 10,
            start_settle_ticks: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodePhase {
    Running,
    Resetting,
}

impl std::fmt::Display for EpisodePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EpisodePhase::Running => write!(f, "running"),
            EpisodePhase::Resetting => write!(f, "resetting"),
        }
    }
}

/// Per-episode counters, zeroed at every reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeCounters {
    pub steps: u64,
    pub total_reward: f64,
    pub max_progress: u32,
    pub stuck_counter: u32,
    pub last_position: u32,
    pub last_score: u64,
    pub last_dead: bool,
}

impl EpisodeCounters {
    /// Readings as of the previous control tick
    pub fn readings(&self) -> Readings {
        Readings {
            position: self.last_position,
            score: self.last_score,
            dead: self.last_dead,
        }
    }
}

/// Record of a finished episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub generation: u64,
    pub steps: u64,
    pub total_reward: f64,
    pub max_progress: u32,
    pub died: bool,
    pub epsilon_after: f64,
}

pub struct EpisodeController {
    config: EpisodeConfig,
    stuck_threshold: u32,
    phase: EpisodePhase,
    counters: EpisodeCounters,
    exploration: ExplorationSchedule,
    generation: u64,
}

impl EpisodeController {
    pub fn new(config: EpisodeConfig, exploration: ExplorationSchedule, stuck_threshold: u32) -> Self {
        Self {
            config,
            stuck_threshold,
            phase: EpisodePhase::Running,
            counters: EpisodeCounters::default(),
            exploration,
            generation: 1,
        }
    }

    pub fn phase(&self) -> EpisodePhase {
        self.phase
    }

    pub fn counters(&self) -> &EpisodeCounters {
        &self.counters
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn epsilon(&self) -> f64 {
        self.exploration.epsilon()
    }

    /// Resume generation and exploration rate from a snapshot
    pub fn restore(&mut self, generation: u64, epsilon: f64) {
        self.generation = generation.max(1);
        self.exploration.restore(epsilon);
    }

    /// Fold one scored control tick into the episode counters
    pub fn record(&mut self, current: &Readings, outcome: &RewardOutcome) {
        let c = &mut self.counters;
        c.steps += 1;
        c.total_reward += outcome.reward;
        c.stuck_counter = outcome.stuck_counter;
        c.max_progress = c.max_progress.max(current.position);
        c.last_position = current.position;
        c.last_score = current.score;
        c.last_dead = current.dead;
    }

    /// Dead, or no forward progress for `stuck_threshold` ticks
    pub fn is_terminal(&self) -> bool {
        self.counters.last_dead || self.counters.stuck_counter >= self.stuck_threshold
    }

    /// Move to `Resetting` if the episode has ended. Returns whether it did.
    pub fn check_termination(&mut self) -> bool {
        if self.phase == EpisodePhase::Running && self.is_terminal() {
            self.phase = EpisodePhase::Resetting;
            return true;
        }
        false
    }

    /// Force the episode to end. Refused while a reset is already pending.
    pub fn request_reset(&mut self) -> bool {
        match self.phase {
            EpisodePhase::Running => {
                self.phase = EpisodePhase::Resetting;
                true
            }
            EpisodePhase::Resetting => {
                warn!("Reset requested while already resetting, ignoring");
                false
            }
        }
    }

    /// Wait out the boot screen, then press and release Start
    pub fn start_episode<E: Environment + ?Sized>(&self, env: &mut E) -> Result<()> {
        debug!("Waiting {} ticks before pressing start", self.config.warmup_ticks);
        env.advance(self.config.warmup_ticks)?;
        env.press_and_release(
            &[Button::Start],
            self.config.start_hold_ticks,
            self.config.start_settle_ticks,
        )
    }

    /// Run the reset protocol if one is pending.
    ///
    /// Soft-resets the console, zeroes the per-episode counters, decays
    /// exploration, advances the generation, and replays the start sequence.
    /// The value store is not touched. Returns `None` when no reset is pending.
    pub fn complete_reset<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
    ) -> Result<Option<EpisodeSummary>> {
        if self.phase != EpisodePhase::Resetting {
            return Ok(None);
        }

        debug!("Soft reset (A+B+Select+Start)");
        env.press_and_release(
            &Button::SOFT_RESET,
            self.config.reset_hold_ticks,
            self.config.reset_settle_ticks,
        )?;

        let finished = self.counters;
        self.counters = EpisodeCounters::default();
        let was_at_floor = self.exploration.at_floor();
        let epsilon_after = self.exploration.decay();
        if !was_at_floor && self.exploration.at_floor() {
            info!("Exploration reached its floor of {:.3}", self.exploration.floor());
        }
        let summary = EpisodeSummary {
            generation: self.generation,
            steps: finished.steps,
            total_reward: finished.total_reward,
            max_progress: finished.max_progress,
            died: finished.last_dead,
            epsilon_after,
        };
        self.generation += 1;

        self.start_episode(env)?;
        self.phase = EpisodePhase::Running;

        info!(
            "Generation {} finished: record {}, reward {:.1}, {} steps{}",
            summary.generation,
            summary.max_progress,
            summary.total_reward,
            summary.steps,
            if summary.died { ", died" } else { "" }
        );

        Ok(Some(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::RewardBreakdown;
    use qplay_core::{SimMode, SimulatedConsole};

    fn controller() -> EpisodeController {
        EpisodeController::new(
            EpisodeConfig::default(),
            ExplorationSchedule::new(&ExplorationConfig::default()),
            100,
        )
    }

    fn outcome(reward: f64, stuck_counter: u32) -> RewardOutcome {
        RewardOutcome {
            reward,
            breakdown: RewardBreakdown::default(),
            stuck_counter,
            died: false,
            scored: false,
        }
    }

    fn alive_at(position: u32) -> Readings {
        Readings {
            position,
            score: 0,
            dead: false,
        }
    }

    #[test]
    fn test_exploration_decay_and_floor() {
        let mut schedule = ExplorationSchedule::new(&ExplorationConfig {
            initial: 0.12,
            floor: 0.1,
            decay: 0.005,
        });
        assert!((schedule.decay() - 0.115).abs() < 1e-12);
        assert!((schedule.decay() - 0.11).abs() < 1e-12);
        schedule.decay();
        schedule.decay();
        schedule.decay();
        assert_eq!(schedule.epsilon(), 0.1);
        assert!(schedule.at_floor());
        schedule.decay();
        assert_eq!(schedule.epsilon(), 0.1);
    }

    #[test]
    fn test_exploration_restore_never_increases() {
        let mut schedule = ExplorationSchedule::new(&ExplorationConfig::default());
        schedule.restore(0.4);
        assert_eq!(schedule.epsilon(), 0.4);
        schedule.restore(0.9);
        assert_eq!(schedule.epsilon(), 0.4);
        schedule.restore(0.0);
        assert_eq!(schedule.epsilon(), 0.1);
    }

    #[test]
    fn test_record_updates_counters() {
        let mut ctl = controller();
        ctl.record(&alive_at(40), &outcome(600.0, 0));
        ctl.record(&alive_at(30), &outcome(0.0, 1));

        let c = ctl.counters();
        assert_eq!(c.steps, 2);
        assert_eq!(c.total_reward, 600.0);
        assert_eq!(c.max_progress, 40);
        assert_eq!(c.last_position, 30);
        assert_eq!(c.stuck_counter, 1);
    }

    #[test]
    fn test_score_baseline_follows_previous_tick() {
        let mut ctl = controller();
        let rf = crate::reward::RewardFunction::default();
        let mut score_terms = Vec::new();

        for (tick, score) in [500, 100, 500].into_iter().enumerate() {
            let current = Readings {
                position: tick as u32 + 1,
                score,
                dead: false,
            };
            let counters = *ctl.counters();
            let out = rf.evaluate(&counters.readings(), &current, counters.stuck_counter);
            score_terms.push(out.breakdown.score);
            ctl.record(&current, &out);
            assert_eq!(ctl.counters().last_score, score);
        }

        // the drop to 100 lowers the baseline, so climbing back to 500 scores again
        assert_eq!(score_terms, vec![50.0, 0.0, 50.0]);
    }

    #[test]
    fn test_stuck_threshold_terminates_without_death() {
        let mut ctl = controller();
        ctl.record(&alive_at(10), &outcome(0.0, 99));
        assert!(!ctl.check_termination());
        assert_eq!(ctl.phase(), EpisodePhase::Running);

        ctl.record(&alive_at(10), &outcome(-10.0, 100));
        assert!(ctl.check_termination());
        assert_eq!(ctl.phase(), EpisodePhase::Resetting);
    }

    #[test]
    fn test_death_terminates() {
        let mut ctl = controller();
        let dead = Readings {
            position: 10,
            score: 0,
            dead: true,
        };
        ctl.record(&dead, &outcome(-500.0, 0));
        assert!(ctl.check_termination());
    }

    #[test]
    fn test_resetting_is_not_reentered() {
        let mut ctl = controller();
        assert!(ctl.request_reset());
        assert!(!ctl.request_reset());
        assert!(!ctl.check_termination());
        assert_eq!(ctl.phase(), EpisodePhase::Resetting);
    }

    #[test]
    fn test_complete_reset_without_pending_is_noop() {
        let mut ctl = controller();
        let mut console = SimulatedConsole::default();

        assert!(ctl.complete_reset(&mut console).unwrap().is_none());
        assert_eq!(console.frame(), 0);
        assert_eq!(ctl.generation(), 1);
        assert_eq!(ctl.epsilon(), 1.0);
    }

    #[test]
    fn test_complete_reset_protocol() {
        let mut ctl = controller();
        let mut console = SimulatedConsole::default();
        ctl.start_episode(&mut console).unwrap();
        assert_eq!(console.mode(), SimMode::Playing);

        ctl.record(&alive_at(70), &outcome(1050.0, 0));
        assert!(ctl.request_reset());
        let summary = ctl.complete_reset(&mut console).unwrap().unwrap();

        assert_eq!(summary.generation, 1);
        assert_eq!(summary.max_progress, 70);
        assert_eq!(summary.total_reward, 1050.0);
        assert!(!summary.died);
        assert!((summary.epsilon_after - 0.995).abs() < 1e-12);

        assert_eq!(ctl.generation(), 2);
        assert!((ctl.epsilon() - 0.995).abs() < 1e-12);
        assert_eq!(*ctl.counters(), EpisodeCounters::default());
        assert_eq!(ctl.phase(), EpisodePhase::Running);
        assert_eq!(console.mode(), SimMode::Playing);
    }

    #[test]
    fn test_double_trigger_resets_once() {
        let mut ctl = controller();
        let mut console = SimulatedConsole::default();
        ctl.start_episode(&mut console).unwrap();

        assert!(ctl.request_reset());
        assert!(!ctl.request_reset());
        assert!(ctl.complete_reset(&mut console).unwrap().is_some());
        assert!(ctl.complete_reset(&mut console).unwrap().is_none());

        assert_eq!(ctl.generation(), 2);
        assert!((ctl.epsilon() - 0.995).abs() < 1e-12);
    }

    #[test]
    fn test_reset_at_floor_keeps_epsilon() {
        let mut ctl = EpisodeController::new(
            EpisodeConfig::default(),
            ExplorationSchedule::new(&ExplorationConfig {
                initial: 0.1,
                floor: 0.1,
                decay: 0.005,
            }),
            100,
        );
        let mut console = SimulatedConsole::default();

        for expected_generation in 2..5 {
            ctl.request_reset();
            ctl.complete_reset(&mut console).unwrap();
            assert_eq!(ctl.generation(), expected_generation);
            assert_eq!(ctl.epsilon(), 0.1);
        }
    }
}
