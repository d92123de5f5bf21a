//! Reward shaping from consecutive memory readings

use serde::{Deserialize, Serialize};

// =============================================================================
// Reward Tuning Knobs
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Reward per world unit of forward progress
    pub progress_weight: f64,
    /// Flat bonus per detected score increase, whatever its size
    pub score_bonus: f64,
    /// Added once when the death flag turns on
    pub death_penalty: f64,
    /// Ticks without progress after which the player counts as stuck
    pub stuck_threshold: u32,
    /// Added on every tick spent stuck
    pub stuck_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            progress_weight: 15.0,
            score_bonus: 50.0,
            death_penalty: -500.0,
            stuck_threshold: 100,
            stuck_penalty: -10.0,
        }
    }
}

/// The values the reward function compares between two control ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readings {
    pub position: u32,
    pub score: u64,
    pub dead: bool,
}

/// Per-term contributions to one reward
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub progress: f64,
    pub score: f64,
    pub death: f64,
    pub stagnation: f64,
}

impl RewardBreakdown {
    pub fn total(&self) -> f64 {
        self.progress + self.score + self.death + self.stagnation
    }
}

/// Result of scoring one transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardOutcome {
    pub reward: f64,
    pub breakdown: RewardBreakdown,
    /// Stuck counter after this tick
    pub stuck_counter: u32,
    pub died: bool,
    pub scored: bool,
}

/// Sums independent progress, score, death, and stagnation terms
#[derive(Debug, Clone, Copy, Default)]
pub struct RewardFunction {
    config: RewardConfig,
}

impl RewardFunction {
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Whether a stuck counter has reached the stuck threshold
    pub fn is_stuck(&self, stuck_counter: u32) -> bool {
        stuck_counter >= self.config.stuck_threshold
    }

    /// Score the transition from `previous` to `current`.
    ///
    /// `previous` must be the readings of the immediately preceding control
    /// tick; the score term compares against it and nothing older.
    pub fn evaluate(
        &self,
        previous: &Readings,
        current: &Readings,
        stuck_counter: u32,
    ) -> RewardOutcome {
        let cfg = &self.config;
        let mut breakdown = RewardBreakdown::default();

        let stuck_counter = if current.position > previous.position {
            breakdown.progress = f64::from(current.position - previous.position) * cfg.progress_weight;
            0
        } else {
            stuck_counter.saturating_add(1)
        };

        let scored = current.score > previous.score;
        if scored {
            breakdown.score = cfg.score_bonus;
        }

        let died = current.dead && !previous.dead;
        if died {
            breakdown.death = cfg.death_penalty;
        }

        if self.is_stuck(stuck_counter) {
            breakdown.stagnation = cfg.stuck_penalty;
        }

        RewardOutcome {
            reward: breakdown.total(),
            breakdown,
            stuck_counter,
            died,
            scored,
        }
    }
}
