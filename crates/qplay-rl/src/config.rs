//! Aggregated agent configuration

use serde::{Deserialize, Serialize};

use qplay_core::{QPlayError, Result};

use crate::action::ActionConfig;
use crate::algorithm::LearningConfig;
use crate::episode::{EpisodeConfig, ExplorationConfig};
use crate::reward::RewardConfig;
use crate::state::EncoderConfig;
use crate::trainer::TrainerConfig;

/// Every tunable of the agent, grouped by component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub encoder: EncoderConfig,
    pub actions: ActionConfig,
    pub learning: LearningConfig,
    pub reward: RewardConfig,
    pub exploration: ExplorationConfig,
    pub episode: EpisodeConfig,
    pub trainer: TrainerConfig,
}

impl AgentConfig {
    /// Reject settings the training loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.encoder.bucket_size == 0 {
            return Err(QPlayError::Config("encoder.bucket_size must be positive".into()));
        }
        // the scroll offset is a single byte, so a page can't be wider than 256
        if self.encoder.page_width == 0 || self.encoder.page_width > 256 {
            return Err(QPlayError::Config(format!(
                "encoder.page_width must be in 1..=256, got {}",
                self.encoder.page_width
            )));
        }
        if !(self.learning.alpha > 0.0 && self.learning.alpha <= 1.0) {
            return Err(QPlayError::Config(format!(
                "learning.alpha must be in (0, 1], got {}",
                self.learning.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.learning.gamma) {
            return Err(QPlayError::Config(format!(
                "learning.gamma must be in [0, 1], got {}",
                self.learning.gamma
            )));
        }
        let exploration = &self.exploration;
        if !(0.0..=1.0).contains(&exploration.initial) || !(0.0..=1.0).contains(&exploration.floor) {
            return Err(QPlayError::Config(
                "exploration.initial and exploration.floor must be in [0, 1]".into(),
            ));
        }
        if exploration.floor > exploration.initial {
            return Err(QPlayError::Config(format!(
                "exploration.floor ({}) is above exploration.initial ({})",
                exploration.floor, exploration.initial
            )));
        }
        if exploration.decay < 0.0 {
            return Err(QPlayError::Config("exploration.decay must not be negative".into()));
        }
        if self.reward.stuck_threshold == 0 {
            return Err(QPlayError::Config("reward.stuck_threshold must be positive".into()));
        }
        Ok(())
    }
}
