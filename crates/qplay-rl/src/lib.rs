//! qplay RL - Tabular Q-learning for side-scrolling platform games
//!
//! This crate holds the decision-and-learning loop: state discretization,
//! the macro-action catalog, the Q-value store and its Bellman update, the
//! reward function, and the episode controller that resets trials.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::float_cmp)]
#![allow(clippy::similar_names)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod algorithm;
pub mod config;
pub mod episode;
pub mod policy;
pub mod reward;
pub mod snapshot;
pub mod state;
pub mod trainer;
pub mod value_store;

pub use action::{ActionCatalog, ActionConfig, ActionId, MacroAction};
pub use algorithm::{LearningConfig, LearningRule, QLearning, Transition};
pub use config::AgentConfig;
pub use episode::{
    EpisodeConfig, EpisodeController, EpisodeCounters, EpisodePhase, EpisodeSummary,
    ExplorationConfig, ExplorationSchedule,
};
pub use policy::EpsilonGreedy;
pub use reward::{Readings, RewardBreakdown, RewardConfig, RewardFunction, RewardOutcome};
pub use snapshot::TrainingSnapshot;
pub use state::{EncoderConfig, StateEncoder, StateId};
pub use trainer::{TickOutcome, Trainer, TrainerConfig, TrainerStats};
pub use value_store::ValueStore;
