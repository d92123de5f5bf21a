//! State encoding: raw memory readings to a discrete state id

use serde::{Deserialize, Serialize};

use qplay_core::Observation;

/// Discrete state identifier (a bucket of horizontal world position)
pub type StateId = u32;

/// State discretization parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// World units per state bucket. Smaller buckets mean more states and
    /// slower learning; larger buckets merge distinct situations.
    pub bucket_size: u32,
    /// World units per scroll page
    pub page_width: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            bucket_size: 10,
            page_width: 256,
        }
    }
}

/// Pure mapping from an observation to a state id
#[derive(Debug, Clone, Copy, Default)]
pub struct StateEncoder {
    config: EncoderConfig,
}

impl StateEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Absolute horizontal position: `offset + page * page_width`
    pub fn world_position(&self, obs: &Observation) -> u32 {
        u32::from(obs.scroll_page)
            .saturating_mul(self.config.page_width)
            .saturating_add(u32::from(obs.scroll_x))
    }

    /// Bucket the world position into a state id
    pub fn encode(&self, obs: &Observation) -> StateId {
        self.world_position(obs) / self.config.bucket_size.max(1)
    }
}
