//! Learning rules for the value store

use serde::{Deserialize, Serialize};

use qplay_core::{QPlayError, Result};

use crate::action::ActionId;
use crate::state::StateId;
use crate::value_store::ValueStore;

/// Fixed learning constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Learning rate (alpha)
    pub alpha: f64,
    /// Discount factor (gamma)
    pub gamma: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            gamma: 0.9,
        }
    }
}

/// A single (s, a, r, s') transition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: StateId,
    pub action: ActionId,
    pub reward: f64,
    pub next_state: StateId,
}

impl Transition {
    pub fn new(state: StateId, action: ActionId, reward: f64, next_state: StateId) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
        }
    }
}

/// Trait for rules that revise the value store from one transition
pub trait LearningRule: Send + Sync {
    /// Rule name
    fn name(&self) -> &str;

    /// Apply one update, returning the new value of Q(s, a)
    fn learn(&self, store: &mut ValueStore, transition: &Transition) -> Result<f64>;

    /// Parameters as JSON, logged when a session starts
    fn params(&self) -> serde_json::Value;
}

/// One-step tabular Q-learning
#[derive(Debug, Clone, Copy)]
pub struct QLearning {
    learning_rate: f64,
    discount_factor: f64,
}

impl QLearning {
    pub fn new(learning_rate: f64, discount_factor: f64) -> Self {
        Self {
            learning_rate,
            discount_factor,
        }
    }

    pub fn from_config(config: &LearningConfig) -> Self {
        Self::new(config.alpha, config.gamma)
    }
}

impl LearningRule for QLearning {
    fn name(&self) -> &str {
        "q_learning"
    }

    fn learn(&self, store: &mut ValueStore, transition: &Transition) -> Result<f64> {
        let count = store.action_count();
        let current_q = store
            .get(transition.state)
            .get(transition.action)
            .copied()
            .ok_or(QPlayError::InvalidAction {
                index: transition.action,
                count,
            })?;
        let max_next_q = store.max_value(transition.next_state);

        // Q(s,a) += alpha * (r + gamma * max Q(s') - Q(s,a))
        let target = transition.reward + self.discount_factor * max_next_q;
        let new_q = current_q + self.learning_rate * (target - current_q);

        store.update(transition.state, transition.action, new_q)?;
        Ok(new_q)
    }

    fn params(&self) -> serde_json::Value {
        serde_json::json!({
            "learning_rate": self.learning_rate,
            "discount_factor": self.discount_factor,
        })
    }
}

impl Default for QLearning {
    fn default() -> Self {
        Self::from_config(&LearningConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bellman_update() {
        let mut store = ValueStore::new(6);
        store.update(1, 2, 10.0).unwrap();
        store.update(2, 4, 20.0).unwrap();

        let q = QLearning::default();
        let new_q = q.learn(&mut store, &Transition::new(1, 2, 50.0, 2)).unwrap();

        // 10 + 0.2 * (50 + 0.9 * 20 - 10) = 21.6
        assert!((new_q - 21.6).abs() < 1e-9);
        assert!((store.get(1)[2] - 21.6).abs() < 1e-9);
    }

    #[test]
    fn test_learn_materializes_both_states() {
        let mut store = ValueStore::new(6);
        QLearning::default()
            .learn(&mut store, &Transition::new(3, 0, 15.0, 4))
            .unwrap();

        assert_eq!(store.len(), 2);
        assert!((store.get(3)[0] - 3.0).abs() < 1e-9);
        assert_eq!(store.get(4), &[0.0; 6]);
    }

    #[test]
    fn test_self_transition() {
        let mut store = ValueStore::new(2);
        store.update(5, 0, 1.0).unwrap();
        store.update(5, 1, 4.0).unwrap();

        let new_q = QLearning::new(0.5, 0.5)
            .learn(&mut store, &Transition::new(5, 0, 0.0, 5))
            .unwrap();
        // 1 + 0.5 * (0 + 0.5 * 4 - 1) = 1.5
        assert!((new_q - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_only_target_entry_changes() {
        let mut store = ValueStore::new(3);
        QLearning::default()
            .learn(&mut store, &Transition::new(0, 1, 10.0, 1))
            .unwrap();

        let values = store.get(0);
        assert_eq!(values[0], 0.0);
        assert!((values[1] - 2.0).abs() < 1e-9);
        assert_eq!(values[2], 0.0);
    }

    #[test]
    fn test_invalid_action_rejected() {
        let mut store = ValueStore::new(3);
        let err = QLearning::default()
            .learn(&mut store, &Transition::new(0, 9, 1.0, 1))
            .unwrap_err();
        assert!(matches!(err, QPlayError::InvalidAction { index: 9, count: 3 }));
    }

    #[test]
    fn test_params() {
        let params = QLearning::default().params();
        assert_eq!(params["learning_rate"], 0.2);
        assert_eq!(params["discount_factor"], 0.9);
        assert_eq!(QLearning::default().name(), "q_learning");
    }
}
