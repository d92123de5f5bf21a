//! Sparse Q-value table keyed by state id

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use qplay_core::{QPlayError, Result};

use crate::action::ActionId;
use crate::state::StateId;

/// Sparse map from state id to one action-value per catalog action.
///
/// Entries are materialized lazily (all zeros) on first access and are never
/// removed, so the table grows with the number of distinct states visited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueStore {
    action_count: usize,
    table: HashMap<StateId, Vec<f64>>,
}

impl ValueStore {
    pub fn new(action_count: usize) -> Self {
        Self {
            action_count,
            table: HashMap::new(),
        }
    }

    /// Action-values for `state`, creating a zeroed entry on first access
    pub fn get(&mut self, state: StateId) -> &[f64] {
        let action_count = self.action_count;
        self.table
            .entry(state)
            .or_insert_with(|| vec![0.0; action_count])
    }

    /// Action-values for `state` without materializing it
    pub fn peek(&self, state: StateId) -> Option<&[f64]> {
        self.table.get(&state).map(Vec::as_slice)
    }

    /// Index of the highest value; ties go to the lowest index
    pub fn best_action(&mut self, state: StateId) -> ActionId {
        argmax(self.get(state))
    }

    /// Greedy action and its value for an already known state
    pub fn peek_best(&self, state: StateId) -> Option<(ActionId, f64)> {
        self.peek(state).filter(|values| !values.is_empty()).map(|values| {
            let best = argmax(values);
            (best, values[best])
        })
    }

    /// Highest value for `state`
    pub fn max_value(&mut self, state: StateId) -> f64 {
        let values = self.get(state);
        values[argmax(values)]
    }

    /// Overwrite a single action-value in place
    pub fn update(&mut self, state: StateId, action: ActionId, value: f64) -> Result<()> {
        let count = self.action_count;
        if action >= count {
            return Err(QPlayError::InvalidAction {
                index: action,
                count,
            });
        }
        let values = self
            .table
            .entry(state)
            .or_insert_with(|| vec![0.0; count]);
        values[action] = value;
        Ok(())
    }

    pub fn action_count(&self) -> usize {
        self.action_count
    }

    /// Number of materialized states
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// All entries, ordered by state id
    pub fn entries(&self) -> Vec<(StateId, &[f64])> {
        let mut entries: Vec<_> = self
            .table
            .iter()
            .map(|(&state, values)| (state, values.as_slice()))
            .collect();
        entries.sort_unstable_by_key(|&(state, _)| state);
        entries
    }

    /// Check that every entry has one value per action
    pub fn validate(&self) -> Result<()> {
        for (state, values) in &self.table {
            if values.len() != self.action_count {
                return Err(QPlayError::Snapshot(format!(
                    "state {state} has {} values, expected {}",
                    values.len(),
                    self.action_count
                )));
            }
        }
        Ok(())
    }
}

fn argmax(values: &[f64]) -> ActionId {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = i;
        }
    }
    best
}
