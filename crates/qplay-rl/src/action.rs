//! Macro-action catalog and timed execution

use serde::{Deserialize, Serialize};

use qplay_core::{Button, Environment, QPlayError, Result};

/// Index of a macro-action in the catalog
pub type ActionId = usize;

/// Timing shared by every macro-action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Ticks the buttons stay held so the press registers
    pub hold_ticks: u32,
    /// Ticks advanced after release so the release registers
    pub release_ticks: u32,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            hold_ticks: 12,
            release_ticks: 1,
        }
    }
}

/// A named combination of buttons pressed together as one decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroAction {
    pub name: String,
    pub buttons: Vec<Button>,
}

impl MacroAction {
    pub fn new(name: impl Into<String>, buttons: &[Button]) -> Self {
        Self {
            name: name.into(),
            buttons: buttons.to_vec(),
        }
    }

    /// True for the deliberate no-op action
    pub fn is_idle(&self) -> bool {
        self.buttons.is_empty()
    }
}

/// Ordered, fixed list of macro-actions (index = action id)
#[derive(Debug, Clone)]
pub struct ActionCatalog {
    actions: Vec<MacroAction>,
    config: ActionConfig,
}

impl ActionCatalog {
    pub fn new(actions: Vec<MacroAction>, config: ActionConfig) -> Self {
        Self { actions, config }
    }

    /// Forward-only moves plus an idle baseline
    pub fn standard(config: ActionConfig) -> Self {
        Self::new(
            vec![
                MacroAction::new("right", &[Button::Right]),
                MacroAction::new("right_sprint", &[Button::Right, Button::B]),
                MacroAction::new("right_long_jump", &[Button::Right, Button::A]),
                MacroAction::new("jump", &[Button::A]),
                MacroAction::new("right_sprint_jump", &[Button::Right, Button::A, Button::B]),
                MacroAction::new("idle", &[]),
            ],
            config,
        )
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, id: ActionId) -> Option<&MacroAction> {
        self.actions.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MacroAction> {
        self.actions.iter()
    }

    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    /// Environment ticks consumed by any single action
    pub fn ticks_per_action(&self) -> u32 {
        self.config.hold_ticks + self.config.release_ticks
    }

    /// Press the action's buttons, hold, release, and let the release register.
    ///
    /// Every action, idle included, consumes the same number of ticks.
    pub fn execute<E: Environment + ?Sized>(&self, env: &mut E, id: ActionId) -> Result<()> {
        let action = self.get(id).ok_or(QPlayError::InvalidAction {
            index: id,
            count: self.len(),
        })?;
        env.press_and_release(
            &action.buttons,
            self.config.hold_ticks,
            self.config.release_ticks,
        )
    }
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::standard(ActionConfig::default())
    }
}
