//! Controller input signals

use serde::{Deserialize, Serialize};

/// A discrete button on the emulated controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Start,
    Select,
}

impl Button {
    /// All buttons, in controller order
    pub const ALL: [Button; 8] = [
        Button::Right,
        Button::Left,
        Button::Up,
        Button::Down,
        Button::A,
        Button::B,
        Button::Start,
        Button::Select,
    ];

    /// The soft-reset combination (A + B + Select + Start)
    pub const SOFT_RESET: [Button; 4] = [Button::A, Button::B, Button::Select, Button::Start];

    /// Stable index of the button, used for bitset storage
    pub fn index(self) -> usize {
        match self {
            Button::Right => 0,
            Button::Left => 1,
            Button::Up => 2,
            Button::Down => 3,
            Button::A => 4,
            Button::B => 5,
            Button::Start => 6,
            Button::Select => 7,
        }
    }
}

impl std::fmt::Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Button::Right => write!(f, "right"),
            Button::Left => write!(f, "left"),
            Button::Up => write!(f, "up"),
            Button::Down => write!(f, "down"),
            Button::A => write!(f, "a"),
            Button::B => write!(f, "b"),
            Button::Start => write!(f, "start"),
            Button::Select => write!(f, "select"),
        }
    }
}
