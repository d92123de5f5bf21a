//! qplay Core - Environment interface, memory layout, and shared types
//!
//! This crate provides the foundational types used across all qplay components:
//! the controller signals, the `Environment` trait the agent drives, and the
//! memory layout used to read game state out of emulated RAM.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]

pub mod env;
pub mod error;
pub mod input;
pub mod memory;
pub mod sim;

pub use env::Environment;
pub use error::{QPlayError, Result};
pub use input::Button;
pub use memory::{decode_bcd, MemoryMap, Observation};
pub use sim::{SimLevel, SimMode, SimulatedConsole};
