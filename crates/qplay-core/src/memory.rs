//! Memory layout and raw observation reading

use serde::{Deserialize, Serialize};

use crate::env::Environment;

/// Addresses of the game values the agent reads every control tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryMap {
    /// Camera scroll offset within the current page
    pub scroll_x: u16,
    /// Page (bank) counter; world position is `scroll_x + page * page_width`
    pub scroll_page: u16,
    /// Player status byte
    pub status: u16,
    /// Value of the status byte that means the player is dying
    pub dying_value: u8,
    /// BCD score bytes, most significant first
    pub score_bcd: Vec<u16>,
}

impl MemoryMap {
    /// Layout used by the Super Mario Land training setup.
    ///
    /// Note that the score bytes overlap the scroll bytes in this layout.
    pub fn super_mario_land() -> Self {
        Self {
            scroll_x: 0xC0A1,
            scroll_page: 0xC0A2,
            status: 0xFF99,
            dying_value: 1,
            score_bcd: vec![0xC0A0, 0xC0A1, 0xC0A2],
        }
    }
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self::super_mario_land()
    }
}

/// Decode packed BCD bytes (two decimal digits per byte, most significant first).
///
/// Nibbles are not validated: a transient out-of-range nibble during a screen
/// transition decodes to whatever `high * 10 + low` yields.
pub fn decode_bcd(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &byte| {
        let high = u64::from(byte >> 4);
        let low = u64::from(byte & 0x0F);
        acc * 100 + high * 10 + low
    })
}

/// Raw readings taken from emulated memory at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub scroll_x: u8,
    pub scroll_page: u8,
    pub score: u64,
    pub dead: bool,
}

impl Observation {
    /// Read an observation from the environment using the given layout
    pub fn read<E: Environment + ?Sized>(env: &E, map: &MemoryMap) -> Self {
        let score_bytes: Vec<u8> = map.score_bcd.iter().map(|&addr| env.read_memory(addr)).collect();

        Self {
            scroll_x: env.read_memory(map.scroll_x),
            scroll_page: env.read_memory(map.scroll_page),
            score: decode_bcd(&score_bytes),
            dead: env.read_memory(map.status) == map.dying_value,
        }
    }
}
