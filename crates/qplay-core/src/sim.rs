//! Deterministic simulated console
//!
//! A tiny side-scrolling level that speaks the same [`Environment`] interface
//! as a real emulator. It writes its state into RAM through a [`MemoryMap`],
//! so everything the agent learns from goes through memory reads exactly as it
//! would against real hardware.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::env::Environment;
use crate::error::{QPlayError, Result};
use crate::input::Button;
use crate::memory::MemoryMap;

/// Ticks spent on the boot screen before the title screen accepts Start
pub const BOOT_TICKS: u32 = 120;
/// Ticks the player stays airborne after a jump
pub const JUMP_TICKS: u32 = 16;
/// World units per scroll page written to RAM
pub const PAGE_WIDTH: u32 = 256;
/// Points awarded per coin
pub const COIN_POINTS: u64 = 100;

const RAM_SIZE: usize = 0x1_0000;

/// Level geometry, in world units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimLevel {
    /// Furthest reachable position
    pub length: u32,
    /// Positions that cannot be walked past while grounded
    pub walls: Vec<u32>,
    /// Half-open `[start, end)` ranges that kill a grounded player
    pub pits: Vec<(u32, u32)>,
    /// Coin positions, collected when passed
    pub coins: Vec<u32>,
}

impl SimLevel {
    /// An empty level with no hazards
    pub fn flat(length: u32) -> Self {
        Self {
            length,
            walls: Vec::new(),
            pits: Vec::new(),
            coins: Vec::new(),
        }
    }

    fn in_pit(&self, position: u32) -> bool {
        self.pits
            .iter()
            .any(|&(start, end)| position >= start && position < end)
    }

    /// First wall in `[from, to)`, if any
    fn wall_between(&self, from: u32, to: u32) -> Option<u32> {
        self.walls.iter().copied().filter(|&w| w >= from && w < to).min()
    }
}

impl Default for SimLevel {
    fn default() -> Self {
        Self {
            length: 2000,
            walls: vec![120, 400, 900],
            pits: vec![(250, 258), (600, 608), (1300, 1308)],
            coins: vec![60, 180, 330, 700, 1100, 1500],
        }
    }
}

/// Top-level screen the console is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimMode {
    Booting { remaining: u32 },
    Title,
    Playing,
    Dying,
}

/// Simulated platformer implementing [`Environment`]
pub struct SimulatedConsole {
    ram: Vec<u8>,
    map: MemoryMap,
    level: SimLevel,
    held: [bool; 8],
    a_was_held: bool,
    mode: SimMode,
    position: u32,
    airborne: u32,
    score: u64,
    collected: Vec<bool>,
    frame: u64,
    tick_limit: Option<u64>,
}

impl SimulatedConsole {
    /// Create a console for `level`, using [`SimulatedConsole::memory_map`]
    pub fn new(level: SimLevel) -> Self {
        Self::with_memory_map(level, Self::memory_map())
    }

    /// Create a console that writes its state through a custom layout
    pub fn with_memory_map(level: SimLevel, map: MemoryMap) -> Self {
        let collected = vec![false; level.coins.len()];
        let mut console = Self {
            ram: vec![0; RAM_SIZE],
            map,
            level,
            held: [false; 8],
            a_was_held: false,
            mode: SimMode::Booting {
                remaining: BOOT_TICKS,
            },
            position: 0,
            airborne: 0,
            score: 0,
            collected,
            frame: 0,
            tick_limit: None,
        };
        console.write_ram();
        console
    }

    /// Layout the simulated console writes to. Scroll and status share the
    /// real addresses; the score lives in bytes that do not overlap them.
    pub fn memory_map() -> MemoryMap {
        MemoryMap {
            score_bcd: vec![0xC0E0, 0xC0E1, 0xC0E2],
            ..MemoryMap::super_mario_land()
        }
    }

    /// Fail every tick after `limit` total ticks, simulating an emulator crash
    pub fn set_tick_limit(&mut self, limit: Option<u64>) {
        self.tick_limit = limit;
    }

    pub fn mode(&self) -> SimMode {
        self.mode
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn is_airborne(&self) -> bool {
        self.airborne > 0
    }

    pub fn is_held(&self, button: Button) -> bool {
        self.held[button.index()]
    }

    fn soft_reset_held(&self) -> bool {
        Button::SOFT_RESET.iter().all(|&b| self.is_held(b))
    }

    fn reboot(&mut self) {
        self.mode = SimMode::Booting {
            remaining: BOOT_TICKS,
        };
        self.position = 0;
        self.airborne = 0;
        self.score = 0;
        self.collected.iter_mut().for_each(|c| *c = false);
    }

    fn step_playing(&mut self) {
        if self.is_held(Button::A) && !self.a_was_held && self.airborne == 0 {
            self.airborne = JUMP_TICKS;
        }

        let speed = match (self.is_held(Button::Right), self.is_held(Button::B)) {
            (true, true) => 2,
            (true, false) => 1,
            (false, _) => 0,
        };
        let mut next = (self.position + speed).min(self.level.length);
        if self.airborne == 0 {
            if let Some(wall) = self.level.wall_between(self.position, next) {
                next = wall;
            }
        }

        for (i, &coin) in self.level.coins.iter().enumerate() {
            if !self.collected[i] && coin > self.position && coin <= next {
                self.collected[i] = true;
                self.score += COIN_POINTS;
            }
        }
        self.position = next;

        if self.airborne > 0 {
            self.airborne -= 1;
        }
        if self.airborne == 0 && self.level.in_pit(self.position) {
            debug!(position = self.position, "simulated player fell into a pit");
            self.mode = SimMode::Dying;
        }
    }

    fn write_ram(&mut self) {
        let pos = self.position;
        self.ram[self.map.scroll_x as usize] = (pos % PAGE_WIDTH) as u8;
        self.ram[self.map.scroll_page as usize] = (pos / PAGE_WIDTH) as u8;
        self.ram[self.map.status as usize] = if self.mode == SimMode::Dying {
            self.map.dying_value
        } else {
            0
        };

        let mut remaining = self.score;
        for &addr in self.map.score_bcd.iter().rev() {
            let pair = remaining % 100;
            remaining /= 100;
            self.ram[addr as usize] = (((pair / 10) << 4) | (pair % 10)) as u8;
        }
    }
}

impl Default for SimulatedConsole {
    fn default() -> Self {
        Self::new(SimLevel::default())
    }
}

impl Environment for SimulatedConsole {
    fn advance_one_tick(&mut self) -> Result<()> {
        if let Some(limit) = self.tick_limit {
            if self.frame >= limit {
                return Err(QPlayError::Emulator(format!(
                    "simulated console halted after {limit} ticks"
                )));
            }
        }
        self.frame += 1;

        if self.soft_reset_held() {
            self.reboot();
        } else {
            match self.mode {
                SimMode::Booting { remaining } if remaining <= 1 => self.mode = SimMode::Title,
                SimMode::Booting { remaining } => {
                    self.mode = SimMode::Booting {
                        remaining: remaining - 1,
                    };
                }
                SimMode::Title => {
                    if self.is_held(Button::Start) {
                        self.mode = SimMode::Playing;
                    }
                }
                SimMode::Playing => self.step_playing(),
                SimMode::Dying => {}
            }
        }

        self.a_was_held = self.is_held(Button::A);
        self.write_ram();
        Ok(())
    }

    fn read_memory(&self, address: u16) -> u8 {
        self.ram[address as usize]
    }

    fn send_input(&mut self, button: Button) -> Result<()> {
        self.held[button.index()] = true;
        Ok(())
    }

    fn release_input(&mut self, button: Button) -> Result<()> {
        self.held[button.index()] = false;
        Ok(())
    }
}
