//! Emulation environment interface
//!
//! The agent never touches an emulator directly. Everything it needs is
//! expressed through [`Environment`]: advancing time, reading memory, and
//! asserting or clearing controller buttons.

use crate::error::Result;
use crate::input::Button;

/// A frame-stepped emulation environment with a byte-addressable memory view
pub trait Environment {
    /// Advance the simulation by exactly one tick
    fn advance_one_tick(&mut self) -> Result<()>;

    /// Read one byte of emulated memory
    fn read_memory(&self, address: u16) -> u8;

    /// Assert a button; stays held until released
    fn send_input(&mut self, button: Button) -> Result<()>;

    /// Clear a previously asserted button
    fn release_input(&mut self, button: Button) -> Result<()>;

    /// Advance the simulation by `ticks` ticks
    fn advance(&mut self, ticks: u32) -> Result<()> {
        for _ in 0..ticks {
            self.advance_one_tick()?;
        }
        Ok(())
    }

    /// Hold `buttons` for `hold_ticks`, release them, then advance `settle_ticks`
    fn press_and_release(
        &mut self,
        buttons: &[Button],
        hold_ticks: u32,
        settle_ticks: u32,
    ) -> Result<()> {
        for &button in buttons {
            self.send_input(button)?;
        }
        self.advance(hold_ticks)?;
        for &button in buttons {
            self.release_input(button)?;
        }
        self.advance(settle_ticks)
    }
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn advance_one_tick(&mut self) -> Result<()> {
        (**self).advance_one_tick()
    }

    fn read_memory(&self, address: u16) -> u8 {
        (**self).read_memory(address)
    }

    fn send_input(&mut self, button: Button) -> Result<()> {
        (**self).send_input(button)
    }

    fn release_input(&mut self, button: Button) -> Result<()> {
        (**self).release_input(button)
    }
}
