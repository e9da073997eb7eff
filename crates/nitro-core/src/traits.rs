//! Core traits for emulated systems

use crate::Result;

/// Frame-level emulator interface.
///
/// A system implementing this trait is driven one frame at a time by the
/// host; pause is cooperative (a paused system simply is not stepped).
pub trait Emulator {
    /// Reset the system to its initial state
    fn reset(&mut self);

    /// Run one frame of emulation
    /// Returns the number of master-clock cycles executed
    fn run_frame(&mut self) -> Result<u64>;

    /// Check if the emulator is paused
    fn is_paused(&self) -> bool;

    /// Pause or unpause the emulator
    fn set_paused(&mut self, paused: bool);
}
