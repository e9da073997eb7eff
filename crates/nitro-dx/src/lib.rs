//! Nitro-Core-DX Emulator Core
//!
//! This crate implements the Nitro-Core-DX console: the custom 16-bit
//! CPU, the banked 24-bit memory bus, the PPU (4 background layers,
//! 128 sprites, matrix mode, DMA/HDMA), the 4-channel APU with FM
//! extension, the cartridge format, and the input latch subsystem.
//!
//! Hosts drive the core one frame at a time through [`NitroDx::tick`]
//! and read back the 320x200 framebuffer and 735 audio samples the
//! frame produced.

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod input;
pub mod palette;
pub mod ppu;
pub mod system;

pub use apu::Apu;
pub use bus::Bus;
pub use cartridge::{Cartridge, RomHeader};
pub use cpu::Cpu;
pub use input::InputPorts;
pub use ppu::Ppu;
pub use system::{NitroDx, Snapshot, TickResult};
