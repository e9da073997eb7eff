//! Error types for the emulator core

use thiserror::Error;

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Errors that can occur during emulation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmulatorError {
    #[error("invalid ROM magic (expected \"RMCF\")")]
    InvalidMagic,

    #[error("unsupported ROM version: {0}")]
    UnsupportedVersion(u16),

    #[error("unsupported mapper flags: 0x{0:04X}")]
    UnsupportedMapper(u16),

    #[error("ROM image truncated: {0} bytes")]
    RomTooShort(usize),

    #[error("invalid entry point: bank 0x{bank:02X} offset 0x{offset:04X}")]
    InvalidEntryPoint { bank: u16, offset: u16 },

    #[error("stack underflow: SP=0x{0:04X}")]
    StackUnderflow(u16),

    #[error("unknown opcode 0x{word:04X} at {bank:02X}:{offset:04X}")]
    UnknownOpcode { word: u16, bank: u8, offset: u16 },

    #[error("no ROM loaded")]
    NoRomLoaded,

    #[error("CPU halted by a previous fault; reset required")]
    Halted,
}

impl EmulatorError {
    /// True for ROM-format errors, which leave the core in its pre-load state.
    pub fn is_rom_format(&self) -> bool {
        matches!(
            self,
            EmulatorError::InvalidMagic
                | EmulatorError::UnsupportedVersion(_)
                | EmulatorError::UnsupportedMapper(_)
                | EmulatorError::RomTooShort(_)
                | EmulatorError::InvalidEntryPoint { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rom_format_classification() {
        assert!(EmulatorError::InvalidMagic.is_rom_format());
        assert!(EmulatorError::UnsupportedVersion(2).is_rom_format());
        assert!(!EmulatorError::StackUnderflow(0x1FFF).is_rom_format());
        assert!(!EmulatorError::Halted.is_rom_format());
    }
}
