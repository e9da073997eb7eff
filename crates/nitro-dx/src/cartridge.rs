/// Cartridge and RMCF ROM image support
///
/// Implements parsing of the 32-byte RMCF header and LoROM-style bank
/// mapping: bank B (1..=125) exposes 32 KiB of ROM at offsets 0x8000+,
/// so the primary window reaches 125 x 32 KiB = 3.9 MiB. Larger images
/// are accepted; bytes beyond the window are simply unreachable.

use byteorder::{ByteOrder, LittleEndian};
use nitro_core::{EmulatorError, Result};
use tracing::debug;

/// Size of the RMCF header in bytes
pub const HEADER_SIZE: usize = 32;

/// Magic bytes at the start of every ROM image
pub const ROM_MAGIC: &[u8; 4] = b"RMCF";

/// Header version this core understands
pub const ROM_VERSION: u16 = 1;

/// Bytes of ROM visible per bank through the LoROM window
pub const BANK_WINDOW: usize = 0x8000;

/// First and last cartridge banks
pub const FIRST_BANK: u8 = 0x01;
pub const LAST_BANK: u8 = 0x7D;

/// Parsed RMCF header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomHeader {
    /// Declared payload size in bytes
    pub rom_size: u32,
    /// Bank the CPU starts executing in (1..=125)
    pub entry_bank: u16,
    /// Offset the CPU starts executing at (>= 0x8000)
    pub entry_offset: u16,
    /// Mapper flags; only LoROM (0) is recognized
    pub mapper: u16,
    /// Header checksum; carried but not enforced
    pub checksum: u32,
}

impl RomHeader {
    /// Parse a header from the first 32 bytes of a ROM image
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(EmulatorError::RomTooShort(bytes.len()));
        }

        if &bytes[0..4] != ROM_MAGIC {
            return Err(EmulatorError::InvalidMagic);
        }

        let version = LittleEndian::read_u16(&bytes[4..6]);
        if version != ROM_VERSION {
            return Err(EmulatorError::UnsupportedVersion(version));
        }

        let rom_size = LittleEndian::read_u32(&bytes[6..10]);
        let entry_bank = LittleEndian::read_u16(&bytes[10..12]);
        let entry_offset = LittleEndian::read_u16(&bytes[12..14]);
        let mapper = LittleEndian::read_u16(&bytes[14..16]);
        let checksum = LittleEndian::read_u32(&bytes[16..20]);
        // Bytes 20..32 are reserved.

        if mapper != 0 {
            return Err(EmulatorError::UnsupportedMapper(mapper));
        }

        if entry_bank < FIRST_BANK as u16
            || entry_bank > LAST_BANK as u16
            || entry_offset < BANK_WINDOW as u16
        {
            return Err(EmulatorError::InvalidEntryPoint {
                bank: entry_bank,
                offset: entry_offset,
            });
        }

        Ok(Self {
            rom_size,
            entry_bank,
            entry_offset,
            mapper,
            checksum,
        })
    }

    /// Encode the header back into its 32-byte wire form
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(ROM_MAGIC);
        LittleEndian::write_u16(&mut out[4..6], ROM_VERSION);
        LittleEndian::write_u32(&mut out[6..10], self.rom_size);
        LittleEndian::write_u16(&mut out[10..12], self.entry_bank);
        LittleEndian::write_u16(&mut out[12..14], self.entry_offset);
        LittleEndian::write_u16(&mut out[14..16], self.mapper);
        LittleEndian::write_u32(&mut out[16..20], self.checksum);
        out
    }
}

/// An immutable cartridge: ROM payload plus parsed header
pub struct Cartridge {
    header: RomHeader,
    rom: Vec<u8>,
}

impl Cartridge {
    /// Load a cartridge from a full ROM image (header + payload)
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let header = RomHeader::parse(bytes)?;
        let rom = bytes[HEADER_SIZE..].to_vec();

        debug!(
            "Loaded cartridge: {} KiB payload, entry {:02X}:{:04X}",
            rom.len() / 1024,
            header.entry_bank,
            header.entry_offset
        );

        Ok(Self { header, rom })
    }

    /// Parsed header
    pub fn header(&self) -> &RomHeader {
        &self.header
    }

    /// ROM payload (without the header)
    pub fn rom(&self) -> &[u8] {
        &self.rom
    }

    /// Read one byte through the LoROM window.
    ///
    /// Offsets below 0x8000 and reads past the end of the payload
    /// return 0.
    pub fn read8(&self, bank: u8, offset: u16) -> u8 {
        if !(FIRST_BANK..=LAST_BANK).contains(&bank) || offset < BANK_WINDOW as u16 {
            return 0;
        }
        let rom_offset =
            (bank as usize - 1) * BANK_WINDOW + (offset as usize - BANK_WINDOW);
        self.rom.get(rom_offset).copied().unwrap_or(0)
    }
}
