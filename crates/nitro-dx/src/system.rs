/// Top-level Nitro-Core-DX system
///
/// Owns the CPU and the bus (which owns PPU, APU, input, and the
/// cartridge) and drives them from the master clock: one `tick()` is
/// one frame of exactly 127,820 cycles. Within a frame the PPU steps
/// every cycle (advancing DMA one byte per cycle), the APU emits its
/// 735 samples on the exact cadence, and the CPU retires instructions
/// whenever it is not ahead of the master clock, with interrupt checks
/// between instructions.

use crate::bus::Bus;
use crate::cartridge::Cartridge;
use crate::cpu::{Cpu, CpuState, Interrupt};
use crate::ppu::CYCLES_PER_FRAME;
use nitro_core::{Emulator, EmulatorError, Result};
use tracing::{debug, warn};

/// Audio samples produced per frame (44100 Hz at 60 FPS)
pub const SAMPLES_PER_FRAME: usize = 735;

/// State summary returned with every tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub loaded: bool,
    pub running: bool,
    pub paused: bool,
    pub fps: f64,
    pub cycles_per_frame: u32,
    pub frame_count: u16,
}

/// Per-tick output handed to the host
pub struct TickResult<'a> {
    /// False when the core did not step (no ROM, or paused)
    pub framebuffer_ready: bool,
    /// 320x200 packed RGB
    pub framebuffer: &'a [u32],
    /// The frame's audio samples (735 when a frame was produced)
    pub audio_samples: &'a [i16],
    pub snapshot: Snapshot,
}

/// The emulator aggregate
pub struct NitroDx {
    cpu: Cpu,
    bus: Bus,
    loaded: bool,
    paused: bool,
    /// Latched CPU fault; stepping refuses until reset
    fault: Option<EmulatorError>,
    /// Entry point of the loaded ROM, re-seeded into PBR/PC on reset
    entry: Option<(u8, u16)>,
    audio: Vec<i16>,
    fps: f64,
}

impl NitroDx {
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            bus: Bus::new(),
            loaded: false,
            paused: false,
            fault: None,
            entry: None,
            audio: Vec::with_capacity(SAMPLES_PER_FRAME),
            fps: 0.0,
        }
    }

    /// Load a ROM image. Parses the header, resets the CPU, and seeds
    /// PBR/PC from the entry point. WRAM is deliberately preserved
    /// (a ROM load is not a full system reset); on error the core
    /// stays in its pre-load state.
    pub fn load_rom(&mut self, bytes: &[u8]) -> Result<()> {
        let cartridge = Cartridge::load(bytes)?;
        let header = *cartridge.header();
        self.bus.install_cartridge(cartridge);

        self.cpu.reset();
        self.cpu.pbr = header.entry_bank as u8;
        self.cpu.pc = header.entry_offset;
        self.entry = Some((header.entry_bank as u8, header.entry_offset));
        self.loaded = true;
        self.fault = None;

        debug!(
            "ROM loaded, entry {:02X}:{:04X}",
            header.entry_bank, header.entry_offset
        );
        Ok(())
    }

    /// Full CPU reset, preserving the loaded ROM. PBR/PC are re-seeded
    /// from the stored entry point so the program restarts.
    pub fn reset(&mut self) {
        self.cpu.reset();
        if let Some((bank, offset)) = self.entry {
            self.cpu.pbr = bank;
            self.cpu.pc = offset;
        }
        self.fault = None;
    }

    /// Advance one frame. `delta` is the host's elapsed wall-clock
    /// seconds since the previous tick, used only for the FPS estimate;
    /// frame pacing itself is the host's concern.
    pub fn tick(&mut self, delta: f64) -> Result<TickResult<'_>> {
        if delta > 0.0 {
            let instant = 1.0 / delta;
            self.fps = if self.fps == 0.0 {
                instant
            } else {
                self.fps * 0.9 + instant * 0.1
            };
        }

        if !self.loaded || self.paused {
            return Ok(TickResult {
                framebuffer_ready: false,
                framebuffer: self.bus.ppu.framebuffer(),
                audio_samples: &[],
                snapshot: self.snapshot(),
            });
        }

        self.advance_frame()?;
        Ok(TickResult {
            framebuffer_ready: true,
            framebuffer: self.bus.ppu.framebuffer(),
            audio_samples: &self.audio,
            snapshot: self.snapshot(),
        })
    }

    /// Run `n` frames regardless of pause state (debugger surface).
    pub fn step_frame(&mut self, n: u32) -> Result<()> {
        for _ in 0..n {
            self.advance_frame()?;
        }
        Ok(())
    }

    /// Retire `n` CPU instructions, keeping the PPU in lockstep so
    /// VBlank polling loops still make progress under single-stepping.
    /// No audio is produced on this path.
    pub fn step_cpu(&mut self, n: u32) -> Result<()> {
        if !self.loaded {
            return Err(EmulatorError::NoRomLoaded);
        }
        if self.fault.is_some() {
            return Err(EmulatorError::Halted);
        }
        for _ in 0..n {
            let before = self.cpu.cycles;
            if let Err(e) = self.cpu.step(&mut self.bus) {
                self.fault = Some(e.clone());
                return Err(e);
            }
            let used = self.cpu.cycles - before;
            for _ in 0..used {
                self.bus.step_ppu_cycle();
                if self.bus.ppu.take_vblank_irq() {
                    self.cpu.raise_interrupt(Interrupt::VBLANK);
                }
            }
        }
        Ok(())
    }

    pub fn set_buttons(&mut self, controller: usize, buttons: u16) {
        self.bus.input.pad_mut(controller).set_live(buttons);
    }

    /// Toggle pause; returns the new state.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn get_cpu_state(&self) -> CpuState {
        self.cpu.state()
    }

    pub fn get_registers(&self) -> [u16; 8] {
        self.cpu.r
    }

    /// Last completed frame's pixels
    pub fn framebuffer(&self) -> &[u32] {
        self.bus.ppu.framebuffer()
    }

    /// Last completed frame's audio
    pub fn audio_samples(&self) -> &[i16] {
        &self.audio
    }

    /// Bus access for debugger snapshots, taken between ticks
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            loaded: self.loaded,
            running: self.loaded && self.fault.is_none(),
            paused: self.paused,
            fps: self.fps,
            cycles_per_frame: CYCLES_PER_FRAME,
            frame_count: self.bus.ppu.frame_count(),
        }
    }

    /// One frame of the master clock. A CPU fault stops instruction
    /// retirement but the frame's remaining PPU/APU cycles still run,
    /// so the partial frame's framebuffer and audio stay observable;
    /// the fault is then latched and returned.
    fn advance_frame(&mut self) -> Result<()> {
        if !self.loaded {
            return Err(EmulatorError::NoRomLoaded);
        }
        if self.fault.is_some() {
            return Err(EmulatorError::Halted);
        }

        self.audio.clear();
        let frame_start = self.cpu.cycles;
        let mut fault: Option<EmulatorError> = None;

        for c in 0..CYCLES_PER_FRAME as u64 {
            self.bus.step_ppu_cycle();
            if self.bus.ppu.take_vblank_irq() {
                self.cpu.raise_interrupt(Interrupt::VBLANK);
            }

            // Exact 735-per-frame sample cadence (one per ~174 cycles).
            let samples = SAMPLES_PER_FRAME as u64;
            let frame = CYCLES_PER_FRAME as u64;
            if (c + 1) * samples / frame != c * samples / frame {
                let sample = self.bus.apu.next_sample();
                self.audio.push(sample);
            }

            // The CPU catches up to the master clock at instruction
            // granularity, checking interrupts between instructions.
            if fault.is_none() {
                while self.cpu.cycles < frame_start + c + 1 {
                    if let Err(e) = self.cpu.step(&mut self.bus) {
                        fault = Some(e);
                        break;
                    }
                }
            }
        }

        // Frame boundary: channel durations and the FM timer.
        self.bus.apu.frame_update();
        if self.bus.apu.take_fm_irq() {
            self.cpu.raise_interrupt(Interrupt::FM_TIMER);
        }

        if let Some(e) = fault {
            warn!("CPU fault at {:06X}: {}", self.cpu.full_pc(), e);
            self.fault = Some(e.clone());
            return Err(e);
        }
        Ok(())
    }
}

impl Default for NitroDx {
    fn default() -> Self {
        Self::new()
    }
}

impl Emulator for NitroDx {
    fn reset(&mut self) {
        NitroDx::reset(self);
    }

    fn run_frame(&mut self) -> Result<u64> {
        self.advance_frame()?;
        Ok(CYCLES_PER_FRAME as u64)
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}
