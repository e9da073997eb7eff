//! Core emulator traits and types for Nitro-Core-DX
//!
//! This crate provides the fundamental abstractions for the console core:
//! the banked 24-bit bus interface, controller button types, the error
//! taxonomy, and the frame-level emulator trait.

pub mod bus;
pub mod error;
pub mod traits;
pub mod types;

pub use bus::Bus24;
pub use error::{EmulatorError, Result};
pub use traits::Emulator;
pub use types::{Button, ControllerState};
