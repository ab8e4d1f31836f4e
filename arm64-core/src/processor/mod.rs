//! The emulator: CPU state plus the fetch-decode-execute loop.

mod core;
mod logic;

pub use core::{Cpu, ExitReason, PState, ProcessorError};
