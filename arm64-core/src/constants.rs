//! Fixed sizes and magic words for the ARM64-subset wire format and memory map.

/// Bytes occupied by one instruction word.
pub const WORD_BYTES: u32 = 4;

/// Number of general-purpose registers (R0..R30); RZR/SP/PC are addressed separately.
pub const GPR_COUNT: usize = 31;

/// Size of main memory, starting at address 0.
pub const MAIN_SIZE: usize = 2 * 1024 * 1024;

/// Size of the memory-mapped I/O page.
pub const IO_SIZE: usize = 4096;

/// Base address of the I/O page (4 KiB aligned down from the raw mailbox address).
pub const MAILBOX_PAGE: u64 = 0x3f00_b880 & !0xFFFu64;

/// The wire word that decodes to `AND X0, X0, X0` and is treated as a
/// distinguished halt instruction by the emulator.
pub const HALT_SENTINEL: u32 = 0x8a00_0000;

/// The wire word for `nop`.
pub const NOP_CODE: u32 = 0xd503_201f;
