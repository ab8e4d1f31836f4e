//! Small, dependency-light helpers shared by the `arm64-core`, `arm64-asm` and
//! `arm64-emu` crates. Kept deliberately tiny: anything specific to one
//! subsystem belongs in that subsystem's own crate.

/// The byte order used for every word/dword access in this toolchain.
pub type Endian = byteorder::LittleEndian;
