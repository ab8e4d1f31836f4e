//! The two-region byte-addressable memory model: a 2 MiB main block
//! starting at address 0, and a 4 KiB memory-mapped I/O page. Every access
//! must land entirely within one of the two; crossing the gap between them,
//! or running off either end, is a fatal, typed error rather than a panic.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::constants::{IO_SIZE, MAILBOX_PAGE, MAIN_SIZE};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("address 0x{addr:x} (length {len}) is out of bounds")]
    OutOfBounds { addr: u64, len: u32 },
    #[error("access at 0x{addr:x} (length {len}) straddles two memory regions")]
    Straddling { addr: u64, len: u32 },
}

enum Region {
    Main,
    Io,
}

pub struct Memory {
    main: Vec<u8>,
    io: Vec<u8>,
}

impl Memory {
    pub fn new() -> Memory {
        Memory {
            main: vec![0; MAIN_SIZE],
            io: vec![0; IO_SIZE],
        }
    }

    /// Loads a raw, length-prefix-free stream of little-endian 32-bit words
    /// into main memory starting at address 0 (word index 0 lands at
    /// address 0, word index 1 at address 4, and so on).
    pub fn load_words(words: &[u32]) -> Result<Memory, MemoryError> {
        let mut mem = Memory::new();
        for (i, w) in words.iter().enumerate() {
            mem.write_word((i * 4) as u64, *w)?;
        }
        Ok(mem)
    }

    fn locate(&self, addr: u64, len: u32) -> Result<(Region, usize), MemoryError> {
        let end = match addr.checked_add(len as u64) {
            Some(e) => e,
            None => return Err(MemoryError::OutOfBounds { addr, len }),
        };
        let main_end = MAIN_SIZE as u64;
        let io_start = MAILBOX_PAGE;
        let io_end = MAILBOX_PAGE + IO_SIZE as u64;

        if addr < main_end && end <= main_end {
            return Ok((Region::Main, addr as usize));
        }
        if addr >= io_start && end <= io_end {
            return Ok((Region::Io, (addr - io_start) as usize));
        }

        let overlaps_main = addr < main_end;
        let overlaps_io = end > io_start && addr < io_end;
        if overlaps_main || overlaps_io {
            Err(MemoryError::Straddling { addr, len })
        } else {
            Err(MemoryError::OutOfBounds { addr, len })
        }
    }

    fn slice(&self, addr: u64, len: u32) -> Result<&[u8], MemoryError> {
        let (region, offset) = self.locate(addr, len)?;
        let block = match region {
            Region::Main => &self.main,
            Region::Io => &self.io,
        };
        Ok(&block[offset..offset + len as usize])
    }

    fn slice_mut(&mut self, addr: u64, len: u32) -> Result<&mut [u8], MemoryError> {
        let (region, offset) = self.locate(addr, len)?;
        let block = match region {
            Region::Main => &mut self.main,
            Region::Io => &mut self.io,
        };
        Ok(&mut block[offset..offset + len as usize])
    }

    pub fn read_byte(&self, addr: u64) -> Result<u8, MemoryError> {
        Ok(self.slice(addr, 1)?[0])
    }

    pub fn write_byte(&mut self, addr: u64, value: u8) -> Result<(), MemoryError> {
        self.slice_mut(addr, 1)?[0] = value;
        Ok(())
    }

    pub fn read_word(&self, addr: u64) -> Result<u32, MemoryError> {
        Ok(LittleEndian::read_u32(self.slice(addr, 4)?))
    }

    pub fn write_word(&mut self, addr: u64, value: u32) -> Result<(), MemoryError> {
        LittleEndian::write_u32(self.slice_mut(addr, 4)?, value);
        Ok(())
    }

    pub fn read_dword(&self, addr: u64) -> Result<u64, MemoryError> {
        Ok(LittleEndian::read_u64(self.slice(addr, 8)?))
    }

    pub fn write_dword(&mut self, addr: u64, value: u64) -> Result<(), MemoryError> {
        LittleEndian::write_u64(self.slice_mut(addr, 8)?, value);
        Ok(())
    }

    pub fn main_len(&self) -> usize {
        self.main.len()
    }

    /// Every 4-byte-aligned word, across both regions, that is non-zero.
    /// Used by the emulator CLI's memory dump; iteration order is address
    /// order within main followed by address order within the I/O page.
    pub fn nonzero_words(&self) -> impl Iterator<Item = (u64, u32)> + '_ {
        let main = self
            .main
            .chunks_exact(4)
            .enumerate()
            .map(|(i, chunk)| ((i * 4) as u64, LittleEndian::read_u32(chunk)));
        let io = self.io.chunks_exact(4).enumerate().map(|(i, chunk)| {
            (MAILBOX_PAGE + (i * 4) as u64, LittleEndian::read_u32(chunk))
        });
        main.chain(io).filter(|(_, w)| *w != 0)
    }
}

impl Default for Memory {
    fn default() -> Memory {
        Memory::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_roundtrips_little_endian() {
        let mut m = Memory::new();
        m.write_word(0x10, 0xdead_beef).unwrap();
        assert_eq!(m.read_byte(0x10).unwrap(), 0xef);
        assert_eq!(m.read_word(0x10).unwrap(), 0xdead_beef);
    }

    #[test]
    fn dword_roundtrips_little_endian() {
        let mut m = Memory::new();
        m.write_dword(0x20, 0x0102_0304_0506_0708).unwrap();
        assert_eq!(m.read_byte(0x20).unwrap(), 0x08);
        assert_eq!(m.read_dword(0x20).unwrap(), 0x0102_0304_0506_0708);
    }

    #[test]
    fn io_page_is_independently_addressable() {
        let mut m = Memory::new();
        m.write_word(MAILBOX_PAGE, 7).unwrap();
        assert_eq!(m.read_word(MAILBOX_PAGE).unwrap(), 7);
    }

    #[test]
    fn access_past_main_end_is_out_of_bounds() {
        let m = Memory::new();
        let past = MAIN_SIZE as u64;
        assert!(matches!(
            m.read_word(past),
            Err(MemoryError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn access_straddling_main_end_is_rejected() {
        let m = Memory::new();
        let addr = MAIN_SIZE as u64 - 2;
        assert!(matches!(
            m.read_word(addr),
            Err(MemoryError::Straddling { .. })
        ));
    }

    #[test]
    fn nonzero_words_spans_both_regions_in_address_order() {
        let mut m = Memory::new();
        m.write_word(0x10, 0xaaaa_bbbb).unwrap();
        m.write_word(MAILBOX_PAGE, 0x1).unwrap();
        let found: Vec<(u64, u32)> = m.nonzero_words().collect();
        assert_eq!(found, vec![(0x10, 0xaaaa_bbbb), (MAILBOX_PAGE, 0x1)]);
    }

    #[test]
    fn load_words_places_word_zero_at_address_zero() {
        let m = Memory::load_words(&[0x1111_1111, 0x2222_2222]).unwrap();
        assert_eq!(m.read_word(0).unwrap(), 0x1111_1111);
        assert_eq!(m.read_word(4).unwrap(), 0x2222_2222);
    }
}
