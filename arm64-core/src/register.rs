//! Register references used throughout the AST. A register reference carries
//! both *which* register and *how wide* the access is (W vs X), since the
//! wire format encodes width as a single `sf` bit shared by the whole
//! instruction rather than per-operand.

use std::fmt;

/// Width of a register access. `W32` accesses zero-extend on write and are
/// masked to 32 bits on read; `X64` accesses use the full register.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Width {
    W32,
    X64,
}

/// Which physical slot a register reference names.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegIndex {
    /// One of R0..R30.
    General(u8),
    /// The architectural zero register (wire index 31 in most contexts).
    Zr,
    /// The stack pointer (wire index 31 in load/store base-register contexts).
    Sp,
    /// The program counter. Never appears on the wire as an operand; used
    /// only for the register-branch target's implicit destination tracking.
    Pc,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Reg {
    pub index: RegIndex,
    pub width: Width,
}

impl Reg {
    pub fn gpr(n: u8, width: Width) -> Reg {
        assert!(n < 31, "general register index out of range: {n}");
        Reg {
            index: RegIndex::General(n),
            width,
        }
    }

    pub fn zr(width: Width) -> Reg {
        Reg {
            index: RegIndex::Zr,
            width,
        }
    }

    pub fn sp(width: Width) -> Reg {
        Reg {
            index: RegIndex::Sp,
            width,
        }
    }

    pub fn pc() -> Reg {
        Reg {
            index: RegIndex::Pc,
            width: Width::X64,
        }
    }

    /// The 5-bit register field this reference occupies on the wire. RZR and
    /// SP share wire slot 31; which one a given field means is determined by
    /// instruction context, not by the bits themselves.
    pub fn wire_index(&self) -> u32 {
        match self.index {
            RegIndex::General(n) => n as u32,
            RegIndex::Zr | RegIndex::Sp => 31,
            RegIndex::Pc => panic!("pc has no wire register slot"),
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.index {
            RegIndex::General(n) => {
                let prefix = if self.width == Width::X64 { "x" } else { "w" };
                write!(f, "{prefix}{n}")
            }
            RegIndex::Zr => write!(f, "{}", if self.width == Width::X64 { "xzr" } else { "wzr" }),
            RegIndex::Sp => write!(f, "{}", if self.width == Width::X64 { "sp" } else { "wsp" }),
            RegIndex::Pc => write!(f, "pc"),
        }
    }
}

/// Reconstructs a general-purpose operand register (rd/rn/rm/ra, or a
/// load/store transfer register) from its wire index: slot 31 is RZR.
pub fn reg_from_wire_gp(wire: u32, width: Width) -> Reg {
    if wire == 31 {
        Reg::zr(width)
    } else {
        Reg::gpr(wire as u8, width)
    }
}

/// Reconstructs a load/store base register from its wire index: slot 31 is
/// SP, matching real ARM64's convention that a base register never legally
/// names the zero register.
pub fn reg_from_wire_base(wire: u32, width: Width) -> Reg {
    if wire == 31 {
        Reg::sp(width)
    } else {
        Reg::gpr(wire as u8, width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_arm64_mnemonics() {
        assert_eq!(Reg::gpr(3, Width::X64).to_string(), "x3");
        assert_eq!(Reg::gpr(3, Width::W32).to_string(), "w3");
        assert_eq!(Reg::zr(Width::X64).to_string(), "xzr");
        assert_eq!(Reg::zr(Width::W32).to_string(), "wzr");
        assert_eq!(Reg::sp(Width::X64).to_string(), "sp");
    }

    #[test]
    fn zr_and_sp_share_wire_slot_31() {
        assert_eq!(Reg::zr(Width::X64).wire_index(), 31);
        assert_eq!(Reg::sp(Width::X64).wire_index(), 31);
    }

    #[test]
    fn wire_roundtrip_for_general_registers() {
        for n in 0..31u8 {
            let r = Reg::gpr(n, Width::X64);
            assert_eq!(reg_from_wire_gp(r.wire_index(), Width::X64), r);
        }
    }
}
