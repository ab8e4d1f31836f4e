//! The instruction AST. This is the form the parser produces and the
//! emulator consumes; it is isomorphic to neither the text nor the wire
//! format but sits between them.

use std::fmt;

use crate::register::{Reg, RegIndex, Width};

pub type Address = u64;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DpOp {
    Add,
    Adds,
    Sub,
    Subs,
    And,
    Bic,
    Orr,
    Orn,
    Eor,
    Eon,
    Ands,
    Bics,
    Movn,
    Movz,
    Movk,
    Madd,
    Msub,
}

impl DpOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            DpOp::Add => "add",
            DpOp::Adds => "adds",
            DpOp::Sub => "sub",
            DpOp::Subs => "subs",
            DpOp::And => "and",
            DpOp::Bic => "bic",
            DpOp::Orr => "orr",
            DpOp::Orn => "orn",
            DpOp::Eor => "eor",
            DpOp::Eon => "eon",
            DpOp::Ands => "ands",
            DpOp::Bics => "bics",
            DpOp::Movn => "movn",
            DpOp::Movz => "movz",
            DpOp::Movk => "movk",
            DpOp::Madd => "madd",
            DpOp::Msub => "msub",
        }
    }

    pub fn sets_flags(&self) -> bool {
        matches!(self, DpOp::Adds | DpOp::Subs | DpOp::Ands | DpOp::Bics)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ShiftKind::Lsl => "lsl",
            ShiftKind::Lsr => "lsr",
            ShiftKind::Asr => "asr",
            ShiftKind::Ror => "ror",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Shift {
    pub kind: ShiftKind,
    pub amount: u32,
}

impl Shift {
    pub fn none() -> Shift {
        Shift {
            kind: ShiftKind::Lsl,
            amount: 0,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExtendKind {
    Lsl,
    Sxtx,
}

impl fmt::Display for ExtendKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ExtendKind::Lsl => "lsl",
            ExtendKind::Sxtx => "sxtx",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Extend {
    pub kind: ExtendKind,
    pub amount: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Op2 {
    ImmShifted { imm: u32, shift: Shift },
    RegShifted { rm: Reg, shift: Shift },
    MulExtra { rm: Reg, ra: Reg },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DpInstr {
    pub op: DpOp,
    pub rd: Reg,
    pub rn: Reg,
    pub op2: Op2,
}

impl fmt::Display for DpInstr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.op {
            DpOp::Movn | DpOp::Movz | DpOp::Movk => match &self.op2 {
                Op2::ImmShifted { imm, shift } if shift.amount == 0 => {
                    write!(f, "{} {}, #{}", self.op.mnemonic(), self.rd, imm)
                }
                Op2::ImmShifted { imm, shift } => write!(
                    f,
                    "{} {}, #{}, lsl #{}",
                    self.op.mnemonic(),
                    self.rd,
                    imm,
                    shift.amount
                ),
                _ => write!(f, "{} {}, <bad operand>", self.op.mnemonic(), self.rd),
            },
            DpOp::Madd | DpOp::Msub => match &self.op2 {
                Op2::MulExtra { rm, ra } => write!(
                    f,
                    "{} {}, {}, {}, {}",
                    self.op.mnemonic(),
                    self.rd,
                    self.rn,
                    rm,
                    ra
                ),
                _ => write!(f, "{} {}, {}, <bad operand>", self.op.mnemonic(), self.rd, self.rn),
            },
            _ => match &self.op2 {
                Op2::ImmShifted { imm, shift } if shift.amount == 0 => {
                    write!(f, "{} {}, {}, #{}", self.op.mnemonic(), self.rd, self.rn, imm)
                }
                Op2::ImmShifted { imm, shift } => write!(
                    f,
                    "{} {}, {}, #{}, {} #{}",
                    self.op.mnemonic(),
                    self.rd,
                    self.rn,
                    imm,
                    shift.kind,
                    shift.amount
                ),
                Op2::RegShifted { rm, shift } if shift.amount == 0 => {
                    write!(f, "{} {}, {}, {}", self.op.mnemonic(), self.rd, self.rn, rm)
                }
                Op2::RegShifted { rm, shift } => write!(
                    f,
                    "{} {}, {}, {}, {} #{}",
                    self.op.mnemonic(),
                    self.rd,
                    self.rn,
                    rm,
                    shift.kind,
                    shift.amount
                ),
                Op2::MulExtra { .. } => {
                    write!(f, "{} {}, {}, <bad operand>", self.op.mnemonic(), self.rd, self.rn)
                }
            },
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cond {
    Eq = 0x0,
    Ne = 0x1,
    Ge = 0xa,
    Lt = 0xb,
    Gt = 0xc,
    Le = 0xd,
    Al = 0xe,
}

impl Cond {
    pub fn to_wire(self) -> u32 {
        self as u32
    }

    pub fn from_wire(w: u32) -> Option<Cond> {
        match w {
            0x0 => Some(Cond::Eq),
            0x1 => Some(Cond::Ne),
            0xa => Some(Cond::Ge),
            0xb => Some(Cond::Lt),
            0xc => Some(Cond::Gt),
            0xd => Some(Cond::Le),
            0xe => Some(Cond::Al),
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Cond::Eq => "eq",
            Cond::Ne => "ne",
            Cond::Ge => "ge",
            Cond::Lt => "lt",
            Cond::Gt => "gt",
            Cond::Le => "le",
            Cond::Al => "al",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BranchKind {
    Unconditional {
        target_addr: Address,
        label: Option<String>,
    },
    Conditional {
        cond: Cond,
        target_addr: Address,
        label: Option<String>,
    },
    Register {
        rn: Reg,
    },
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BranchInstr {
    pub kind: BranchKind,
}

impl fmt::Display for BranchInstr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            BranchKind::Unconditional { target_addr, label } => match label {
                Some(l) => write!(f, "b {l}"),
                None => write!(f, "b 0x{target_addr:x}"),
            },
            BranchKind::Conditional {
                cond,
                target_addr,
                label,
            } => match label {
                Some(l) => write!(f, "b.{} {}", cond.mnemonic(), l),
                None => write!(f, "b.{} 0x{:x}", cond.mnemonic(), target_addr),
            },
            BranchKind::Register { rn } => write!(f, "br {rn}"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LoadStoreOp {
    Ldr,
    Str,
}

impl LoadStoreOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            LoadStoreOp::Ldr => "ldr",
            LoadStoreOp::Str => "str",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LsIdx {
    Pre,
    Post,
    UOffset,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LsArg {
    Imm { rn: Reg, imm: i64, idx: LsIdx },
    Reg { rn: Reg, rm: Reg, extend: Extend },
    Literal { addr: Address, label: Option<String> },
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LoadStoreInstr {
    pub op: LoadStoreOp,
    pub rt: Reg,
    pub arg: LsArg,
}

impl fmt::Display for LoadStoreInstr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mnem = self.op.mnemonic();
        match &self.arg {
            LsArg::Imm { rn, imm, idx } => match idx {
                LsIdx::UOffset if *imm == 0 => write!(f, "{mnem} {}, [{}]", self.rt, rn),
                LsIdx::UOffset => write!(f, "{mnem} {}, [{}, #{}]", self.rt, rn, imm),
                LsIdx::Pre => write!(f, "{mnem} {}, [{}, #{}]!", self.rt, rn, imm),
                LsIdx::Post => write!(f, "{mnem} {}, [{}], #{}", self.rt, rn, imm),
            },
            LsArg::Reg { rn, rm, extend } if extend.amount == 0 => {
                write!(f, "{mnem} {}, [{}, {}, {}]", self.rt, rn, rm, extend.kind)
            }
            LsArg::Reg { rn, rm, extend } => write!(
                f,
                "{mnem} {}, [{}, {}, {} #{}]",
                self.rt, rn, rm, extend.kind, extend.amount
            ),
            LsArg::Literal { addr, label } => match label {
                Some(l) => write!(f, "{mnem} {}, {}", self.rt, l),
                None => write!(f, "{mnem} {}, 0x{:x}", self.rt, addr),
            },
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum InstrBody {
    Dp(DpInstr),
    Branch(BranchInstr),
    LoadStore(LoadStoreInstr),
    Directive(u32),
    Nop,
}

impl fmt::Display for InstrBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InstrBody::Dp(d) => write!(f, "{d}"),
            InstrBody::Branch(b) => write!(f, "{b}"),
            InstrBody::LoadStore(l) => write!(f, "{l}"),
            InstrBody::Directive(w) => write!(f, ".int 0x{w:x}"),
            InstrBody::Nop => write!(f, "nop"),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Instruction {
    pub address: Address,
    pub body: InstrBody,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.body)
    }
}

/// True if `r` names the zero register (reads as 0, discards writes).
pub fn is_zero_register(r: &Reg) -> bool {
    matches!(r.index, RegIndex::Zr)
}

/// True if an access through `r` is a 32-bit (`W`) access.
pub fn is_narrow(r: &Reg) -> bool {
    r.width == Width::W32
}
