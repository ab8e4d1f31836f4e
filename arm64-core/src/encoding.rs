//! The structured encoding: a field-accurate mirror of the 32-bit wire
//! format, but still a Rust enum rather than a flat integer. `encode.rs`
//! builds these from the AST, `worder.rs` packs them into `u32`s, and the
//! reverse pipeline (`word_decoder.rs` + `enc_decode.rs`) goes back.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AddImm {
    pub is_subtract: bool,
    pub set_flags: bool,
    /// `true` when the 12-bit immediate is shifted left by 12 before use.
    pub shift_imm: bool,
    pub imm12: u32,
    pub xn: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MovOpTp {
    Movn,
    Movz,
    Movk,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Mov {
    pub op_tp: MovOpTp,
    /// Shift amount in units of 16 bits (0..=3).
    pub shift: u32,
    pub imm16: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DpImmKind {
    AddImm(AddImm),
    Mov(Mov),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DpImmEnc {
    pub sf: bool,
    pub xd: u32,
    pub kind: DpImmKind,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AddReg {
    pub is_subtract: bool,
    pub set_flags: bool,
    pub shift_type: u32,
    pub shift_amount: u32,
    pub xn: u32,
    pub xm: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LogReg {
    pub opc: u32,
    pub negate: bool,
    pub shift_type: u32,
    pub shift_amount: u32,
    pub xn: u32,
    pub xm: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Mul {
    pub is_negate: bool,
    pub xn: u32,
    pub xm: u32,
    pub xa: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DpRegKind {
    AddReg(AddReg),
    LogReg(LogReg),
    Mul(Mul),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DpRegEnc {
    pub sf: bool,
    pub xd: u32,
    pub kind: DpRegKind,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BranchEnc {
    BImm { imm26: i32 },
    BReg { xn: u32 },
    BCond { cond: u32, imm19: i32 },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LsIdxEnc {
    Post,
    Pre,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct UnsignedOffset {
    pub imm12: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SignedOffset {
    pub imm9: i32,
    pub idx: LsIdxEnc,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LsImmKind {
    UnsignedOffset(UnsignedOffset),
    SignedOffset(SignedOffset),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LsImm {
    pub is_ldr: bool,
    pub xn: u32,
    pub kind: LsImmKind,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LsReg {
    pub is_ldr: bool,
    pub xn: u32,
    pub rm: u32,
    pub extend_tp: u32,
    /// Whether the register offset is scaled by the access size (the actual
    /// shift amount is implied by `sf`, matching real ARM64 LDR/STR (register)).
    pub shift_flag: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LdLit {
    pub imm19: i32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LoadStoreKind {
    LsImm(LsImm),
    LsReg(LsReg),
    LdLit(LdLit),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LoadStoreEnc {
    pub sf: bool,
    pub xt: u32,
    pub kind: LoadStoreKind,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Encoding {
    DpImm(DpImmEnc),
    DpReg(DpRegEnc),
    Branch(BranchEnc),
    LoadStore(LoadStoreEnc),
    IntDirective(u32),
    Nop,
}
