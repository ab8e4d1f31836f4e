//! Structured encoding -> AST. The inverse of `encode.rs`. Needs the
//! instruction's own address to turn PC-relative offsets back into absolute
//! targets.

use crate::ast::*;
use crate::encode::logical_from_opc_negate;
use crate::encoding::*;
use crate::register::{reg_from_wire_base, reg_from_wire_gp, Reg, Width};
use crate::word_decoder::DecodeError;

fn shift_kind_from_wire(w: u32) -> ShiftKind {
    match w {
        0 => ShiftKind::Lsl,
        1 => ShiftKind::Lsr,
        2 => ShiftKind::Asr,
        _ => ShiftKind::Ror,
    }
}

pub fn decode_to_ast(enc: &Encoding, address: Address) -> Result<Instruction, DecodeError> {
    let body = match enc {
        Encoding::Nop => InstrBody::Nop,
        Encoding::IntDirective(w) => InstrBody::Directive(*w),
        Encoding::DpImm(e) => InstrBody::Dp(dp_from_dp_imm(e)?),
        Encoding::DpReg(e) => InstrBody::Dp(dp_from_dp_reg(e)?),
        Encoding::Branch(b) => InstrBody::Branch(branch_from_encoding(b, address)),
        Encoding::LoadStore(ls) => InstrBody::LoadStore(ls_from_encoding(ls, address)),
    };
    Ok(Instruction { address, body })
}

fn width_of(sf: bool) -> Width {
    if sf {
        Width::X64
    } else {
        Width::W32
    }
}

fn dp_from_dp_imm(e: &DpImmEnc) -> Result<DpInstr, DecodeError> {
    let width = width_of(e.sf);
    let rd = reg_from_wire_gp(e.xd, width);
    match &e.kind {
        DpImmKind::AddImm(a) => {
            let op = match (a.is_subtract, a.set_flags) {
                (false, false) => DpOp::Add,
                (false, true) => DpOp::Adds,
                (true, false) => DpOp::Sub,
                (true, true) => DpOp::Subs,
            };
            let rn = reg_from_wire_gp(a.xn, width);
            let amount = if a.shift_imm { 12 } else { 0 };
            Ok(DpInstr {
                op,
                rd,
                rn,
                op2: Op2::ImmShifted {
                    imm: a.imm12,
                    shift: Shift {
                        kind: ShiftKind::Lsl,
                        amount,
                    },
                },
            })
        }
        DpImmKind::Mov(m) => {
            let op = match m.op_tp {
                MovOpTp::Movn => DpOp::Movn,
                MovOpTp::Movz => DpOp::Movz,
                MovOpTp::Movk => DpOp::Movk,
            };
            Ok(DpInstr {
                op,
                rd,
                rn: Reg::zr(width),
                op2: Op2::ImmShifted {
                    imm: m.imm16,
                    shift: Shift {
                        kind: ShiftKind::Lsl,
                        amount: m.shift * 16,
                    },
                },
            })
        }
    }
}

fn dp_from_dp_reg(e: &DpRegEnc) -> Result<DpInstr, DecodeError> {
    let width = width_of(e.sf);
    let rd = reg_from_wire_gp(e.xd, width);
    match &e.kind {
        DpRegKind::AddReg(a) => {
            let op = match (a.is_subtract, a.set_flags) {
                (false, false) => DpOp::Add,
                (false, true) => DpOp::Adds,
                (true, false) => DpOp::Sub,
                (true, true) => DpOp::Subs,
            };
            let rn = reg_from_wire_gp(a.xn, width);
            let rm = reg_from_wire_gp(a.xm, width);
            Ok(DpInstr {
                op,
                rd,
                rn,
                op2: Op2::RegShifted {
                    rm,
                    shift: Shift {
                        kind: shift_kind_from_wire(a.shift_type),
                        amount: a.shift_amount,
                    },
                },
            })
        }
        DpRegKind::LogReg(l) => {
            let op = logical_from_opc_negate(l.opc, l.negate).ok_or_else(|| {
                DecodeError::UnrecognizedOpcode { word: 0 }
            })?;
            let rn = reg_from_wire_gp(l.xn, width);
            let rm = reg_from_wire_gp(l.xm, width);
            Ok(DpInstr {
                op,
                rd,
                rn,
                op2: Op2::RegShifted {
                    rm,
                    shift: Shift {
                        kind: shift_kind_from_wire(l.shift_type),
                        amount: l.shift_amount,
                    },
                },
            })
        }
        DpRegKind::Mul(m) => {
            let op = if m.is_negate { DpOp::Msub } else { DpOp::Madd };
            let rn = reg_from_wire_gp(m.xn, width);
            let rm = reg_from_wire_gp(m.xm, width);
            let ra = reg_from_wire_gp(m.xa, width);
            Ok(DpInstr {
                op,
                rd,
                rn,
                op2: Op2::MulExtra { rm, ra },
            })
        }
    }
}

fn branch_from_encoding(b: &BranchEnc, address: Address) -> BranchInstr {
    match b {
        BranchEnc::BReg { xn } => BranchInstr {
            kind: BranchKind::Register {
                rn: reg_from_wire_gp(*xn, Width::X64),
            },
        },
        BranchEnc::BImm { imm26 } => {
            let target = (address as i64 + (*imm26 as i64) * 4) as u64;
            BranchInstr {
                kind: BranchKind::Unconditional {
                    target_addr: target,
                    label: None,
                },
            }
        }
        BranchEnc::BCond { cond, imm19 } => {
            let target = (address as i64 + (*imm19 as i64) * 4) as u64;
            BranchInstr {
                kind: BranchKind::Conditional {
                    cond: Cond::from_wire(*cond).unwrap_or(Cond::Al),
                    target_addr: target,
                    label: None,
                },
            }
        }
    }
}

fn ls_from_encoding(e: &LoadStoreEnc, address: Address) -> LoadStoreInstr {
    let width = width_of(e.sf);
    let rt = reg_from_wire_gp(e.xt, width);
    match &e.kind {
        LoadStoreKind::LdLit(l) => {
            let target = (address as i64 + (l.imm19 as i64) * 4) as u64;
            LoadStoreInstr {
                op: LoadStoreOp::Ldr,
                rt,
                arg: LsArg::Literal {
                    addr: target,
                    label: None,
                },
            }
        }
        LoadStoreKind::LsImm(i) => {
            let op = if i.is_ldr {
                LoadStoreOp::Ldr
            } else {
                LoadStoreOp::Str
            };
            let rn = reg_from_wire_base(i.xn, Width::X64);
            match &i.kind {
                LsImmKind::UnsignedOffset(u) => LoadStoreInstr {
                    op,
                    rt,
                    arg: LsArg::Imm {
                        rn,
                        imm: u.imm12 as i64 * 8,
                        idx: LsIdx::UOffset,
                    },
                },
                LsImmKind::SignedOffset(s) => {
                    let idx = match s.idx {
                        LsIdxEnc::Pre => LsIdx::Pre,
                        LsIdxEnc::Post => LsIdx::Post,
                    };
                    LoadStoreInstr {
                        op,
                        rt,
                        arg: LsArg::Imm {
                            rn,
                            imm: s.imm9 as i64,
                            idx,
                        },
                    }
                }
            }
        }
        LoadStoreKind::LsReg(r) => {
            let op = if r.is_ldr {
                LoadStoreOp::Ldr
            } else {
                LoadStoreOp::Str
            };
            let rn = reg_from_wire_base(r.xn, Width::X64);
            let rm = reg_from_wire_gp(r.rm, Width::X64);
            let extend_kind = if r.extend_tp == 0b111 {
                ExtendKind::Sxtx
            } else {
                ExtendKind::Lsl
            };
            let amount = if r.shift_flag { 3 } else { 0 };
            LoadStoreInstr {
                op,
                rt,
                arg: LsArg::Reg {
                    rn,
                    rm,
                    extend: Extend {
                        kind: extend_kind,
                        amount,
                    },
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;

    #[test]
    fn add_reg_roundtrips_ast_to_encoding_and_back() {
        let instr = Instruction {
            address: 0x100,
            body: InstrBody::Dp(DpInstr {
                op: DpOp::Adds,
                rd: Reg::gpr(0, Width::X64),
                rn: Reg::gpr(1, Width::X64),
                op2: Op2::RegShifted {
                    rm: Reg::gpr(2, Width::X64),
                    shift: Shift {
                        kind: ShiftKind::Lsl,
                        amount: 3,
                    },
                },
            }),
        };
        let enc = encode(&instr).unwrap();
        let back = decode_to_ast(&enc, instr.address).unwrap();
        assert_eq!(back, instr);
    }

    #[test]
    fn branch_target_reconstructed_from_pc_relative_offset() {
        let instr = Instruction {
            address: 0x40,
            body: InstrBody::Branch(BranchInstr {
                kind: BranchKind::Unconditional {
                    target_addr: 0x30,
                    label: None,
                },
            }),
        };
        let enc = encode(&instr).unwrap();
        let back = decode_to_ast(&enc, instr.address).unwrap();
        assert_eq!(back, instr);
    }
}
