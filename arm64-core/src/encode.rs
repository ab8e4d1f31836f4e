//! AST -> structured encoding.

use thiserror::Error;

use crate::ast::{
    BranchInstr, BranchKind, DpInstr, DpOp, ExtendKind, Instruction, InstrBody, LoadStoreInstr,
    LsArg, LsIdx, Op2, ShiftKind,
};
use crate::encoding::*;
use crate::register::{Reg, Width};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("branch offset {offset} does not fit in a signed {bits}-bit field")]
    OffsetOverflow { offset: i64, bits: u32 },
    #[error("branch target 0x{target:x} is not 4-byte aligned relative to 0x{from:x}")]
    Misaligned { from: u64, target: u64 },
    #[error("{0}")]
    Invalid(String),
}

/// Bidirectional mapping between the four logical-op/negate pairs and their
/// AST mnemonics. Declared once so encode and decode cannot disagree on it.
const LOGICAL_TABLE: [(DpOp, u32, bool); 8] = [
    (DpOp::And, 0b00, false),
    (DpOp::Bic, 0b00, true),
    (DpOp::Orr, 0b01, false),
    (DpOp::Orn, 0b01, true),
    (DpOp::Eor, 0b10, false),
    (DpOp::Eon, 0b10, true),
    (DpOp::Ands, 0b11, false),
    (DpOp::Bics, 0b11, true),
];

pub fn logical_opc_negate(op: DpOp) -> (u32, bool) {
    LOGICAL_TABLE
        .iter()
        .find(|(o, _, _)| *o == op)
        .map(|(_, opc, negate)| (*opc, *negate))
        .unwrap_or_else(|| panic!("{op:?} is not a logical op"))
}

pub fn logical_from_opc_negate(opc: u32, negate: bool) -> Option<DpOp> {
    LOGICAL_TABLE
        .iter()
        .find(|(_, o, n)| *o == opc && *n == negate)
        .map(|(op, _, _)| *op)
}

fn shift_type_wire(kind: ShiftKind) -> u32 {
    match kind {
        ShiftKind::Lsl => 0,
        ShiftKind::Lsr => 1,
        ShiftKind::Asr => 2,
        ShiftKind::Ror => 3,
    }
}

fn wire(r: Reg) -> u32 {
    r.wire_index()
}

pub fn encode(instr: &Instruction) -> Result<Encoding, EncodeError> {
    match &instr.body {
        InstrBody::Nop => Ok(Encoding::Nop),
        InstrBody::Directive(w) => Ok(Encoding::IntDirective(*w)),
        InstrBody::Dp(dp) => encode_dp(dp),
        InstrBody::Branch(b) => encode_branch(instr.address, b),
        InstrBody::LoadStore(ls) => encode_load_store(instr.address, ls),
    }
}

fn encode_dp(dp: &DpInstr) -> Result<Encoding, EncodeError> {
    let sf = dp.rd.width == Width::X64;
    match dp.op {
        DpOp::Movn | DpOp::Movz | DpOp::Movk => {
            let Op2::ImmShifted { imm, shift } = dp.op2 else {
                return Err(EncodeError::Invalid(
                    "mov-class instruction requires an immediate operand".into(),
                ));
            };
            if shift.amount % 16 != 0 || shift.amount / 16 > 3 {
                return Err(EncodeError::Invalid(format!(
                    "mov shift amount {} must be one of 0, 16, 32, 48",
                    shift.amount
                )));
            }
            let op_tp = match dp.op {
                DpOp::Movn => MovOpTp::Movn,
                DpOp::Movz => MovOpTp::Movz,
                DpOp::Movk => MovOpTp::Movk,
                _ => unreachable!(),
            };
            Ok(Encoding::DpImm(DpImmEnc {
                sf,
                xd: wire(dp.rd),
                kind: DpImmKind::Mov(Mov {
                    op_tp,
                    shift: shift.amount / 16,
                    imm16: imm,
                }),
            }))
        }
        DpOp::Add | DpOp::Adds | DpOp::Sub | DpOp::Subs => {
            let is_subtract = matches!(dp.op, DpOp::Sub | DpOp::Subs);
            let set_flags = dp.op.sets_flags();
            match dp.op2 {
                Op2::ImmShifted { imm, shift } => {
                    if shift.amount != 0 && shift.amount != 12 {
                        return Err(EncodeError::Invalid(
                            "add/sub immediate shift must be 0 or 12".into(),
                        ));
                    }
                    if imm > 0xFFF {
                        return Err(EncodeError::Invalid(format!(
                            "immediate {imm} does not fit in 12 bits"
                        )));
                    }
                    Ok(Encoding::DpImm(DpImmEnc {
                        sf,
                        xd: wire(dp.rd),
                        kind: DpImmKind::AddImm(AddImm {
                            is_subtract,
                            set_flags,
                            shift_imm: shift.amount == 12,
                            imm12: imm,
                            xn: wire(dp.rn),
                        }),
                    }))
                }
                Op2::RegShifted { rm, shift } => Ok(Encoding::DpReg(DpRegEnc {
                    sf,
                    xd: wire(dp.rd),
                    kind: DpRegKind::AddReg(AddReg {
                        is_subtract,
                        set_flags,
                        shift_type: shift_type_wire(shift.kind),
                        shift_amount: shift.amount,
                        xn: wire(dp.rn),
                        xm: wire(rm),
                    }),
                })),
                Op2::MulExtra { .. } => Err(EncodeError::Invalid(
                    "add/sub cannot take a multiply-accumulate operand".into(),
                )),
            }
        }
        DpOp::And | DpOp::Bic | DpOp::Orr | DpOp::Orn | DpOp::Eor | DpOp::Eon | DpOp::Ands
        | DpOp::Bics => match dp.op2 {
            Op2::RegShifted { rm, shift } => {
                let (opc, negate) = logical_opc_negate(dp.op);
                Ok(Encoding::DpReg(DpRegEnc {
                    sf,
                    xd: wire(dp.rd),
                    kind: DpRegKind::LogReg(LogReg {
                        opc,
                        negate,
                        shift_type: shift_type_wire(shift.kind),
                        shift_amount: shift.amount,
                        xn: wire(dp.rn),
                        xm: wire(rm),
                    }),
                }))
            }
            _ => Err(EncodeError::Invalid(
                "logical ops require a shifted-register operand (logical-immediate is not implemented)"
                    .into(),
            )),
        },
        DpOp::Madd | DpOp::Msub => match dp.op2 {
            Op2::MulExtra { rm, ra } => Ok(Encoding::DpReg(DpRegEnc {
                sf,
                xd: wire(dp.rd),
                kind: DpRegKind::Mul(Mul {
                    is_negate: dp.op == DpOp::Msub,
                    xn: wire(dp.rn),
                    xm: wire(rm),
                    xa: wire(ra),
                }),
            })),
            _ => Err(EncodeError::Invalid(
                "madd/msub require a (rm, ra) multiply-accumulate operand".into(),
            )),
        },
    }
}

fn pc_rel_offset(from: u64, to: u64, bits: u32) -> Result<i32, EncodeError> {
    let diff = to as i64 - from as i64;
    if diff % 4 != 0 {
        return Err(EncodeError::Misaligned { from, target: to });
    }
    let off = diff / 4;
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    if off < min || off > max {
        return Err(EncodeError::OffsetOverflow { offset: off, bits });
    }
    Ok(off as i32)
}

fn encode_branch(address: u64, b: &BranchInstr) -> Result<Encoding, EncodeError> {
    match &b.kind {
        BranchKind::Register { rn } => Ok(Encoding::Branch(BranchEnc::BReg { xn: wire(*rn) })),
        BranchKind::Unconditional { target_addr, .. } => {
            let imm26 = pc_rel_offset(address, *target_addr, 26)?;
            Ok(Encoding::Branch(BranchEnc::BImm { imm26 }))
        }
        BranchKind::Conditional {
            cond, target_addr, ..
        } => {
            let imm19 = pc_rel_offset(address, *target_addr, 19)?;
            Ok(Encoding::Branch(BranchEnc::BCond {
                cond: cond.to_wire(),
                imm19,
            }))
        }
    }
}

fn encode_load_store(address: u64, ls: &LoadStoreInstr) -> Result<Encoding, EncodeError> {
    use crate::ast::LoadStoreOp;

    let sf = ls.rt.width == Width::X64;
    let is_ldr = ls.op == LoadStoreOp::Ldr;
    match &ls.arg {
        LsArg::Literal { addr, .. } => {
            if !is_ldr {
                return Err(EncodeError::Invalid("str cannot use the literal form".into()));
            }
            let imm19 = pc_rel_offset(address, *addr, 19)?;
            Ok(Encoding::LoadStore(LoadStoreEnc {
                sf,
                xt: wire(ls.rt),
                kind: LoadStoreKind::LdLit(LdLit { imm19 }),
            }))
        }
        LsArg::Imm { rn, imm, idx } => match idx {
            LsIdx::UOffset => {
                let scale: i64 = if sf { 8 } else { 4 };
                if *imm < 0 || imm % scale != 0 {
                    return Err(EncodeError::Invalid(format!(
                        "unsigned offset {imm} must be a non-negative multiple of {scale}"
                    )));
                }
                let scaled = imm / scale;
                if scaled > 0xFFF {
                    return Err(EncodeError::Invalid(format!(
                        "unsigned offset {imm} does not fit in 12 bits once scaled"
                    )));
                }
                Ok(Encoding::LoadStore(LoadStoreEnc {
                    sf,
                    xt: wire(ls.rt),
                    kind: LoadStoreKind::LsImm(LsImm {
                        is_ldr,
                        xn: wire(*rn),
                        kind: LsImmKind::UnsignedOffset(UnsignedOffset {
                            imm12: scaled as u32,
                        }),
                    }),
                }))
            }
            LsIdx::Pre | LsIdx::Post => {
                if !(-256..=255).contains(imm) {
                    return Err(EncodeError::OffsetOverflow {
                        offset: *imm,
                        bits: 9,
                    });
                }
                let idx = if *idx == LsIdx::Pre {
                    LsIdxEnc::Pre
                } else {
                    LsIdxEnc::Post
                };
                Ok(Encoding::LoadStore(LoadStoreEnc {
                    sf,
                    xt: wire(ls.rt),
                    kind: LoadStoreKind::LsImm(LsImm {
                        is_ldr,
                        xn: wire(*rn),
                        kind: LsImmKind::SignedOffset(SignedOffset {
                            imm9: *imm as i32,
                            idx,
                        }),
                    }),
                }))
            }
        },
        LsArg::Reg { rn, rm, extend } => {
            let extend_tp = match extend.kind {
                ExtendKind::Lsl => 0b011,
                ExtendKind::Sxtx => 0b111,
            };
            Ok(Encoding::LoadStore(LoadStoreEnc {
                sf,
                xt: wire(ls.rt),
                kind: LoadStoreKind::LsReg(LsReg {
                    is_ldr,
                    xn: wire(*rn),
                    rm: wire(*rm),
                    extend_tp,
                    shift_flag: extend.amount != 0,
                }),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_table_is_bijective() {
        for (op, opc, negate) in LOGICAL_TABLE {
            assert_eq!(logical_opc_negate(op), (opc, negate));
            assert_eq!(logical_from_opc_negate(opc, negate), Some(op));
        }
    }

    #[test]
    fn unconditional_branch_offset_is_instruction_count() {
        let b = BranchInstr {
            kind: BranchKind::Unconditional {
                target_addr: 0x20,
                label: None,
            },
        };
        let enc = encode_branch(0x10, &b).unwrap();
        assert_eq!(enc, Encoding::Branch(BranchEnc::BImm { imm26: 4 }));
    }

    #[test]
    fn misaligned_branch_target_is_rejected() {
        let b = BranchInstr {
            kind: BranchKind::Unconditional {
                target_addr: 0x11,
                label: None,
            },
        };
        assert!(matches!(
            encode_branch(0x10, &b),
            Err(EncodeError::Misaligned { .. })
        ));
    }
}
