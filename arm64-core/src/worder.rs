//! Structured encoding -> 32-bit wire word.

use crate::bits::place;
use crate::constants::NOP_CODE;
use crate::encoding::*;

pub fn word(enc: &Encoding) -> u32 {
    match enc {
        Encoding::Nop => NOP_CODE,
        Encoding::IntDirective(w) => *w,
        Encoding::DpImm(e) => dp_imm_word(e),
        Encoding::DpReg(e) => dp_reg_word(e),
        Encoding::Branch(b) => branch_word(b),
        Encoding::LoadStore(e) => load_store_word(e),
    }
}

fn dp_imm_word(e: &DpImmEnc) -> u32 {
    let mut w = place(e.sf as u32, 31, 1) | place(0b100, 26, 3) | place(e.xd, 0, 5);
    w |= match &e.kind {
        DpImmKind::AddImm(a) => {
            place(a.is_subtract as u32, 30, 1)
                | place(a.set_flags as u32, 29, 1)
                | place(0b010, 23, 3)
                | place(a.shift_imm as u32, 22, 1)
                | place(a.imm12, 10, 12)
                | place(a.xn, 5, 5)
        }
        DpImmKind::Mov(m) => {
            let op_tp = match m.op_tp {
                MovOpTp::Movn => 0b00,
                MovOpTp::Movz => 0b10,
                MovOpTp::Movk => 0b11,
            };
            place(op_tp, 29, 2) | place(0b101, 23, 3) | place(m.shift, 21, 2) | place(m.imm16, 5, 16)
        }
    };
    w
}

fn dp_reg_word(e: &DpRegEnc) -> u32 {
    let mut w = place(e.sf as u32, 31, 1) | place(0b101, 25, 3) | place(e.xd, 0, 5);
    w |= match &e.kind {
        DpRegKind::AddReg(a) => {
            place(a.is_subtract as u32, 30, 1)
                | place(a.set_flags as u32, 29, 1)
                | place(1, 24, 1)
                | place(a.shift_type, 22, 2)
                | place(a.shift_amount, 10, 6)
                | place(a.xn, 5, 5)
                | place(a.xm, 16, 5)
        }
        DpRegKind::LogReg(l) => {
            place(l.opc, 29, 2)
                | place(l.shift_type, 22, 2)
                | place(l.negate as u32, 21, 1)
                | place(l.shift_amount, 10, 6)
                | place(l.xn, 5, 5)
                | place(l.xm, 16, 5)
        }
        DpRegKind::Mul(m) => {
            place(1, 28, 1)
                | place(1, 24, 1)
                | place(m.is_negate as u32, 15, 1)
                | place(m.xa, 10, 5)
                | place(m.xn, 5, 5)
                | place(m.xm, 16, 5)
        }
    };
    w
}

fn branch_word(b: &BranchEnc) -> u32 {
    match b {
        BranchEnc::BCond { cond, imm19 } => {
            place(0b10101, 26, 5) | place(*imm19 as u32, 5, 19) | place(*cond, 0, 4)
        }
        BranchEnc::BImm { imm26 } => place(0b00101, 26, 5) | place(*imm26 as u32, 0, 26),
        BranchEnc::BReg { xn } => place(0b1101011, 25, 7) | place(0b11111, 16, 5) | place(*xn, 5, 5),
    }
}

fn load_store_word(e: &LoadStoreEnc) -> u32 {
    let common = place(e.sf as u32, 30, 1) | place(e.xt, 0, 5);
    common
        | match &e.kind {
            LoadStoreKind::LsImm(i) => {
                let base = place(1, 31, 1) | place(0b111, 27, 3) | place(i.is_ldr as u32, 22, 1) | place(i.xn, 5, 5);
                base
                    | match &i.kind {
                        LsImmKind::UnsignedOffset(u) => place(1, 24, 1) | place(u.imm12, 10, 12),
                        LsImmKind::SignedOffset(s) => {
                            let idx = match s.idx {
                                LsIdxEnc::Post => 0b01,
                                LsIdxEnc::Pre => 0b11,
                            };
                            place(idx, 10, 2) | place(s.imm9 as u32, 12, 9)
                        }
                    }
            }
            LoadStoreKind::LsReg(r) => {
                place(1, 31, 1)
                    | place(0b111, 27, 3)
                    | place(r.is_ldr as u32, 22, 1)
                    | place(r.xn, 5, 5)
                    | place(1, 21, 1)
                    | place(r.rm, 16, 5)
                    | place(r.extend_tp, 13, 3)
                    | place(r.shift_flag as u32, 12, 1)
                    | place(1, 11, 1)
            }
            LoadStoreKind::LdLit(l) => place(0b11, 27, 2) | place(l.imm19 as u32, 5, 19),
        }
}
