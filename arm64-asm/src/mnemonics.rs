//! Mnemonic -> operand-shape dispatch. The table is built fresh inside each
//! call to [`crate::assemble`]; it owns no global state.

use std::collections::HashMap;

use arm64_core::ast::{
    BranchInstr, BranchKind, Cond, DpInstr, DpOp, InstrBody, LoadStoreInstr, LoadStoreOp, LsArg,
    Op2,
};
use arm64_core::register::Reg;

use crate::error::ParseError;
use crate::operands::{parse_imm, parse_ls_addr, parse_reg, parse_shift_suffix, LsAddr};

pub type Labels = HashMap<String, u64>;

type MnemonicFn = fn(&[String], u64, &Labels, usize) -> Result<InstrBody, ParseError>;

pub struct MnemonicTable {
    handlers: HashMap<&'static str, MnemonicFn>,
}

impl MnemonicTable {
    pub fn build() -> MnemonicTable {
        let mut handlers: HashMap<&'static str, MnemonicFn> = HashMap::new();
        handlers.insert("nop", nop);
        handlers.insert("add", dp_add_sub(DpOp::Add));
        handlers.insert("adds", dp_add_sub(DpOp::Adds));
        handlers.insert("sub", dp_add_sub(DpOp::Sub));
        handlers.insert("subs", dp_add_sub(DpOp::Subs));
        handlers.insert("and", dp_logical(DpOp::And));
        handlers.insert("bic", dp_logical(DpOp::Bic));
        handlers.insert("orr", dp_logical(DpOp::Orr));
        handlers.insert("orn", dp_logical(DpOp::Orn));
        handlers.insert("eor", dp_logical(DpOp::Eor));
        handlers.insert("eon", dp_logical(DpOp::Eon));
        handlers.insert("ands", dp_logical(DpOp::Ands));
        handlers.insert("bics", dp_logical(DpOp::Bics));
        handlers.insert("movn", dp_mov(DpOp::Movn));
        handlers.insert("movz", dp_mov(DpOp::Movz));
        handlers.insert("movk", dp_mov(DpOp::Movk));
        handlers.insert("madd", dp_mul(DpOp::Madd));
        handlers.insert("msub", dp_mul(DpOp::Msub));
        handlers.insert("b", branch_uncond);
        handlers.insert("br", branch_reg);
        handlers.insert("ldr", load_store(LoadStoreOp::Ldr));
        handlers.insert("str", load_store(LoadStoreOp::Str));
        handlers.insert(".int", directive);
        MnemonicTable { handlers }
    }

    pub fn dispatch(
        &self,
        mnemonic: &str,
        operands: &[String],
        address: u64,
        labels: &Labels,
        line: usize,
    ) -> Result<InstrBody, ParseError> {
        if let Some(cond) = mnemonic.strip_prefix("b.") {
            return branch_cond(cond, operands, address, labels, line);
        }
        let handler = self
            .handlers
            .get(mnemonic)
            .ok_or_else(|| ParseError::UnknownMnemonic {
                line,
                mnemonic: mnemonic.to_string(),
            })?;
        handler(operands, address, labels, line)
    }
}

fn require(operands: &[String], n: usize, line: usize) -> Result<(), ParseError> {
    if operands.len() < n {
        return Err(ParseError::Malformed {
            line,
            detail: format!("expected at least {n} operands, found {}", operands.len()),
        });
    }
    Ok(())
}

fn nop(_operands: &[String], _address: u64, _labels: &Labels, _line: usize) -> Result<InstrBody, ParseError> {
    Ok(InstrBody::Nop)
}

fn directive(operands: &[String], _address: u64, _labels: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    require(operands, 1, line)?;
    let value = parse_imm(&operands[0], line)?;
    Ok(InstrBody::Directive(value as u32))
}

fn dp_add_sub(op: DpOp) -> MnemonicFn {
    match op {
        DpOp::Add => add_sub_add,
        DpOp::Adds => add_sub_adds,
        DpOp::Sub => add_sub_sub,
        DpOp::Subs => add_sub_subs,
        _ => unreachable!(),
    }
}

fn add_sub_common(op: DpOp, operands: &[String], line: usize) -> Result<InstrBody, ParseError> {
    require(operands, 3, line)?;
    let rd = parse_reg(&operands[0], line)?;
    let rn = parse_reg(&operands[1], line)?;
    let op2 = parse_dp_op2(&operands[2..], line)?;
    Ok(InstrBody::Dp(DpInstr { op, rd, rn, op2 }))
}

fn add_sub_add(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    add_sub_common(DpOp::Add, o, line)
}
fn add_sub_adds(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    add_sub_common(DpOp::Adds, o, line)
}
fn add_sub_sub(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    add_sub_common(DpOp::Sub, o, line)
}
fn add_sub_subs(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    add_sub_common(DpOp::Subs, o, line)
}

fn parse_dp_op2(tokens: &[String], line: usize) -> Result<Op2, ParseError> {
    require(tokens, 1, line)?;
    let first = &tokens[0];
    if first.starts_with('#') || first.starts_with('-') || first.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        let imm = parse_imm(first, line)?;
        if imm < 0 {
            return Err(ParseError::Malformed {
                line,
                detail: "data-processing immediates must be non-negative".into(),
            });
        }
        let shift = parse_shift_suffix(&tokens[1..], line)?;
        Ok(Op2::ImmShifted {
            imm: imm as u32,
            shift,
        })
    } else {
        let rm = parse_reg(first, line)?;
        let shift = parse_shift_suffix(&tokens[1..], line)?;
        Ok(Op2::RegShifted { rm, shift })
    }
}

fn dp_logical(op: DpOp) -> MnemonicFn {
    match op {
        DpOp::And => logical_and,
        DpOp::Bic => logical_bic,
        DpOp::Orr => logical_orr,
        DpOp::Orn => logical_orn,
        DpOp::Eor => logical_eor,
        DpOp::Eon => logical_eon,
        DpOp::Ands => logical_ands,
        DpOp::Bics => logical_bics,
        _ => unreachable!(),
    }
}

fn logical_common(op: DpOp, operands: &[String], line: usize) -> Result<InstrBody, ParseError> {
    require(operands, 3, line)?;
    let rd = parse_reg(&operands[0], line)?;
    let rn = parse_reg(&operands[1], line)?;
    let rm = parse_reg(&operands[2], line)?;
    let shift = parse_shift_suffix(&operands[3..], line)?;
    Ok(InstrBody::Dp(DpInstr {
        op,
        rd,
        rn,
        op2: Op2::RegShifted { rm, shift },
    }))
}

fn logical_and(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    logical_common(DpOp::And, o, line)
}
fn logical_bic(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    logical_common(DpOp::Bic, o, line)
}
fn logical_orr(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    logical_common(DpOp::Orr, o, line)
}
fn logical_orn(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    logical_common(DpOp::Orn, o, line)
}
fn logical_eor(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    logical_common(DpOp::Eor, o, line)
}
fn logical_eon(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    logical_common(DpOp::Eon, o, line)
}
fn logical_ands(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    logical_common(DpOp::Ands, o, line)
}
fn logical_bics(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    logical_common(DpOp::Bics, o, line)
}

fn dp_mov(op: DpOp) -> MnemonicFn {
    match op {
        DpOp::Movn => mov_movn,
        DpOp::Movz => mov_movz,
        DpOp::Movk => mov_movk,
        _ => unreachable!(),
    }
}

fn mov_common(op: DpOp, operands: &[String], line: usize) -> Result<InstrBody, ParseError> {
    require(operands, 2, line)?;
    let rd = parse_reg(&operands[0], line)?;
    let imm = parse_imm(&operands[1], line)?;
    if !(0..=0xFFFF).contains(&imm) {
        return Err(ParseError::Malformed {
            line,
            detail: format!("mov immediate {imm} does not fit in 16 bits"),
        });
    }
    let shift = parse_shift_suffix(&operands[2..], line)?;
    Ok(InstrBody::Dp(DpInstr {
        op,
        rd,
        rn: Reg::zr(rd.width),
        op2: Op2::ImmShifted {
            imm: imm as u32,
            shift,
        },
    }))
}

fn mov_movn(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    mov_common(DpOp::Movn, o, line)
}
fn mov_movz(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    mov_common(DpOp::Movz, o, line)
}
fn mov_movk(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    mov_common(DpOp::Movk, o, line)
}

fn dp_mul(op: DpOp) -> MnemonicFn {
    match op {
        DpOp::Madd => mul_madd,
        DpOp::Msub => mul_msub,
        _ => unreachable!(),
    }
}

fn mul_common(op: DpOp, operands: &[String], line: usize) -> Result<InstrBody, ParseError> {
    require(operands, 4, line)?;
    let rd = parse_reg(&operands[0], line)?;
    let rn = parse_reg(&operands[1], line)?;
    let rm = parse_reg(&operands[2], line)?;
    let ra = parse_reg(&operands[3], line)?;
    Ok(InstrBody::Dp(DpInstr {
        op,
        rd,
        rn,
        op2: Op2::MulExtra { rm, ra },
    }))
}

fn mul_madd(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    mul_common(DpOp::Madd, o, line)
}
fn mul_msub(o: &[String], _a: u64, _l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    mul_common(DpOp::Msub, o, line)
}

fn resolve_label(label: &str, labels: &Labels, line: usize) -> Result<u64, ParseError> {
    labels.get(label).copied().ok_or_else(|| ParseError::UndefinedLabel {
        line,
        label: label.to_string(),
    })
}

fn branch_uncond(operands: &[String], _address: u64, labels: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    require(operands, 1, line)?;
    let target_addr = resolve_label(&operands[0], labels, line)?;
    Ok(InstrBody::Branch(BranchInstr {
        kind: BranchKind::Unconditional {
            target_addr,
            label: Some(operands[0].clone()),
        },
    }))
}

fn branch_reg(operands: &[String], _address: u64, _labels: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    require(operands, 1, line)?;
    let rn = parse_reg(&operands[0], line)?;
    Ok(InstrBody::Branch(BranchInstr {
        kind: BranchKind::Register { rn },
    }))
}

fn branch_cond(cond: &str, operands: &[String], _address: u64, labels: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    require(operands, 1, line)?;
    let cond = match cond {
        "eq" => Cond::Eq,
        "ne" => Cond::Ne,
        "ge" => Cond::Ge,
        "lt" => Cond::Lt,
        "gt" => Cond::Gt,
        "le" => Cond::Le,
        "al" => Cond::Al,
        other => {
            return Err(ParseError::Malformed {
                line,
                detail: format!("unknown condition code \"{other}\""),
            })
        }
    };
    let target_addr = resolve_label(&operands[0], labels, line)?;
    Ok(InstrBody::Branch(BranchInstr {
        kind: BranchKind::Conditional {
            cond,
            target_addr,
            label: Some(operands[0].clone()),
        },
    }))
}

fn load_store(op: LoadStoreOp) -> MnemonicFn {
    match op {
        LoadStoreOp::Ldr => ldr,
        LoadStoreOp::Str => str_,
    }
}

fn load_store_common(op: LoadStoreOp, operands: &[String], labels: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    require(operands, 2, line)?;
    let rt = parse_reg(&operands[0], line)?;
    let addr = parse_ls_addr(&operands[1..], line)?;
    let arg = match addr {
        LsAddr::Imm { rn, imm, idx } => LsArg::Imm { rn, imm, idx },
        LsAddr::Reg { rn, rm, extend } => LsArg::Reg { rn, rm, extend },
        LsAddr::Literal { label } => {
            if op == LoadStoreOp::Str {
                return Err(ParseError::Malformed {
                    line,
                    detail: "str cannot use the literal addressing form".into(),
                });
            }
            let addr = resolve_label(&label, labels, line)?;
            LsArg::Literal {
                addr,
                label: Some(label),
            }
        }
    };
    Ok(InstrBody::LoadStore(LoadStoreInstr { op, rt, arg }))
}

fn ldr(o: &[String], _a: u64, l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    load_store_common(LoadStoreOp::Ldr, o, l, line)
}
fn str_(o: &[String], _a: u64, l: &Labels, line: usize) -> Result<InstrBody, ParseError> {
    load_store_common(LoadStoreOp::Str, o, l, line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_mnemonic_is_reported() {
        let table = MnemonicTable::build();
        let labels = Labels::new();
        let err = table.dispatch("frobnicate", &[], 0, &labels, 1).unwrap_err();
        assert!(matches!(err, ParseError::UnknownMnemonic { .. }));
    }

    #[test]
    fn add_with_immediate_operand() {
        let table = MnemonicTable::build();
        let labels = Labels::new();
        let operands: Vec<String> = ["x0", "x1", "#5"].iter().map(|s| s.to_string()).collect();
        let body = table.dispatch("add", &operands, 0, &labels, 1).unwrap();
        assert!(matches!(body, InstrBody::Dp(DpInstr { op: DpOp::Add, .. })));
    }

    #[test]
    fn conditional_branch_resolves_label() {
        let table = MnemonicTable::build();
        let mut labels = Labels::new();
        labels.insert("loop".to_string(), 0x40);
        let operands: Vec<String> = vec!["loop".to_string()];
        let body = table.dispatch("b.ne", &operands, 0x30, &labels, 1).unwrap();
        match body {
            InstrBody::Branch(BranchInstr {
                kind: BranchKind::Conditional { cond, target_addr, .. },
            }) => {
                assert_eq!(cond, Cond::Ne);
                assert_eq!(target_addr, 0x40);
            }
            _ => panic!("expected a conditional branch"),
        }
    }
}
