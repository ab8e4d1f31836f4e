//! Instruction semantics: condition evaluation, shift/extend application,
//! flag-setting arithmetic, and the per-instruction `execute` dispatch.

use crate::ast::{
    Cond, DpInstr, DpOp, Extend, ExtendKind, InstrBody, LoadStoreInstr, LoadStoreOp, LsArg, LsIdx,
    Op2, Shift, ShiftKind,
};
use crate::register::Width;

use super::core::{Cpu, PState, ProcessorError};

fn width_bits(width: Width) -> u32 {
    match width {
        Width::W32 => 32,
        Width::X64 => 64,
    }
}

fn eval_cond(cond: Cond, p: PState) -> bool {
    match cond {
        Cond::Eq => p.z,
        Cond::Ne => !p.z,
        Cond::Ge => p.n == p.v,
        Cond::Lt => p.n != p.v,
        Cond::Gt => !p.z && p.n == p.v,
        Cond::Le => p.z || p.n != p.v,
        Cond::Al => true,
    }
}

fn apply_shift(value: u64, shift: Shift, width: Width) -> u64 {
    let bits = width_bits(width);
    let v = if bits == 32 { value & 0xFFFF_FFFF } else { value };
    let amt = shift.amount % bits;
    match shift.kind {
        ShiftKind::Lsl => {
            if bits == 32 {
                ((v as u32) << amt) as u64
            } else {
                v << amt
            }
        }
        ShiftKind::Lsr => {
            if bits == 32 {
                ((v as u32) >> amt) as u64
            } else {
                v >> amt
            }
        }
        ShiftKind::Asr => {
            if bits == 32 {
                (((v as u32 as i32) >> amt) as u32) as u64
            } else {
                ((v as i64) >> amt) as u64
            }
        }
        ShiftKind::Ror => {
            if bits == 32 {
                (v as u32).rotate_right(amt) as u64
            } else {
                v.rotate_right(amt)
            }
        }
    }
}

/// Both supported extend kinds act on a 64-bit source register (addresses
/// are always computed as 64-bit values): `Lsl` is a no-op extension with
/// an optional left shift, `Sxtx` is a sign-extension that is a no-op on an
/// already-64-bit value. Only the shift has an observable effect.
fn apply_extend(value: u64, extend: Extend) -> u64 {
    match extend.kind {
        ExtendKind::Lsl | ExtendKind::Sxtx => value << extend.amount,
    }
}

fn to_signed(v: u128, bits: u32) -> i128 {
    let top = 1u128 << (bits - 1);
    if v & top != 0 {
        v as i128 - (1i128 << bits)
    } else {
        v as i128
    }
}

fn width_mask(bits: u32) -> u128 {
    if bits >= 128 {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

/// Addition with flags, computed via i128/u128 intermediates so carry and
/// signed overflow fall out of a single wide comparison rather than manual
/// bit tricks.
fn add_with_flags(a: u64, b: u64, width: Width) -> (u64, PState) {
    let bits = width_bits(width);
    let mask = width_mask(bits);
    let au = (a as u128) & mask;
    let bu = (b as u128) & mask;
    let wide = au + bu;
    let result = (wide & mask) as u64;
    let carry = wide > mask;

    let as_i = to_signed(au, bits);
    let bs_i = to_signed(bu, bits);
    let signed = as_i + bs_i;
    let half = 1i128 << (bits - 1);
    let overflow = signed < -half || signed >= half;

    let n = (result as u128 & (1u128 << (bits - 1))) != 0;
    let z = result & (mask as u64) == 0;
    (result, PState { n, z, c: carry, v: overflow })
}

/// Subtraction with flags. Carry follows the ARM convention: set when there
/// is *no* borrow, i.e. when `a >= b` unsigned.
fn sub_with_flags(a: u64, b: u64, width: Width) -> (u64, PState) {
    let bits = width_bits(width);
    let mask = width_mask(bits);
    let au = (a as u128) & mask;
    let bu = (b as u128) & mask;
    let carry = au >= bu;
    let diff = (au as i128) - (bu as i128);
    let result = ((diff.rem_euclid(1i128 << bits)) as u128 & mask) as u64;

    let as_i = to_signed(au, bits);
    let bs_i = to_signed(bu, bits);
    let signed = as_i - bs_i;
    let half = 1i128 << (bits - 1);
    let overflow = signed < -half || signed >= half;

    let n = (result as u128 & (1u128 << (bits - 1))) != 0;
    let z = result & (mask as u64) == 0;
    (result, PState { n, z, c: carry, v: overflow })
}

fn resolve_arith_op2(cpu: &Cpu, op2: &Op2, width: Width) -> Result<u64, ProcessorError> {
    match op2 {
        Op2::ImmShifted { imm, shift } => Ok(apply_shift(*imm as u64, *shift, width)),
        Op2::RegShifted { rm, shift } => Ok(apply_shift(cpu.read_reg(rm), *shift, width)),
        Op2::MulExtra { .. } => Err(ProcessorError::Unsupported {
            pc: cpu.pc,
            detail: "add/sub cannot take a multiply-accumulate operand".into(),
        }),
    }
}

fn execute_dp(cpu: &mut Cpu, dp: &DpInstr) -> Result<(), ProcessorError> {
    let width = dp.rd.width;
    match dp.op {
        DpOp::Movn | DpOp::Movz | DpOp::Movk => {
            let Op2::ImmShifted { imm, shift } = dp.op2 else {
                return Err(ProcessorError::Unsupported {
                    pc: cpu.pc,
                    detail: "mov-class instruction without an immediate operand".into(),
                });
            };
            let placed = apply_shift(imm as u64, shift, width);
            let result = match dp.op {
                DpOp::Movz => placed,
                DpOp::Movn => !placed,
                DpOp::Movk => {
                    let bits = width_bits(width);
                    let mask = width_mask(bits) as u64 & !(0xFFFFu64 << shift.amount);
                    (cpu.read_reg(&dp.rd) & mask) | placed
                }
                _ => unreachable!(),
            };
            let truncated = if width == Width::W32 {
                result & 0xFFFF_FFFF
            } else {
                result
            };
            cpu.write_reg(&dp.rd, truncated);
        }
        DpOp::Add | DpOp::Adds | DpOp::Sub | DpOp::Subs => {
            let a = cpu.read_reg(&dp.rn);
            let b = resolve_arith_op2(cpu, &dp.op2, width)?;
            let (result, flags) = if matches!(dp.op, DpOp::Add | DpOp::Adds) {
                add_with_flags(a, b, width)
            } else {
                sub_with_flags(a, b, width)
            };
            cpu.write_reg(&dp.rd, result);
            if dp.op.sets_flags() {
                cpu.pstate = flags;
            }
        }
        DpOp::And | DpOp::Bic | DpOp::Orr | DpOp::Orn | DpOp::Eor | DpOp::Eon | DpOp::Ands
        | DpOp::Bics => {
            let a = cpu.read_reg(&dp.rn);
            let Op2::RegShifted { rm, shift } = dp.op2 else {
                return Err(ProcessorError::Unsupported {
                    pc: cpu.pc,
                    detail: "logical instruction without a shifted-register operand".into(),
                });
            };
            let mut b = apply_shift(cpu.read_reg(&rm), shift, width);
            let negate = matches!(dp.op, DpOp::Bic | DpOp::Orn | DpOp::Eon | DpOp::Bics);
            if negate {
                b = !b;
            }
            let bits = width_bits(width);
            let mask = width_mask(bits) as u64;
            let result = match dp.op {
                DpOp::And | DpOp::Bic | DpOp::Ands | DpOp::Bics => a & b,
                DpOp::Orr | DpOp::Orn => a | b,
                DpOp::Eor | DpOp::Eon => a ^ b,
                _ => unreachable!(),
            } & mask;
            cpu.write_reg(&dp.rd, result);
            if dp.op.sets_flags() {
                let n = (result & (1u64 << (bits - 1))) != 0;
                let z = result == 0;
                cpu.pstate = PState {
                    n,
                    z,
                    c: false,
                    v: false,
                };
            }
        }
        DpOp::Madd | DpOp::Msub => {
            let Op2::MulExtra { rm, ra } = dp.op2 else {
                return Err(ProcessorError::Unsupported {
                    pc: cpu.pc,
                    detail: "madd/msub without a multiply-accumulate operand".into(),
                });
            };
            let bits = width_bits(width);
            let mask = width_mask(bits);
            let n = (cpu.read_reg(&dp.rn) as u128) & mask;
            let m = (cpu.read_reg(&rm) as u128) & mask;
            let a = (cpu.read_reg(&ra) as u128) & mask;
            let product = n.wrapping_mul(m);
            let result = if dp.op == DpOp::Madd {
                a.wrapping_add(product)
            } else {
                a.wrapping_sub(product)
            } & mask;
            cpu.write_reg(&dp.rd, result as u64);
        }
    }
    Ok(())
}

fn execute_branch(cpu: &mut Cpu, b: &crate::ast::BranchInstr) -> Result<(), ProcessorError> {
    use crate::ast::BranchKind;
    match &b.kind {
        BranchKind::Register { rn } => {
            cpu.pc = cpu.read_reg(rn);
        }
        BranchKind::Unconditional { target_addr, .. } => {
            cpu.pc = *target_addr;
        }
        BranchKind::Conditional {
            cond, target_addr, ..
        } => {
            if eval_cond(*cond, cpu.pstate) {
                cpu.pc = *target_addr;
            }
        }
    }
    Ok(())
}

fn execute_load_store(cpu: &mut Cpu, ls: &LoadStoreInstr) -> Result<(), ProcessorError> {
    let width = ls.rt.width;
    let access_is_64 = width == Width::X64;

    let addr = match &ls.arg {
        LsArg::Literal { addr, .. } => *addr,
        LsArg::Imm { rn, imm, idx } => {
            let base = cpu.read_reg(rn);
            match idx {
                LsIdx::UOffset => base.wrapping_add(*imm as u64),
                LsIdx::Pre => {
                    let target = (base as i64).wrapping_add(*imm) as u64;
                    cpu.write_reg(rn, target);
                    target
                }
                LsIdx::Post => {
                    let target = (base as i64).wrapping_add(*imm) as u64;
                    cpu.write_reg(rn, target);
                    base
                }
            }
        }
        LsArg::Reg { rn, rm, extend } => {
            let base = cpu.read_reg(rn);
            let offset = apply_extend(cpu.read_reg(rm), *extend);
            base.wrapping_add(offset)
        }
    };

    match ls.op {
        LoadStoreOp::Ldr => {
            let value = if access_is_64 {
                cpu.memory.read_dword(addr)?
            } else {
                cpu.memory.read_word(addr)? as u64
            };
            cpu.write_reg(&ls.rt, value);
        }
        LoadStoreOp::Str => {
            let value = cpu.read_reg(&ls.rt);
            if access_is_64 {
                cpu.memory.write_dword(addr, value)?;
            } else {
                cpu.memory.write_word(addr, value as u32)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn execute(cpu: &mut Cpu, body: &InstrBody) -> Result<(), ProcessorError> {
    match body {
        InstrBody::Dp(dp) => execute_dp(cpu, dp),
        InstrBody::Branch(b) => execute_branch(cpu, b),
        InstrBody::LoadStore(ls) => execute_load_store(cpu, ls),
        InstrBody::Nop => Ok(()),
        InstrBody::Directive(word) => Err(ProcessorError::ExecuteDirective {
            pc: cpu.pc.wrapping_sub(4),
            word: *word,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_unsigned_carry_out() {
        let (result, flags) = add_with_flags(u32::MAX as u64, 1, Width::W32);
        assert_eq!(result, 0);
        assert!(flags.c);
        assert!(flags.z);
        assert!(!flags.v);
    }

    #[test]
    fn add_signed_overflow() {
        let (_, flags) = add_with_flags(i32::MAX as u64, 1, Width::W32);
        assert!(flags.v);
        assert!(flags.n);
    }

    #[test]
    fn sub_no_borrow_sets_carry() {
        let (result, flags) = sub_with_flags(5, 3, Width::X64);
        assert_eq!(result, 2);
        assert!(flags.c);
        assert!(!flags.v);
    }

    #[test]
    fn sub_borrow_clears_carry() {
        let (_, flags) = sub_with_flags(3, 5, Width::X64);
        assert!(!flags.c);
    }

    #[test]
    fn cond_ge_uses_n_eq_v() {
        let p = PState {
            n: true,
            z: false,
            c: false,
            v: true,
        };
        assert!(eval_cond(Cond::Ge, p));
        assert!(!eval_cond(Cond::Lt, p));
    }

    #[cfg(test)]
    mod flags_quickcheck {
        use super::super::*;
        use quickcheck_macros::quickcheck;

        #[quickcheck]
        fn add_flags_match_i128_reference(a: u32, b: u32) -> bool {
            let (result, flags) = add_with_flags(a as u64, b as u64, Width::W32);
            let wide = a as u128 + b as u128;
            let expected_carry = wide > u32::MAX as u128;
            let expected_result = (wide & u32::MAX as u128) as u64;
            let signed = a as i32 as i128 + b as i32 as i128;
            let expected_overflow = signed < i32::MIN as i128 || signed > i32::MAX as i128;
            result == expected_result && flags.c == expected_carry && flags.v == expected_overflow
        }

        #[quickcheck]
        fn sub_flags_match_i128_reference(a: u32, b: u32) -> bool {
            let (result, flags) = sub_with_flags(a as u64, b as u64, Width::W32);
            let expected_result = (a.wrapping_sub(b)) as u64;
            let expected_carry = a >= b;
            let signed = a as i32 as i128 - b as i32 as i128;
            let expected_overflow = signed < i32::MIN as i128 || signed > i32::MAX as i128;
            result == expected_result && flags.c == expected_carry && flags.v == expected_overflow
        }
    }
}
