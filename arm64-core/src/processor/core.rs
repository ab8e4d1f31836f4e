use thiserror::Error;

use crate::ast::{Address, DpOp, InstrBody, Op2};
use crate::constants::{GPR_COUNT, HALT_SENTINEL};
use crate::enc_decode::decode_to_ast;
use crate::memory::{Memory, MemoryError};
use crate::register::{Reg, RegIndex, Width};
use crate::word_decoder::{decode_word, DecodeError};

/// True for any decoded shape of `AND X0, X0, X0`, regardless of the shift
/// kind or amount applied to the third operand (the original emulator's
/// `is_halt_instr` only compares op/rd/rn/rm).
fn is_halt_shape(body: &InstrBody) -> bool {
    let InstrBody::Dp(dp) = body else { return false };
    if dp.op != DpOp::And {
        return false;
    }
    let is_x0 = |r: &Reg| r.width == Width::X64 && matches!(r.index, RegIndex::General(0));
    if !is_x0(&dp.rd) || !is_x0(&dp.rn) {
        return false;
    }
    matches!(dp.op2, Op2::RegShifted { rm, .. } if is_x0(&rm))
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("unsupported instruction at pc=0x{pc:x}: {detail}")]
    Unsupported { pc: u64, detail: String },
    #[error("fetched a directive word 0x{word:08x} at pc=0x{pc:x}: directives are data, not instructions")]
    ExecuteDirective { pc: u64, word: u32 },
}

/// Condition flags, as set by the `S`-suffixed data-processing instructions.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct PState {
    pub n: bool,
    pub z: bool,
    pub c: bool,
    pub v: bool,
}

/// Why `Cpu::run` stopped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExitReason {
    Halted,
    BudgetExhausted,
}

pub struct Cpu {
    gpr: [u64; GPR_COUNT],
    pub sp: u64,
    pub pc: Address,
    pub pstate: PState,
    pub memory: Memory,
    pub halted: bool,
    pub instructions_executed: u64,
}

impl Cpu {
    pub fn new(memory: Memory) -> Cpu {
        Cpu {
            gpr: [0; GPR_COUNT],
            sp: 0,
            pc: 0,
            pstate: PState::default(),
            memory,
            halted: false,
            instructions_executed: 0,
        }
    }

    pub fn gpr(&self, n: u8) -> u64 {
        self.gpr[n as usize]
    }

    pub fn set_gpr(&mut self, n: u8, value: u64) {
        self.gpr[n as usize] = value;
    }

    /// Reads through a register reference, masking to 32 bits for `W`
    /// accesses and returning 0 unconditionally for the zero register.
    pub fn read_reg(&self, r: &Reg) -> u64 {
        let raw = match r.index {
            RegIndex::General(n) => self.gpr[n as usize],
            RegIndex::Zr => return 0,
            RegIndex::Sp => self.sp,
            RegIndex::Pc => self.pc,
        };
        if r.width == Width::W32 {
            raw & 0xFFFF_FFFF
        } else {
            raw
        }
    }

    /// Writes through a register reference. `W` accesses zero-extend into
    /// the full 64-bit slot; writes through the zero register are discarded.
    pub fn write_reg(&mut self, r: &Reg, value: u64) {
        let masked = if r.width == Width::W32 {
            value & 0xFFFF_FFFF
        } else {
            value
        };
        match r.index {
            RegIndex::General(n) => self.gpr[n as usize] = masked,
            RegIndex::Zr => {}
            RegIndex::Sp => self.sp = masked,
            RegIndex::Pc => self.pc = masked,
        }
    }

    /// Executes one instruction. Returns `true` if the CPU halted as a
    /// result (either via the halt sentinel or a `ret`-style register
    /// branch to address 0, which this subset does not model separately).
    pub fn step(&mut self) -> Result<bool, ProcessorError> {
        let word = self.memory.read_word(self.pc)?;
        if word == HALT_SENTINEL {
            self.halted = true;
            return Ok(true);
        }
        let enc = decode_word(word)?;
        let instr = decode_to_ast(&enc, self.pc)?;
        if is_halt_shape(&instr.body) {
            self.halted = true;
            return Ok(true);
        }
        let fallthrough_pc = self.pc.wrapping_add(4);
        self.pc = fallthrough_pc;
        super::logic::execute(self, &instr.body)?;
        self.instructions_executed += 1;
        Ok(self.halted)
    }

    /// Runs until halted or, if `budget` is given, until that many
    /// instructions have executed.
    pub fn run(&mut self, budget: Option<u64>) -> Result<ExitReason, ProcessorError> {
        loop {
            if let Some(b) = budget {
                if self.instructions_executed >= b {
                    return Ok(ExitReason::BudgetExhausted);
                }
            }
            if self.step()? {
                return Ok(ExitReason::Halted);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    #[test]
    fn halt_sentinel_stops_the_loop() {
        let mem = Memory::load_words(&[HALT_SENTINEL]).unwrap();
        let mut cpu = Cpu::new(mem);
        let reason = cpu.run(None).unwrap();
        assert_eq!(reason, ExitReason::Halted);
        assert!(cpu.halted);
    }

    #[test]
    fn zero_register_write_is_discarded() {
        let mem = Memory::load_words(&[HALT_SENTINEL]).unwrap();
        let mut cpu = Cpu::new(mem);
        cpu.write_reg(&Reg::zr(Width::X64), 0xdead_beef);
        assert_eq!(cpu.read_reg(&Reg::zr(Width::X64)), 0);
    }

    #[test]
    fn halt_shape_with_nonzero_shift_still_halts() {
        use crate::ast::{Instruction, Shift, ShiftKind};

        let x0 = Reg::gpr(0, Width::X64);
        let instr = Instruction {
            address: 0,
            body: InstrBody::Dp(crate::ast::DpInstr {
                op: DpOp::And,
                rd: x0,
                rn: x0,
                op2: Op2::RegShifted {
                    rm: x0,
                    shift: Shift {
                        kind: ShiftKind::Ror,
                        amount: 5,
                    },
                },
            }),
        };
        let word = crate::encode_instruction(&instr).unwrap();
        let mem = Memory::load_words(&[word]).unwrap();
        let mut cpu = Cpu::new(mem);
        let reason = cpu.run(None).unwrap();
        assert_eq!(reason, ExitReason::Halted);
        assert!(cpu.halted);
        assert_eq!(cpu.instructions_executed, 0);
    }

    #[test]
    fn w32_write_zero_extends_and_read_masks() {
        let mem = Memory::load_words(&[HALT_SENTINEL]).unwrap();
        let mut cpu = Cpu::new(mem);
        cpu.set_gpr(0, 0xffff_ffff_ffff_ffff);
        cpu.write_reg(&Reg::gpr(0, Width::W32), 0xffff_ffff);
        assert_eq!(cpu.gpr(0), 0xffff_ffff);
        assert_eq!(cpu.read_reg(&Reg::gpr(0, Width::W32)), 0xffff_ffff);
    }
}
