//! End-to-end scenarios driving real source text through `assemble` and
//! then through the emulator core, checking final register/flag/memory
//! state rather than just the encoded words.

use arm64_core::processor::{Cpu, ExitReason};
use arm64_core::register::Width;
use arm64_core::Memory;

use crate::assemble;

fn run_to_halt(source: &str) -> Cpu {
    let assembled = assemble(source).unwrap();
    let memory = Memory::load_words(&assembled.words).unwrap();
    let mut cpu = Cpu::new(memory);
    assert_eq!(cpu.run(None).unwrap(), ExitReason::Halted);
    cpu
}

fn reg(cpu: &Cpu, n: u8) -> u64 {
    cpu.read_reg(&arm64_core::register::Reg::gpr(n, Width::X64))
}

#[test]
fn movz_then_adds() {
    let cpu = run_to_halt(
        "\
        movz x0, #5\n\
        movz x1, #7\n\
        adds x2, x0, x1\n\
        .int 0x8a000000\n",
    );
    assert_eq!(reg(&cpu, 0), 5);
    assert_eq!(reg(&cpu, 1), 7);
    assert_eq!(reg(&cpu, 2), 12);
    assert_eq!(cpu.pstate.n, false);
    assert_eq!(cpu.pstate.z, false);
    assert_eq!(cpu.pstate.c, false);
    assert_eq!(cpu.pstate.v, false);
}

#[test]
fn adds_signed_overflow_sets_v_and_n() {
    let cpu = run_to_halt(
        "\
        movz x0, #0x7fff, lsl #48\n\
        movz x0, #0xffff\n\
        movk x0, #0xffff, lsl #16\n\
        movk x0, #0xffff, lsl #32\n\
        movk x0, #0x7fff, lsl #48\n\
        movz x1, #1\n\
        adds x2, x0, x1\n\
        .int 0x8a000000\n",
    );
    assert_eq!(reg(&cpu, 2), 0x8000_0000_0000_0000);
    assert!(cpu.pstate.v);
    assert!(cpu.pstate.n);
    assert!(!cpu.pstate.z);
    assert!(!cpu.pstate.c);
}

#[test]
fn conditional_branch_loops_until_zero() {
    let cpu = run_to_halt(
        "\
        movz x0, #3\n\
        loop:\n\
        subs x0, x0, #1\n\
        b.ne loop\n\
        .int 0x8a000000\n",
    );
    assert_eq!(reg(&cpu, 0), 0);
    assert!(cpu.pstate.z);
}

#[test]
fn pre_index_store_then_load() {
    let cpu = run_to_halt(
        "\
        movz x0, #0x100\n\
        movz x1, #0xabcd\n\
        str x1, [x0, #8]!\n\
        ldr x2, [x0]\n\
        .int 0x8a000000\n",
    );
    assert_eq!(reg(&cpu, 0), 0x108);
    assert_eq!(reg(&cpu, 2), 0xabcd);
    assert_eq!(cpu.memory.read_dword(0x108).unwrap(), 0xabcd);
}

#[test]
fn ror_shift_rotates_into_high_bit() {
    let cpu = run_to_halt(
        "\
        movz x0, #1\n\
        orr x1, xzr, x0, ror #1\n\
        .int 0x8a000000\n",
    );
    assert_eq!(reg(&cpu, 1), 0x8000_0000_0000_0000);
}

#[test]
fn directive_is_data_not_code() {
    let assembled = assemble(
        "\
        ldr x0, data\n\
        b end\n\
        data:\n\
        .int 0xdeadbeef\n\
        end:\n",
    )
    .unwrap();
    let memory = Memory::load_words(&assembled.words).unwrap();
    let mut cpu = Cpu::new(memory);
    assert_eq!(cpu.run(Some(2)).unwrap(), ExitReason::BudgetExhausted);
    assert_eq!(reg(&cpu, 0), 0xdeadbeef);
}
