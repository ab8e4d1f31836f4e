//! Instruction model, encode/decode pipeline, memory model and emulator
//! core for the ARM64-subset toolchain. `arm64-asm` and `arm64-emu` build
//! their CLIs on top of this crate; it has no knowledge of text syntax or
//! process-level concerns.

pub mod ast;
pub mod bits;
pub mod constants;
pub mod enc_decode;
pub mod encode;
pub mod encoding;
pub mod memory;
pub mod processor;
pub mod register;
pub mod word_decoder;
pub mod worder;

pub use encode::{encode, EncodeError};
pub use enc_decode::decode_to_ast;
pub use memory::{Memory, MemoryError};
pub use processor::{Cpu, ExitReason, PState, ProcessorError};
pub use word_decoder::{decode_word, DecodeError};
pub use worder::word;

/// Decodes one wire word straight to an AST instruction, addressed at `address`.
pub fn decode_instruction(word: u32, address: ast::Address) -> Result<ast::Instruction, DecodeError> {
    let enc = decode_word(word)?;
    decode_to_ast(&enc, address)
}

/// Encodes one AST instruction straight to its wire word.
pub fn encode_instruction(instr: &ast::Instruction) -> Result<u32, EncodeError> {
    let enc = encode(instr)?;
    Ok(worder::word(&enc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::register::{Reg, Width};

    #[test]
    fn round_trip_through_wire_word() {
        let instr = Instruction {
            address: 0x1000,
            body: InstrBody::Dp(DpInstr {
                op: DpOp::Add,
                rd: Reg::gpr(0, Width::X64),
                rn: Reg::gpr(1, Width::X64),
                op2: Op2::ImmShifted {
                    imm: 5,
                    shift: Shift::none(),
                },
            }),
        };
        let w = encode_instruction(&instr).unwrap();
        let back = decode_instruction(w, instr.address).unwrap();
        assert_eq!(back, instr);
    }
}
