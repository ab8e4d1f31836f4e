//! Two-pass assembly driver: pass 1 builds the label table, pass 2 builds
//! the instruction stream against the now-complete table.
//!
//! Every mnemonic line in this instruction set occupies exactly one 4-byte
//! word, so pass 1 never needs to parse operands — it only has to recognize
//! "this line carries an instruction" and bump the address counter.

use arm64_core::ast::{Address, Instruction};
use arm64_core::encode_instruction;

use crate::error::ParseError;
use crate::lexer::{lex, Line};
use crate::mnemonics::{Labels, MnemonicTable};

/// One assembled line: its source line number, resolved address, AST and
/// encoded word. Used to build the optional listing output.
pub struct Assembled {
    pub lineno: usize,
    pub address: Address,
    pub instruction: Instruction,
    pub word: u32,
}

pub struct AssembleOutput {
    pub words: Vec<u32>,
    pub listing: Vec<Assembled>,
}

pub fn assemble(source: &str) -> Result<AssembleOutput, ParseError> {
    let lines = lex(source);
    let labels = collect_labels(&lines);
    let table = MnemonicTable::build();

    let mut words = Vec::new();
    let mut listing = Vec::new();
    let mut address: Address = 0;

    for line in &lines {
        let Some(mnemonic) = &line.mnemonic else {
            continue;
        };
        let body = table.dispatch(mnemonic, &line.operands, address, &labels, line.lineno)?;
        let instruction = Instruction { address, body };
        let word = encode_instruction(&instruction).map_err(|source| ParseError::EncodeFailed {
            line: line.lineno,
            source,
        })?;
        words.push(word);
        listing.push(Assembled {
            lineno: line.lineno,
            address,
            instruction,
            word,
        });
        address += 4;
    }

    Ok(AssembleOutput { words, listing })
}

fn collect_labels(lines: &[Line]) -> Labels {
    let mut labels = Labels::new();
    let mut address: Address = 0;
    for line in lines {
        if let Some(label) = &line.label {
            labels.insert(label.clone(), address);
        }
        if line.mnemonic.is_some() {
            address += 4;
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_a_forward_branch() {
        let source = "\
            b target\n\
            nop\n\
            target: add x0, x1, x2\n";
        let out = assemble(source).unwrap();
        assert_eq!(out.words.len(), 3);
        assert_eq!(out.listing[2].address, 8);
    }

    #[test]
    fn undefined_label_is_reported() {
        let err = assemble("b nowhere\n").unwrap_err();
        assert!(matches!(err, ParseError::UndefinedLabel { .. }));
    }

    #[test]
    fn directive_emits_raw_word() {
        let out = assemble(".int 0xdeadbeef\n").unwrap();
        assert_eq!(out.words, vec![0xdeadbeefu32]);
    }

    #[test]
    fn mov_and_load_store_round_trip() {
        let source = "\
            movz x0, #4\n\
            ldr x1, [x0, #8]\n\
            str x1, [x0], #8\n\
            str x1, [x0, #8]!\n";
        let out = assemble(source).unwrap();
        assert_eq!(out.words.len(), 4);
    }
}
