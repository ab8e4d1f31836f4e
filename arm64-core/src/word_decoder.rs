//! 32-bit wire word -> structured encoding. The inverse of `worder.rs`.

use thiserror::Error;

use crate::bits::{extract, sign_extend};
use crate::constants::NOP_CODE;
use crate::encoding::*;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("word 0x{word:08x} does not match any known opcode pattern")]
    UnrecognizedOpcode { word: u32 },
    #[error("opcode pattern recognized but not implemented: {what}")]
    NotImplemented { what: String },
}

pub fn decode_word(word: u32) -> Result<Encoding, DecodeError> {
    if word == NOP_CODE {
        return Ok(Encoding::Nop);
    }
    let op0 = extract(word, 25, 4);
    if op0 & 0b1110 == 0b1000 {
        return decode_dp_imm(word);
    }
    if op0 & 0b0111 == 0b0101 {
        return decode_dp_reg(word);
    }
    if op0 & 0b1110 == 0b1010 {
        return decode_branch(word);
    }
    if op0 & 0b0101 == 0b0100 {
        return decode_load_store(word);
    }
    Err(DecodeError::UnrecognizedOpcode { word })
}

fn decode_dp_imm(word: u32) -> Result<Encoding, DecodeError> {
    let sf = extract(word, 31, 1) != 0;
    let xd = extract(word, 0, 5);
    let sub = extract(word, 23, 3);
    match sub {
        0b010 => {
            let is_subtract = extract(word, 30, 1) != 0;
            let set_flags = extract(word, 29, 1) != 0;
            let shift_imm = extract(word, 22, 1) != 0;
            let imm12 = extract(word, 10, 12);
            let xn = extract(word, 5, 5);
            Ok(Encoding::DpImm(DpImmEnc {
                sf,
                xd,
                kind: DpImmKind::AddImm(AddImm {
                    is_subtract,
                    set_flags,
                    shift_imm,
                    imm12,
                    xn,
                }),
            }))
        }
        0b100 => Err(DecodeError::NotImplemented {
            what: "logical-immediate DP-immediate".into(),
        }),
        0b101 => {
            let op_tp = match extract(word, 29, 2) {
                0b00 => MovOpTp::Movn,
                0b10 => MovOpTp::Movz,
                0b11 => MovOpTp::Movk,
                _ => return Err(DecodeError::UnrecognizedOpcode { word }),
            };
            let shift = extract(word, 21, 2);
            let imm16 = extract(word, 5, 16);
            Ok(Encoding::DpImm(DpImmEnc {
                sf,
                xd,
                kind: DpImmKind::Mov(Mov { op_tp, shift, imm16 }),
            }))
        }
        _ => Err(DecodeError::UnrecognizedOpcode { word }),
    }
}

fn decode_dp_reg(word: u32) -> Result<Encoding, DecodeError> {
    let sf = extract(word, 31, 1) != 0;
    let xd = extract(word, 0, 5);
    let xn = extract(word, 5, 5);
    let xm = extract(word, 16, 5);
    let op1 = extract(word, 28, 1);
    let op2field = extract(word, 21, 4);
    let bit3 = (op2field >> 3) & 1;
    let bit0 = op2field & 1;

    if op1 == 1 && bit3 == 1 {
        let is_negate = extract(word, 15, 1) != 0;
        let xa = extract(word, 10, 5);
        return Ok(Encoding::DpReg(DpRegEnc {
            sf,
            xd,
            kind: DpRegKind::Mul(Mul {
                is_negate,
                xn,
                xm,
                xa,
            }),
        }));
    }
    if op1 == 0 && bit3 == 0 {
        let opc = extract(word, 29, 2);
        let negate = extract(word, 21, 1) != 0;
        let shift_type = extract(word, 22, 2);
        let shift_amount = extract(word, 10, 6);
        return Ok(Encoding::DpReg(DpRegEnc {
            sf,
            xd,
            kind: DpRegKind::LogReg(LogReg {
                opc,
                negate,
                shift_type,
                shift_amount,
                xn,
                xm,
            }),
        }));
    }
    if bit0 == 0 && bit3 == 1 {
        let is_subtract = extract(word, 30, 1) != 0;
        let set_flags = extract(word, 29, 1) != 0;
        let shift_type = extract(word, 22, 2);
        let shift_amount = extract(word, 10, 6);
        return Ok(Encoding::DpReg(DpRegEnc {
            sf,
            xd,
            kind: DpRegKind::AddReg(AddReg {
                is_subtract,
                set_flags,
                shift_type,
                shift_amount,
                xn,
                xm,
            }),
        }));
    }
    Err(DecodeError::UnrecognizedOpcode { word })
}

fn decode_branch(word: u32) -> Result<Encoding, DecodeError> {
    // bit 31 is set only by BReg's fixed 0b1101011 pattern at bits 25..31;
    // BImm/BCond never set it (bit 25 there is just the sign of imm26/imm19's
    // high bits and must not be used to detect BReg).
    if extract(word, 31, 1) == 1 {
        let xn = extract(word, 5, 5);
        return Ok(Encoding::Branch(BranchEnc::BReg { xn }));
    }
    if extract(word, 30, 1) == 1 {
        let imm19 = extract(word, 5, 19);
        let cond = extract(word, 0, 4);
        return Ok(Encoding::Branch(BranchEnc::BCond {
            cond,
            imm19: sign_extend(imm19, 19) as i32,
        }));
    }
    let imm26 = extract(word, 0, 26);
    Ok(Encoding::Branch(BranchEnc::BImm {
        imm26: sign_extend(imm26, 26) as i32,
    }))
}

fn decode_load_store(word: u32) -> Result<Encoding, DecodeError> {
    let sf = extract(word, 30, 1) != 0;
    let xt = extract(word, 0, 5);

    if extract(word, 31, 1) == 0 {
        let imm19 = extract(word, 5, 19);
        return Ok(Encoding::LoadStore(LoadStoreEnc {
            sf,
            xt,
            kind: LoadStoreKind::LdLit(LdLit {
                imm19: sign_extend(imm19, 19) as i32,
            }),
        }));
    }

    let is_ldr = extract(word, 22, 1) != 0;
    let xn = extract(word, 5, 5);

    if extract(word, 24, 1) == 1 {
        let imm12 = extract(word, 10, 12);
        return Ok(Encoding::LoadStore(LoadStoreEnc {
            sf,
            xt,
            kind: LoadStoreKind::LsImm(LsImm {
                is_ldr,
                xn,
                kind: LsImmKind::UnsignedOffset(UnsignedOffset { imm12 }),
            }),
        }));
    }

    if extract(word, 21, 1) == 1 {
        let rm = extract(word, 16, 5);
        let extend_tp = extract(word, 13, 3);
        let shift_flag = extract(word, 12, 1) != 0;
        return Ok(Encoding::LoadStore(LoadStoreEnc {
            sf,
            xt,
            kind: LoadStoreKind::LsReg(LsReg {
                is_ldr,
                xn,
                rm,
                extend_tp,
                shift_flag,
            }),
        }));
    }

    let idx = match extract(word, 10, 2) {
        0b01 => LsIdxEnc::Post,
        0b11 => LsIdxEnc::Pre,
        _ => return Err(DecodeError::UnrecognizedOpcode { word }),
    };
    let imm9 = sign_extend(extract(word, 12, 9), 9) as i32;
    Ok(Encoding::LoadStore(LoadStoreEnc {
        sf,
        xt,
        kind: LoadStoreKind::LsImm(LsImm {
            is_ldr,
            xn,
            kind: LsImmKind::SignedOffset(SignedOffset { imm9, idx }),
        }),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worder::word;

    #[test]
    fn nop_roundtrips() {
        assert_eq!(decode_word(NOP_CODE).unwrap(), Encoding::Nop);
    }

    #[test]
    fn add_imm_roundtrips_through_word() {
        let enc = Encoding::DpImm(DpImmEnc {
            sf: true,
            xd: 1,
            kind: DpImmKind::AddImm(AddImm {
                is_subtract: false,
                set_flags: true,
                shift_imm: false,
                imm12: 42,
                xn: 2,
            }),
        });
        let w = word(&enc);
        assert_eq!(decode_word(w).unwrap(), enc);
    }

    #[test]
    fn backward_unconditional_branch_is_not_misread_as_breg() {
        let enc = Encoding::Branch(BranchEnc::BImm { imm26: -1 });
        let w = word(&enc);
        assert_eq!(w, 0x17ff_fffc);
        assert_eq!(decode_word(w).unwrap(), enc);
    }

    #[test]
    fn logical_immediate_is_not_implemented() {
        // op0 (bits 28..25) = 0b1001 selects the DP-immediate class; sub
        // (bits 25..23) = 0b100 selects the logical-immediate subclass.
        let w = crate::bits::place(1, 28, 1) | crate::bits::place(1, 25, 1);
        assert!(matches!(
            decode_word(w),
            Err(DecodeError::NotImplemented { .. })
        ));
    }
}
