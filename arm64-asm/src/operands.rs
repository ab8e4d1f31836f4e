//! Parsing of individual operand tokens: registers, immediates, shifts,
//! extends and load/store addressing forms. Shared by every mnemonic
//! handler in `mnemonics.rs`.

use arm64_core::ast::{Extend, ExtendKind, LsIdx, Shift, ShiftKind};
use arm64_core::register::{Reg, Width};

use crate::error::ParseError;

pub fn parse_reg(token: &str, line: usize) -> Result<Reg, ParseError> {
    let lower = token.to_lowercase();
    match lower.as_str() {
        "xzr" => return Ok(Reg::zr(Width::X64)),
        "wzr" => return Ok(Reg::zr(Width::W32)),
        "sp" => return Ok(Reg::sp(Width::X64)),
        "wsp" => return Ok(Reg::sp(Width::W32)),
        _ => {}
    }
    let (width, rest) = if let Some(r) = lower.strip_prefix('x') {
        (Width::X64, r)
    } else if let Some(r) = lower.strip_prefix('w') {
        (Width::W32, r)
    } else {
        return Err(ParseError::InvalidRegister {
            line,
            token: token.to_string(),
        });
    };
    let n: u8 = rest.parse().map_err(|_| ParseError::InvalidRegister {
        line,
        token: token.to_string(),
    })?;
    if n > 30 {
        return Err(ParseError::InvalidRegister {
            line,
            token: token.to_string(),
        });
    }
    Ok(Reg::gpr(n, width))
}

pub fn parse_imm(token: &str, line: usize) -> Result<i64, ParseError> {
    let bad = || ParseError::InvalidInteger {
        line,
        token: token.to_string(),
    };
    let t = token.strip_prefix('#').unwrap_or(token);
    let (neg, t) = match t.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, t),
    };
    let value: i64 = if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map_err(|_| bad())?
    } else {
        t.parse().map_err(|_| bad())?
    };
    Ok(if neg { -value } else { value })
}

/// Parses an optional `<kind> #<amount>` shift suffix starting at `tokens`.
/// Returns `Shift::none()` if there is nothing left to parse.
pub fn parse_shift_suffix(tokens: &[String], line: usize) -> Result<Shift, ParseError> {
    if tokens.is_empty() {
        return Ok(Shift::none());
    }
    let kind = match tokens[0].to_lowercase().as_str() {
        "lsl" => ShiftKind::Lsl,
        "lsr" => ShiftKind::Lsr,
        "asr" => ShiftKind::Asr,
        "ror" => ShiftKind::Ror,
        other => {
            return Err(ParseError::Malformed {
                line,
                detail: format!("unknown shift kind \"{other}\""),
            })
        }
    };
    let amount = if tokens.len() > 1 {
        parse_imm(&tokens[1], line)? as u32
    } else {
        0
    };
    Ok(Shift { kind, amount })
}

/// The result of parsing a load/store address operand, before the literal
/// form's label has been resolved to an address.
pub enum LsAddr {
    Imm { rn: Reg, imm: i64, idx: LsIdx },
    Reg { rn: Reg, rm: Reg, extend: Extend },
    Literal { label: String },
}

/// Parses everything after the transfer register in `ldr rt, <addr>` /
/// `str rt, <addr>`.
pub fn parse_ls_addr(tokens: &[String], line: usize) -> Result<LsAddr, ParseError> {
    let malformed = |detail: String| ParseError::Malformed { line, detail };

    if tokens.first().map(String::as_str) != Some("[") {
        let label = tokens
            .first()
            .ok_or_else(|| malformed("expected an address operand".into()))?;
        return Ok(LsAddr::Literal {
            label: label.clone(),
        });
    }

    let close = tokens
        .iter()
        .position(|t| t == "]")
        .ok_or_else(|| malformed("missing closing ']'".into()))?;
    let inner = &tokens[1..close];
    let after = &tokens[close + 1..];

    if inner.is_empty() {
        return Err(malformed("empty memory operand".into()));
    }
    let rn = parse_reg(&inner[0], line)?;

    if inner.len() == 1 {
        if let Some(imm_tok) = after.first() {
            let imm = parse_imm(imm_tok, line)?;
            return Ok(LsAddr::Imm {
                rn,
                imm,
                idx: LsIdx::Post,
            });
        }
        return Ok(LsAddr::Imm {
            rn,
            imm: 0,
            idx: LsIdx::UOffset,
        });
    }

    if inner[1].starts_with('#') || inner[1].starts_with('-') || inner[1].chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        let imm = parse_imm(&inner[1], line)?;
        let pre = after.first().map(|t| t == "!").unwrap_or(false);
        let idx = if pre { LsIdx::Pre } else { LsIdx::UOffset };
        return Ok(LsAddr::Imm { rn, imm, idx });
    }

    let rm = parse_reg(&inner[1], line)?;
    let extend = if inner.len() >= 3 {
        let kind = match inner[2].to_lowercase().as_str() {
            "lsl" => ExtendKind::Lsl,
            "sxtx" => ExtendKind::Sxtx,
            other => return Err(malformed(format!("unknown extend kind \"{other}\""))),
        };
        let amount = if inner.len() >= 4 {
            parse_imm(&inner[3], line)? as u32
        } else {
            0
        };
        Extend { kind, amount }
    } else {
        Extend {
            kind: ExtendKind::Lsl,
            amount: 0,
        }
    };
    Ok(LsAddr::Reg { rn, rm, extend })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal_and_negative() {
        assert_eq!(parse_imm("#0x10", 1).unwrap(), 16);
        assert_eq!(parse_imm("#10", 1).unwrap(), 10);
        assert_eq!(parse_imm("#-5", 1).unwrap(), -5);
    }

    #[test]
    fn parses_registers_case_insensitively() {
        assert_eq!(parse_reg("X3", 1).unwrap(), Reg::gpr(3, Width::X64));
        assert_eq!(parse_reg("XZR", 1).unwrap(), Reg::zr(Width::X64));
    }

    #[test]
    fn rejects_out_of_range_register() {
        assert!(parse_reg("x31", 1).is_err());
    }
}
