use thiserror::Error;

use arm64_core::EncodeError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: unknown mnemonic \"{mnemonic}\"")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("line {line}: {detail}")]
    Malformed { line: usize, detail: String },

    #[error("line {line}: undefined label \"{label}\"")]
    UndefinedLabel { line: usize, label: String },

    #[error("line {line}: invalid register \"{token}\"")]
    InvalidRegister { line: usize, token: String },

    #[error("line {line}: invalid integer \"{token}\"")]
    InvalidInteger { line: usize, token: String },

    #[error("line {line}: {source}")]
    EncodeFailed { line: usize, source: EncodeError },
}
