//! # Error Types for the TEAL specification crate

use crate::Opcode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    // Program format errors
    #[error("Unsupported TEAL version {version} (supported: 1-{max})")]
    UnsupportedVersion { version: u64, max: u64 },

    #[error("Opcode {opcode} requires TEAL version {required}, program is version {version}")]
    OpcodeNotAvailable {
        opcode: Opcode,
        required: u64,
        version: u64,
    },

    // Instruction errors
    #[error("{opcode}: missing {expected} immediate at position {index}")]
    MissingImmediate {
        opcode: Opcode,
        index: usize,
        expected: &'static str,
    },

    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    #[error("Duplicate label: {0}")]
    DuplicateLabel(String),

    // Encoding errors
    #[error("Program encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, SpecError>;
