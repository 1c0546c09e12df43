//! Assembler errors

use teal_spec::{Opcode, SpecError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssemblerError {
    #[error("Syntax error at line {line}, column {column}: {message}")]
    SyntaxError {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Unknown instruction {mnemonic} at line {line}")]
    UnknownInstruction { mnemonic: String, line: usize },

    #[error("Invalid immediate at line {line}, column {column}: {message}")]
    InvalidImmediate {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Undefined label {label} at line {line}")]
    UndefinedLabel { label: String, line: usize },

    #[error("Duplicate label {label} at line {line}")]
    DuplicateLabel { label: String, line: usize },

    #[error("Invalid pragma at line {line}: {message}")]
    InvalidPragma { line: usize, message: String },

    #[error("{opcode} requires TEAL version {required}, program is version {version} (line {line})")]
    VersionMismatch {
        opcode: Opcode,
        required: u64,
        version: u64,
        line: usize,
    },

    #[error("{feature} is not supported (line {line})")]
    Unsupported { feature: String, line: usize },

    #[error("Invalid program: {0}")]
    Program(#[from] SpecError),
}

impl AssemblerError {
    /// Source line the error points at, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            AssemblerError::SyntaxError { line, .. }
            | AssemblerError::UnknownInstruction { line, .. }
            | AssemblerError::InvalidImmediate { line, .. }
            | AssemblerError::UndefinedLabel { line, .. }
            | AssemblerError::DuplicateLabel { line, .. }
            | AssemblerError::InvalidPragma { line, .. }
            | AssemblerError::VersionMismatch { line, .. }
            | AssemblerError::Unsupported { line, .. } => Some(*line),
            AssemblerError::Program(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AssemblerError>;
