//! Disassembler errors

use teal_spec::{ImmediateLayout, Opcode, SpecError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisassemblerError {
    #[error("Malformed {opcode} at line {line}: immediates do not match {layout:?}")]
    MalformedInstruction {
        opcode: Opcode,
        layout: ImmediateLayout,
        line: usize,
    },

    #[error("Invalid program: {0}")]
    InvalidProgram(#[from] SpecError),
}

pub type Result<T> = std::result::Result<T, DisassemblerError>;
