//! # Decoded TEAL Instructions
//!
//! An instruction is an opcode, its immediate operands, and the source line
//! it was assembled from. Line numbers travel with every instruction so
//! runtime failures can be attributed to source.

use crate::error::{Result, SpecError};
use crate::opcode::Opcode;
use serde::{Deserialize, Serialize};

/// Immediate operand encoded in the instruction stream
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Immediate {
    Uint(u64),
    Bytes(Vec<u8>),
    Field(String),
    Label(String),
}

/// A decoded instruction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub immediates: Vec<Immediate>,
    /// 1-based source line
    pub line: usize,
}

impl Instruction {
    pub fn new(opcode: Opcode, immediates: Vec<Immediate>, line: usize) -> Self {
        Self {
            opcode,
            immediates,
            line,
        }
    }

    /// Instruction without immediates
    pub fn simple(opcode: Opcode, line: usize) -> Self {
        Self::new(opcode, Vec::new(), line)
    }

    fn missing(&self, index: usize, expected: &'static str) -> SpecError {
        SpecError::MissingImmediate {
            opcode: self.opcode,
            index,
            expected,
        }
    }

    /// Integer immediate at `index`
    pub fn uint(&self, index: usize) -> Result<u64> {
        match self.immediates.get(index) {
            Some(Immediate::Uint(v)) => Ok(*v),
            _ => Err(self.missing(index, "uint")),
        }
    }

    /// Byte-string immediate at `index`
    pub fn bytes(&self, index: usize) -> Result<&[u8]> {
        match self.immediates.get(index) {
            Some(Immediate::Bytes(b)) => Ok(b),
            _ => Err(self.missing(index, "bytes")),
        }
    }

    /// Field-name immediate at `index`
    pub fn field(&self, index: usize) -> Result<&str> {
        match self.immediates.get(index) {
            Some(Immediate::Field(name)) => Ok(name),
            _ => Err(self.missing(index, "field")),
        }
    }

    /// Label immediate at `index`
    pub fn label(&self, index: usize) -> Result<&str> {
        match self.immediates.get(index) {
            Some(Immediate::Label(name)) => Ok(name),
            _ => Err(self.missing(index, "label")),
        }
    }

    /// All immediates as integers (`intcblock`)
    pub fn uint_list(&self) -> Result<Vec<u64>> {
        (0..self.immediates.len()).map(|i| self.uint(i)).collect()
    }

    /// All immediates as byte strings (`bytecblock`)
    pub fn bytes_list(&self) -> Result<Vec<Vec<u8>>> {
        (0..self.immediates.len())
            .map(|i| self.bytes(i).map(|b| b.to_vec()))
            .collect()
    }
}
