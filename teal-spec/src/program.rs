//! # Program Structure for TEAL
//!
//! A program is a TEAL version, a flat list of decoded instructions, and a
//! label table mapping branch targets to instruction indices.
//!
//! Binary form is the bincode encoding of the whole structure. The program
//! digest follows the logic-signature address derivation:
//! `SHA-512/256("Program" || encoded)`.

use crate::error::{Result, SpecError};
use crate::instruction::Instruction;
use crate::MAX_VERSION;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};
use std::collections::BTreeMap;
use std::fmt;

/// Domain separation prefix for program digests
pub const PROGRAM_DIGEST_PREFIX: &[u8] = b"Program";

/// Decoded TEAL program
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// TEAL version (`#pragma version N`)
    pub version: u64,

    /// Instructions in execution order
    pub instructions: Vec<Instruction>,

    /// Label name to the index of the instruction that follows it
    pub labels: BTreeMap<String, usize>,
}

impl Program {
    /// Create an empty program for a version
    pub fn new(version: u64) -> Self {
        Self {
            version,
            instructions: Vec::new(),
            labels: BTreeMap::new(),
        }
    }

    /// Create a program from instructions without labels
    pub fn with_instructions(version: u64, instructions: Vec<Instruction>) -> Self {
        Self {
            version,
            instructions,
            labels: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Define a label pointing at the next instruction to be pushed
    pub fn define_label(&mut self, name: &str) -> Result<()> {
        if self.labels.contains_key(name) {
            return Err(SpecError::DuplicateLabel(name.to_string()));
        }
        self.labels.insert(name.to_string(), self.instructions.len());
        Ok(())
    }

    /// Instruction index a label points at
    pub fn label_target(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Check version range, opcode availability, and that every branch
    /// target is defined
    pub fn validate(&self) -> Result<()> {
        if self.version == 0 || self.version > MAX_VERSION {
            return Err(SpecError::UnsupportedVersion {
                version: self.version,
                max: MAX_VERSION,
            });
        }

        for instr in &self.instructions {
            let required = instr.opcode.min_version();
            if required > self.version {
                return Err(SpecError::OpcodeNotAvailable {
                    opcode: instr.opcode,
                    required,
                    version: self.version,
                });
            }
            if instr.opcode.is_branch() {
                let label = instr.label(0)?;
                if !self.labels.contains_key(label) {
                    return Err(SpecError::UnknownLabel(label.to_string()));
                }
            }
        }

        Ok(())
    }

    /// Serialize to the binary program form
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from the binary program form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// SHA-512/256 digest over the prefixed binary form
    pub fn digest(&self) -> Result<[u8; 32]> {
        let encoded = self.to_bytes()?;
        let mut hasher = Sha512_256::new();
        hasher.update(PROGRAM_DIGEST_PREFIX);
        hasher.update(&encoded);
        Ok(hasher.finalize().into())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TEAL v{} ({} instructions, {} labels)",
            self.version,
            self.instructions.len(),
            self.labels.len()
        )
    }
}
