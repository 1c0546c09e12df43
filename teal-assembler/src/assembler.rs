//! Main assembler logic

use crate::error::{AssemblerError, Result};
use crate::parser::{parse_line, tokenize, Item};
use teal_spec::{Program, MAX_VERSION};

/// Version assumed when the source has no `#pragma version`
pub const DEFAULT_VERSION: u64 = 1;

/// Assemble source code into a program
pub fn assemble(source: &str) -> Result<Program> {
    let mut program = Program::new(DEFAULT_VERSION);
    let mut pragma_line: Option<usize> = None;

    for (index, tokens) in tokenize(source)?.iter().enumerate() {
        let line = index + 1;
        for item in parse_line(tokens, line)? {
            match item {
                Item::Pragma(version) => {
                    let message = if pragma_line.is_some() {
                        Some("duplicate version pragma".to_string())
                    } else if !program.is_empty() {
                        Some("version pragma must precede instructions".to_string())
                    } else if version == 0 || version > MAX_VERSION {
                        Some(format!("unsupported version {} (supported: 1-{})", version, MAX_VERSION))
                    } else {
                        None
                    };
                    if let Some(message) = message {
                        return Err(AssemblerError::InvalidPragma { line, message });
                    }
                    pragma_line = Some(line);
                    program.version = version;
                }
                Item::Label(name) => {
                    if program.define_label(&name).is_err() {
                        return Err(AssemblerError::DuplicateLabel { label: name, line });
                    }
                }
                Item::Instruction(instr) => program.push(instr),
            }
        }
    }

    check(&program)?;
    Ok(program)
}

/// Assemble source code into the binary program form
pub fn assemble_to_bytes(source: &str) -> Result<Vec<u8>> {
    Ok(assemble(source)?.to_bytes()?)
}

/// Opcode availability and branch targets, reported with source lines
fn check(program: &Program) -> Result<()> {
    for instr in &program.instructions {
        let required = instr.opcode.min_version();
        if required > program.version {
            return Err(AssemblerError::VersionMismatch {
                opcode: instr.opcode,
                required,
                version: program.version,
                line: instr.line,
            });
        }
        if instr.opcode.is_branch() {
            let label = instr.label(0)?;
            if program.label_target(label).is_none() {
                return Err(AssemblerError::UndefinedLabel {
                    label: label.to_string(),
                    line: instr.line,
                });
            }
        }
    }
    Ok(())
}
