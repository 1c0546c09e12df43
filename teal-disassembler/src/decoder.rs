//! Binary program decoding

use crate::error::Result;
use crate::formatter::check_layout;
use teal_spec::Program;

/// Decode the binary program form and check that it is well formed:
/// supported version, opcodes available at that version, defined branch
/// targets, and immediates matching each opcode's layout
pub fn decode(bytes: &[u8]) -> Result<Program> {
    let program = Program::from_bytes(bytes)?;
    program.validate()?;
    for instr in &program.instructions {
        check_layout(instr)?;
    }
    Ok(program)
}
