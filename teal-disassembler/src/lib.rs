//! # TEAL Disassembler
//!
//! Render decoded TEAL programs back into assembly source.
//!
//! Programs travel in a binary form (the bincode encoding of
//! [`teal_spec::Program`]). [`decode`] loads and checks that form,
//! [`disassemble`] turns a program into source text that the assembler
//! accepts, and [`format_instruction`] renders a single instruction, which
//! the runtime uses for execution traces.
//!
//! ## Example
//!
//! ```rust
//! use teal_spec::{Immediate, Instruction, Opcode, Program};
//! use teal_disassembler::{decode, disassemble};
//!
//! let mut program = Program::new(2);
//! program.push(Instruction::new(Opcode::Int, vec![Immediate::Uint(7)], 1));
//! let bytes = program.to_bytes().unwrap();
//!
//! let program = decode(&bytes).unwrap();
//! println!("{}", disassemble(&program).unwrap());
//! ```

pub mod error;
pub mod decoder;
pub mod formatter;
pub mod disassembler;

pub use error::{DisassemblerError, Result};
pub use disassembler::disassemble;
pub use decoder::decode;
pub use formatter::{format_immediate, format_instruction};

#[cfg(test)]
mod tests {
    use super::*;
    use teal_spec::{Immediate, Instruction, Opcode, Program};

    #[test]
    fn test_public_exports() {
        let _ = DisassemblerError::MalformedInstruction {
            opcode: Opcode::Int,
            layout: Opcode::Int.immediates(),
            line: 1,
        };
    }

    #[test]
    fn test_every_opcode_formats_its_mnemonic() {
        for &op in Opcode::ALL {
            let text = format_instruction(&Instruction::simple(op, 1));
            assert_eq!(text, op.mnemonic());
        }
    }

    #[test]
    fn test_disassemble_with_code() {
        let program = Program::with_instructions(
            5,
            vec![Instruction::new(
                Opcode::Extract,
                vec![Immediate::Uint(1), Immediate::Uint(3)],
                1,
            )],
        );
        let output = disassemble(&program).unwrap();
        assert!(output.contains("#pragma version 5"));
        assert!(output.contains("extract 1 3"));
    }

    // Assembler round trips live in tests/roundtrip.rs
}
