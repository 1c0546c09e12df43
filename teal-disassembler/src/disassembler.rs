//! Main disassembler logic

use crate::error::Result;
use crate::formatter::{check_layout, format_instruction};
use std::collections::BTreeMap;
use teal_spec::Program;

/// Disassemble a program into TEAL source text
///
/// The output starts with the version pragma, places each label on its own
/// line before the instruction it points at, and assembles back to an
/// equivalent program.
pub fn disassemble(program: &Program) -> Result<String> {
    let mut labels_at: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for (name, &index) in &program.labels {
        labels_at.entry(index).or_default().push(name);
    }

    let mut output = String::new();
    output.push_str(&format!("#pragma version {}\n", program.version));

    for (index, instr) in program.instructions.iter().enumerate() {
        check_layout(instr)?;
        for label in labels_at.get(&index).into_iter().flatten() {
            output.push_str(&format!("{}:\n", label));
        }
        output.push_str(&format_instruction(instr));
        output.push('\n');
    }

    // Labels that point past the last instruction
    for label in labels_at
        .range(program.instructions.len()..)
        .flat_map(|(_, names)| names)
    {
        output.push_str(&format!("{}:\n", label));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use teal_spec::{Immediate, Instruction, Opcode};

    #[test]
    fn test_disassemble_simple() {
        let program = Program::with_instructions(
            2,
            vec![
                Instruction::new(Opcode::Int, vec![Immediate::Uint(1)], 2),
                Instruction::simple(Opcode::Return, 3),
            ],
        );
        let asm = disassemble(&program).unwrap();
        assert_eq!(asm, "#pragma version 2\nint 1\nreturn\n");
    }

    #[test]
    fn test_disassemble_labels() {
        let mut program = Program::new(4);
        program.push(Instruction::new(Opcode::B, vec![Immediate::Label("end".to_string())], 1));
        program.define_label("mid").unwrap();
        program.push(Instruction::simple(Opcode::Err, 2));
        program.define_label("end").unwrap();

        let asm = disassemble(&program).unwrap();
        assert_eq!(asm, "#pragma version 4\nb end\nmid:\nerr\nend:\n");
    }

    #[test]
    fn test_disassemble_malformed() {
        let program = Program::with_instructions(1, vec![Instruction::simple(Opcode::Txn, 1)]);
        assert!(disassemble(&program).is_err());
    }
}
