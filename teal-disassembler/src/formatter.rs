//! Instruction formatting to TEAL source text

use crate::error::{DisassemblerError, Result};
use teal_spec::{Immediate, ImmediateLayout, Instruction};

/// Format instruction as TEAL source text
pub fn format_instruction(instr: &Instruction) -> String {
    let mut text = instr.opcode.mnemonic().to_string();
    for imm in &instr.immediates {
        text.push(' ');
        text.push_str(&format_immediate(imm));
    }
    text
}

/// Format one immediate operand; byte strings are rendered as `0x` hex
pub fn format_immediate(imm: &Immediate) -> String {
    match imm {
        Immediate::Uint(v) => v.to_string(),
        Immediate::Bytes(b) => format!("0x{}", hex::encode(b)),
        Immediate::Field(name) | Immediate::Label(name) => name.clone(),
    }
}

/// Check that an instruction's immediates match its opcode's layout
pub fn check_layout(instr: &Instruction) -> Result<()> {
    let layout = instr.opcode.immediates();
    let imms = instr.immediates.as_slice();
    let ok = match layout {
        ImmediateLayout::None => imms.is_empty(),
        ImmediateLayout::Uint => matches!(imms, [Immediate::Uint(_)]),
        ImmediateLayout::UintUint => matches!(imms, [Immediate::Uint(_), Immediate::Uint(_)]),
        ImmediateLayout::Bytes => matches!(imms, [Immediate::Bytes(_)]),
        ImmediateLayout::UintList => imms.iter().all(|i| matches!(i, Immediate::Uint(_))),
        ImmediateLayout::BytesList => imms.iter().all(|i| matches!(i, Immediate::Bytes(_))),
        ImmediateLayout::Field => matches!(imms, [Immediate::Field(_)]),
        ImmediateLayout::FieldUint => matches!(imms, [Immediate::Field(_), Immediate::Uint(_)]),
        ImmediateLayout::UintField => matches!(imms, [Immediate::Uint(_), Immediate::Field(_)]),
        ImmediateLayout::UintFieldUint => matches!(
            imms,
            [Immediate::Uint(_), Immediate::Field(_), Immediate::Uint(_)]
        ),
        ImmediateLayout::Label => matches!(imms, [Immediate::Label(_)]),
    };
    if ok {
        Ok(())
    } else {
        Err(DisassemblerError::MalformedInstruction {
            opcode: instr.opcode,
            layout,
            line: instr.line,
        })
    }
}
