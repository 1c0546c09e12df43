//! Assemble, disassemble and assemble again: the instruction stream and
//! label table survive unchanged

use proptest::prelude::*;
use teal_assembler::{assemble, assemble_to_bytes};
use teal_disassembler::{decode, disassemble};
use teal_spec::{Immediate, Opcode, Program};

/// Instruction stream without source lines, which shift once labels move
/// onto their own lines
fn shape(program: &Program) -> Vec<(Opcode, Vec<Immediate>)> {
    program
        .instructions
        .iter()
        .map(|i| (i.opcode, i.immediates.clone()))
        .collect()
}

fn assert_roundtrip(source: &str) {
    let original = assemble(source).unwrap();
    let text = disassemble(&original).unwrap();
    let again = assemble(&text).unwrap();

    assert_eq!(again.version, original.version, "{}", text);
    assert_eq!(shape(&again), shape(&original), "{}", text);
    assert_eq!(again.labels, original.labels, "{}", text);
}

#[test]
fn test_roundtrip_arithmetic() {
    assert_roundtrip("#pragma version 2\nint 5\nint 3\n/\nint 1\n==");
}

#[test]
fn test_roundtrip_constants() {
    assert_roundtrip(
        "#pragma version 3\n\
         intcblock 1 2 18446744073709551615\n\
         bytecblock 0x00ff \"text\" base64 AQID\n\
         intc_2\n\
         bytec 1\n\
         pushint 7\n\
         pushbytes b16(cafe)\n\
         pop\n\
         pop\n\
         pop\n\
         intc 0",
    );
}

#[test]
fn test_roundtrip_named_constants_become_numbers() {
    let original = assemble("int pay\nint appl").unwrap();
    let text = disassemble(&original).unwrap();
    assert!(text.contains("int 1\n"));
    assert!(text.contains("int 6\n"));
    assert_eq!(shape(&assemble(&text).unwrap()), shape(&original));
}

#[test]
fn test_roundtrip_fields() {
    assert_roundtrip(
        "#pragma version 5\n\
         txn Sender\n\
         txn Accounts 1\n\
         gtxn 0 ApplicationArgs 2\n\
         int 0\n\
         gtxns Fee\n\
         global Round\n\
         itxn_begin\n\
         itxn_field Amount\n\
         itxn_submit\n\
         itxna Logs 0",
    );
}

#[test]
fn test_roundtrip_labels() {
    assert_roundtrip(
        "#pragma version 4\n\
         int 0\n\
         loop:\n\
         int 1\n\
         +\n\
         dup\n\
         int 10\n\
         <\n\
         bnz loop\n\
         callsub done\n\
         return\n\
         done:\n\
         retsub\n\
         tail:",
    );
}

#[test]
fn test_roundtrip_byte_ops() {
    assert_roundtrip(
        "#pragma version 5\n\
         byte \"hello\"\n\
         extract 1 3\n\
         byte 0x\n\
         concat\n\
         int 0\n\
         getbyte\n\
         int 1\n\
         cover 1\n\
         uncover 1\n\
         dig 1",
    );
}

#[test]
fn test_binary_decode_then_disassemble() {
    let source = "#pragma version 3\nint 1\nbz skip\nbyte \"x\"\npop\nskip:\nint 1";
    let bytes = assemble_to_bytes(source).unwrap();
    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded, assemble(source).unwrap());

    let text = disassemble(&decoded).unwrap();
    assert_eq!(
        text,
        "#pragma version 3\nint 1\nbz skip\nbyte 0x78\npop\nskip:\nint 1\n"
    );
}

proptest! {
    #[test]
    fn prop_int_roundtrip(values in prop::collection::vec(any::<u64>(), 1..20)) {
        let source: Vec<String> = values.iter().map(|v| format!("pushint {}", v)).collect();
        let source = format!("#pragma version 3\n{}", source.join("\n"));
        let original = assemble(&source).unwrap();
        let again = assemble(&disassemble(&original).unwrap()).unwrap();
        prop_assert_eq!(original, again);
    }

    #[test]
    fn prop_bytes_roundtrip(values in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..10)) {
        let source: Vec<String> = values
            .iter()
            .map(|v| format!("byte 0x{}", hex::encode(v)))
            .collect();
        let original = assemble(&source.join("\n")).unwrap();
        let again = assemble(&disassemble(&original).unwrap()).unwrap();
        prop_assert_eq!(shape(&original), shape(&again));
    }
}
