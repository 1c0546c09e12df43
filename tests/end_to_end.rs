//! End-to-end tests: TEAL source assembled and executed
//!
//! Each test states its program in TEAL and checks the halt reason, the
//! final stack, or the diagnostic of an errored run.

use proptest::prelude::*;
use teal_assembler::assemble;
use teal_runtime::{
    ErrorKind, ExecutionResult, HaltReason, InMemoryLedger, Interpreter, InterpreterConfig,
    RuntimeError,
};
use teal_spec::StackValue;

fn run_source(source: &str) -> ExecutionResult {
    let program = assemble(source).unwrap();
    let mut ledger = InMemoryLedger::new();
    Interpreter::new(&program, &mut ledger, InterpreterConfig::signature()).run()
}

fn run_with_args(source: &str, args: Vec<Vec<u8>>) -> ExecutionResult {
    let program = assemble(source).unwrap();
    let mut ledger = InMemoryLedger::new();
    Interpreter::new(&program, &mut ledger, InterpreterConfig::signature())
        .with_args(args)
        .run()
}

fn error_kind(source: &str) -> ErrorKind {
    run_source(source)
        .error()
        .map(|d| d.kind)
        .unwrap_or_else(|| panic!("expected an error running:\n{}", source))
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_integer_division() {
    let result = run_source("int 5\nint 3\n/");
    assert!(result.is_approved());
    assert_eq!(result.stack, vec![StackValue::Uint(1)]);
}

#[test]
fn test_division_by_zero_leaves_operands() {
    let result = run_source("int 5\nint 0\n/");
    let diag = result.error().unwrap();
    assert_eq!(diag.kind, ErrorKind::NumericUnderflow);
    assert_eq!(diag.line, 3);
    assert_eq!(diag.opcode, "/");
    assert_eq!(result.stack, vec![StackValue::Uint(5), StackValue::Uint(0)]);
}

#[test]
fn test_addition_overflow() {
    assert_eq!(
        error_kind("int 18446744073709551615\nint 1\n+"),
        ErrorKind::NumericOverflow
    );
}

#[test]
fn test_subtraction_underflow() {
    assert_eq!(error_kind("int 1\nint 2\n-"), ErrorKind::NumericUnderflow);
}

#[test]
fn test_wide_arithmetic() {
    // (2^64 - 1) * 2 = 1 * 2^64 + (2^64 - 2)
    let result = run_source(
        "#pragma version 2\n\
         int 18446744073709551615\n\
         int 2\n\
         mulw\n\
         int 18446744073709551614\n\
         ==\n\
         assert\n\
         int 1\n\
         ==",
    );
    assert!(result.is_approved());

    let result = run_source(
        "#pragma version 4\n\
         int 1\n\
         int 0\n\
         int 0\n\
         int 2\n\
         divmodw\n\
         pop\n\
         pop\n\
         swap\n\
         pop",
    );
    // 2^64 / 2 = 2^63, quotient low word on top after dropping the remainder
    assert_eq!(result.stack, vec![StackValue::Uint(1 << 63)]);
}

#[test]
fn test_exp_edge_cases() {
    let result = run_source("#pragma version 4\nint 2\nint 10\nexp");
    assert_eq!(result.stack, vec![StackValue::Uint(1024)]);
    assert_eq!(
        error_kind("#pragma version 4\nint 0\nint 0\nexp"),
        ErrorKind::NumericUnderflow
    );
    assert_eq!(
        error_kind("#pragma version 4\nint 2\nint 64\nexp"),
        ErrorKind::NumericOverflow
    );
}

#[test]
fn test_btoi_limits() {
    let result = run_source("byte 0x0102\nbtoi\nint 258\n==");
    assert!(result.is_approved());
    assert_eq!(
        error_kind("byte 0x010203040506070809\nbtoi"),
        ErrorKind::LengthViolation
    );
}

#[test]
fn test_type_mismatch() {
    let result = run_source("int 1\nbyte \"a\"\n+");
    let diag = result.error().unwrap();
    assert_eq!(diag.kind, ErrorKind::TypeMismatch);
    assert_eq!(diag.expected.as_deref(), Some("uint64"));
}

// ============================================================================
// Byte Operations
// ============================================================================

#[test]
fn test_extract_in_range() {
    let result = run_source(
        "#pragma version 5\n\
         byte \"hello\"\n\
         extract 1 3\n\
         byte \"ell\"\n\
         ==",
    );
    assert!(result.is_approved());
}

#[test]
fn test_extract_out_of_range() {
    let result = run_source("#pragma version 5\nbyte \"hello\"\nextract 1 5");
    let diag = result.error().unwrap();
    assert_eq!(diag.kind, ErrorKind::RangeError);
    assert_eq!(diag.line, 3);
    assert_eq!(result.stack, vec![StackValue::Bytes(b"hello".to_vec())]);
}

#[test]
fn test_setbyte_value_must_be_uint8() {
    let result = run_source(
        "#pragma version 3\n\
         byte 0x00\n\
         int 0\n\
         int 300\n\
         setbyte",
    );
    let diag = result.error().unwrap();
    assert_eq!(diag.kind, ErrorKind::TypeMismatch);
    assert!(matches!(diag.error, RuntimeError::InvalidUint8 { value: 300, .. }));

    let result = run_source(
        "#pragma version 3\n\
         byte 0x00\n\
         int 0\n\
         int 255\n\
         setbyte\n\
         byte 0xff\n\
         ==",
    );
    assert!(result.is_approved());
}

#[test]
fn test_substring_bounds() {
    assert!(run_source(
        "#pragma version 2\nbyte \"hello\"\nsubstring 1 4\nbyte \"ell\"\n=="
    )
    .is_approved());
    assert_eq!(
        error_kind("#pragma version 2\nbyte \"hello\"\nsubstring 4 1"),
        ErrorKind::RangeError
    );
    assert_eq!(
        error_kind("#pragma version 2\nbyte \"hello\"\nsubstring 1 6"),
        ErrorKind::RangeError
    );
}

#[test]
fn test_bit_operations() {
    let result = run_source(
        "#pragma version 3\n\
         int 0\n\
         int 3\n\
         int 1\n\
         setbit\n\
         int 8\n\
         ==",
    );
    assert!(result.is_approved());

    assert_eq!(
        error_kind("#pragma version 3\nint 0\nint 64\nint 1\nsetbit"),
        ErrorKind::LengthViolation
    );
    assert_eq!(
        error_kind("#pragma version 3\nint 0\nint 3\nint 2\nsetbit"),
        ErrorKind::RangeError
    );
}

#[test]
fn test_hashes() {
    let result = run_source(
        "byte \"\"\n\
         sha256\n\
         byte 0xe3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\n\
         ==",
    );
    assert!(result.is_approved());
    assert_eq!(result.cost, 10);

    let result = run_source(
        "byte \"\"\n\
         keccak256\n\
         byte 0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470\n\
         ==",
    );
    assert!(result.is_approved());
}

// ============================================================================
// Control Flow
// ============================================================================

#[test]
fn test_return_zero_rejects() {
    let result = run_source("#pragma version 2\nint 7\nint 0\nreturn\nerr");
    assert_eq!(result.halt_reason, HaltReason::Rejected);
    assert_eq!(result.stack, vec![StackValue::Uint(0)]);
}

#[test]
fn test_err_opcode() {
    let result = run_source("int 1\nerr");
    assert!(matches!(
        result.error().unwrap().error,
        RuntimeError::TealError { line: 2 }
    ));
}

#[test]
fn test_assert_failure() {
    assert_eq!(error_kind("#pragma version 3\nint 0\nassert\nint 1"), ErrorKind::Rejected);
}

#[test]
fn test_branches_skip_err() {
    let result = run_source(
        "#pragma version 2\n\
         int 1\n\
         bnz ok\n\
         err\n\
         ok:\n\
         int 0\n\
         bz done\n\
         err\n\
         done:\n\
         int 1",
    );
    assert!(result.is_approved());
}

#[test]
fn test_scratch_space() {
    let result = run_source("int 41\nstore 5\nload 5\nint 1\n+\nload 200\n+");
    assert_eq!(result.stack, vec![StackValue::Uint(42)]);
}

#[test]
fn test_stack_manipulation() {
    let result = run_source(
        "#pragma version 5\n\
         int 1\n\
         int 2\n\
         int 3\n\
         cover 2\n\
         uncover 1\n\
         dig 2\n\
         select\n\
         swap\n\
         pop",
    );
    // cover 2 -> 3 1 2; uncover 1 -> 3 2 1; dig 2 -> 3 2 1 3; select -> 3 1
    assert_eq!(result.stack, vec![StackValue::Uint(1)]);
}

#[test]
fn test_constant_blocks() {
    let result = run_source(
        "intcblock 10 20\n\
         bytecblock 0x01 \"two\"\n\
         intc_1\n\
         intc 0\n\
         -\n\
         bytec_1\n\
         len\n\
         +",
    );
    assert_eq!(result.stack, vec![StackValue::Uint(13)]);
}

#[test]
fn test_arguments() {
    let result = run_with_args(
        "arg_0\nbtoi\narg 1\nlen\n+",
        vec![vec![0, 5], b"abc".to_vec()],
    );
    assert_eq!(result.stack, vec![StackValue::Uint(8)]);

    let result = run_with_args("arg_2", vec![]);
    assert_eq!(result.error().unwrap().kind, ErrorKind::LengthViolation);
}

#[test]
fn test_stack_underflow() {
    let result = run_source("int 1\n+");
    let diag = result.error().unwrap();
    assert_eq!(diag.kind, ErrorKind::StackUnderflow);
    assert_eq!(result.stack, vec![StackValue::Uint(1)]);
}

proptest! {
    #[test]
    fn prop_addition_matches_checked_add(a in any::<u64>(), b in any::<u64>()) {
        let result = run_source(&format!("int {}\nint {}\n+\npop\nint 1", a, b));
        match a.checked_add(b) {
            Some(_) => prop_assert!(result.is_approved()),
            None => prop_assert_eq!(result.error().map(|d| d.kind), Some(ErrorKind::NumericOverflow)),
        }
    }

    #[test]
    fn prop_division_by_nonzero(a in any::<u64>(), b in 1..=u64::MAX) {
        let result = run_source(&format!("int {}\nint {}\n/\nint {}\n==", a, b, a / b));
        prop_assert!(result.is_approved());
    }
}
