//! # TEAL Runtime
//!
//! Execute TEAL v1-v5 programs against a simulated Algorand ledger.
//!
//! The interpreter is a guarded stack machine: every opcode reads its
//! operands, validates them through the [`guard`] layer, and only then
//! mutates the stack, scratch space, or ledger.
//!
//! ## Features
//!
//! - **Two value types**: `uint64` and `byte[]`, never coerced
//! - **Signature and application modes**: with per-mode cost budgets
//! - **Overflow checks**: arbitrary-precision intermediates, 64/128-bit ceilings
//! - **Ledger abstraction**: [`Ledger`] trait with an in-memory implementation
//! - **Inner transactions and logs**: TEAL v5 application features
//! - **Structured diagnostics**: error kind, line, opcode, expected/actual
//!
//! ## Example
//!
//! ```rust,no_run
//! use teal_runtime::{InMemoryLedger, Interpreter, InterpreterConfig};
//! use teal_spec::Program;
//!
//! let program = Program::new(5);
//! let mut ledger = InMemoryLedger::new();
//! let result = Interpreter::new(&program, &mut ledger, InterpreterConfig::default()).run();
//! println!("Approved: {} (cost {})", result.is_approved(), result.cost);
//! ```

pub mod error;
pub mod guard;
pub mod stack;
pub mod txn;
pub mod ledger;
pub mod state;
pub mod arith;
pub mod bytes;
pub mod execute;
pub mod ledger_ops;
pub mod interpreter;

pub use error::{Diagnostic, ErrorKind, LedgerError, RuntimeError};
pub use guard::UintWidth;
pub use stack::Stack;
pub use txn::{application_address, Address, OnCompletion, Transaction, TxnType};
pub use ledger::{InMemoryLedger, Ledger, StateSchema};
pub use state::{ExecutionState, HaltReason};
pub use interpreter::{ExecutionResult, Interpreter, InterpreterConfig};

/// Simple execution helper
///
/// Runs a program in signature mode against an empty ledger and returns
/// the final stack of an approved run.
pub fn run(program: &teal_spec::Program) -> Result<Vec<teal_spec::StackValue>, RuntimeError> {
    let mut ledger = InMemoryLedger::new();
    Interpreter::new(program, &mut ledger, InterpreterConfig::signature())
        .run()
        .into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use teal_spec::{Immediate, Instruction, Opcode, Program, StackValue};

    #[test]
    fn test_public_exports() {
        let _ = InterpreterConfig::default();
        let _ = Stack::new();
        let _ = HaltReason::Approved;
        let _ = UintWidth::U128;
        let _ = InMemoryLedger::new();
    }

    #[test]
    fn test_run_helper() {
        let program = Program::with_instructions(
            1,
            vec![
                Instruction::new(Opcode::Int, vec![Immediate::Uint(2)], 1),
                Instruction::new(Opcode::Int, vec![Immediate::Uint(3)], 2),
                Instruction::simple(Opcode::Mul, 3),
            ],
        );
        assert_eq!(run(&program).unwrap(), vec![StackValue::Uint(6)]);
    }

    #[test]
    fn test_run_helper_error() {
        let program = Program::with_instructions(1, vec![Instruction::simple(Opcode::Err, 1)]);
        let err = run(&program).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
    }

    #[test]
    fn test_runtime_error_reexport() {
        let err = RuntimeError::TealError { line: 2 };
        assert_eq!(err.to_string(), "TEAL program failed with err at line 2");
    }
}
