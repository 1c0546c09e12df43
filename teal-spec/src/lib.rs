//! # TEAL Specification
//!
//! Core types for a TEAL stack-machine interpreter: stack values, opcodes,
//! decoded instructions, programs, and the version-indexed field schemas
//! that opcode operands are validated against.
//!
//! ## Key Features
//! - Two-variant value model: `uint64` or `byte[]`, no coercion
//! - TEAL versions 1 through 5
//! - Per-version transaction, global and inner-transaction field tables
//! - Opcode metadata: minimum version, cost, execution mode, immediates

pub mod value;
pub mod opcode;
pub mod instruction;
pub mod field;
pub mod program;
pub mod error;

pub use value::{StackValue, StackType};
pub use opcode::{ExecutionMode, ImmediateLayout, Opcode, OpcodeMode};
pub use instruction::{Immediate, Instruction};
pub use field::{schema, FieldSchema, GlobalField, TxnField};
pub use program::Program;
pub use error::SpecError;

/// Highest supported TEAL version
pub const MAX_VERSION: u64 = 5;

/// Numeric bounds
pub const MIN_UINT64: u64 = 0;
pub const MAX_UINT64: u64 = u64::MAX;
pub const MAX_UINT128: u128 = u128::MAX;
pub const MIN_UINT8: u64 = 0;
pub const MAX_UINT8: u64 = 255;
/// Highest bit index of a 64-bit integer
pub const MAX_UINT6: u64 = 63;

/// Maximum length of a byte string on the stack
pub const MAX_STRING_SIZE: usize = 4096;

/// Maximum operand stack depth
pub const MAX_STACK_DEPTH: usize = 1000;

/// Maximum number of entries in an `intcblock`/`bytecblock`
pub const MAX_CONSTANT_BLOCK: usize = 256;

/// Scratch space slots
pub const SCRATCH_SIZE: usize = 256;

/// Maximum subroutine call depth
pub const MAX_CALL_DEPTH: usize = 8;

/// Log limits per application call
pub const MAX_LOG_CALLS: usize = 32;
pub const MAX_LOG_SIZE: usize = 1024;

/// Inner transactions per application call
pub const MAX_INNER_TRANSACTIONS: usize = 16;

/// Default cost budgets
pub const SIGNATURE_COST_BUDGET: u64 = 20_000;
pub const APPLICATION_COST_BUDGET: u64 = 700;

/// Length of an account address
pub const ADDRESS_LENGTH: usize = 32;
