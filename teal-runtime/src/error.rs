//! Runtime error types for the TEAL interpreter
//!
//! Every error raised while executing an instruction carries the source
//! line of that instruction. [`RuntimeError::kind`] classifies errors into
//! the interpreter's error taxonomy.

use serde::Serialize;
use std::fmt;
use teal_spec::{ExecutionMode, Opcode, SpecError, TxnField};
use thiserror::Error;

/// Error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Not enough operands on the stack
    StackUnderflow,
    /// Result above the unsigned ceiling of its width
    NumericOverflow,
    /// Result below zero, or an undefined arithmetic result (division by zero)
    NumericUnderflow,
    /// Operand tag does not match the opcode's expectation
    TypeMismatch,
    /// Byte string or array length, or an index, outside the allowed bound
    LengthViolation,
    /// Field name not present in the schema for the program version
    UnknownField,
    /// Array field or opcode argument not valid for the program version
    InvalidOpArg,
    /// Slicing or extraction bounds invalid
    RangeError,
    /// Program failed explicitly (`err`, failed `assert`) or by result
    Rejected,
    /// Malformed program: version, mode, label or final-stack violations
    InvalidProgram,
    /// Cost budget or log limits exhausted
    ExecutionLimit,
    /// Ledger adapter refused the operation
    Ledger,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Failures reported by a ledger adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Account {0} not found")]
    AccountNotFound(String),

    #[error("Account {0} is not available to this transaction")]
    AccountNotAvailable(String),

    #[error("Application {0} not found")]
    ApplicationNotFound(u64),

    #[error("Account {address} has not opted in to application {app_id}")]
    NotOptedIn { address: String, app_id: u64 },

    #[error("Transaction {0} not found in group")]
    TransactionNotFound(usize),

    #[error("Field {0} is not available")]
    FieldUnavailable(TxnField),

    #[error("State schema exceeded for application {app_id}: {reason}")]
    SchemaExceeded { app_id: u64, reason: String },

    #[error("State key of {len} bytes exceeds {max}")]
    KeyTooLong { len: usize, max: usize },

    #[error("State key and value of {len} bytes exceed {max}")]
    ValueTooLong { len: usize, max: usize },

    #[error("Insufficient balance in {address}: needs {required}, has {available}")]
    InsufficientBalance {
        address: String,
        required: u64,
        available: u64,
    },

    #[error("Invalid inner transaction: {0}")]
    InvalidInnerTransaction(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("Stack underflow at line {line}: needs {expected} values, found {actual}")]
    StackUnderflow {
        expected: usize,
        actual: usize,
        line: usize,
    },

    #[error("Stack overflow at line {line}: depth exceeds {max}")]
    StackOverflow { max: usize, line: usize },

    #[error("Result exceeds uint64 at line {line}")]
    Uint64Overflow { line: usize },

    #[error("Result exceeds uint128 at line {line}")]
    Uint128Overflow { line: usize },

    #[error("Result below zero at line {line}")]
    Uint64Underflow { line: usize },

    #[error("Division by zero at line {line}")]
    DivisionByZero { line: usize },

    #[error("0 ** 0 is undefined at line {line}")]
    ZeroToThePowerOfZero { line: usize },

    #[error("Type mismatch at line {line}: expected {expected}, got {actual}")]
    InvalidType {
        expected: String,
        actual: String,
        line: usize,
    },

    #[error("Byte string of length {len} exceeds {max} at line {line}")]
    BytesLengthExceeded { len: usize, max: usize, line: usize },

    #[error("Value {value} is not a uint8 at line {line}")]
    InvalidUint8 { value: u64, line: usize },

    #[error("Index {index} out of bound for length {len} at line {line}")]
    IndexOutOfBound { index: u64, len: usize, line: usize },

    #[error("Array length {len} outside 1..=256 at line {line}")]
    ArrayLength { len: usize, line: usize },

    #[error("Bit index {index} beyond 63 at line {line}")]
    SetBitIndex { index: u64, line: usize },

    #[error("Bit index {index} beyond byte string of length {len} at line {line}")]
    SetBitIndexBytes { index: u64, len: usize, line: usize },

    #[error("Bit value {value} must be 0 or 1 at line {line}")]
    SetBitValue { value: u64, line: usize },

    #[error("Substring end {end} before start {start} at line {line}")]
    SubstringEndBeforeStart { start: u64, end: u64, line: usize },

    #[error("Substring range {start}..{end} beyond length {len} at line {line}")]
    SubstringRangeBeyond {
        start: u64,
        end: u64,
        len: usize,
        line: usize,
    },

    #[error("Extract range error at line {line}: {given} beyond length {length}")]
    ExtractRange { given: u64, length: usize, line: usize },

    #[error("Unknown transaction field {field} for TEAL version {version} at line {line}")]
    UnknownTransactionField {
        field: String,
        version: u64,
        line: usize,
    },

    #[error("Unknown global field {field} for TEAL version {version} at line {line}")]
    UnknownGlobalField {
        field: String,
        version: u64,
        line: usize,
    },

    #[error("Invalid argument {arg} for TEAL version {version} at line {line}")]
    InvalidOpArg {
        arg: String,
        version: u64,
        line: usize,
    },

    #[error("Opcode {opcode} requires TEAL version {required}, program is version {version} (line {line})")]
    OpcodeNotAvailable {
        opcode: Opcode,
        required: u64,
        version: u64,
        line: usize,
    },

    #[error("Opcode {opcode} is not allowed in {mode} mode (line {line})")]
    InvalidMode {
        opcode: Opcode,
        mode: ExecutionMode,
        line: usize,
    },

    #[error("Invalid program at line {line}: {reason}")]
    InvalidProgram { reason: String, line: usize },

    #[error("Unknown label {label} at line {line}")]
    UnknownLabel { label: String, line: usize },

    #[error("Stack must finish with exactly one value, found {depth} (line {line})")]
    InvalidFinalStack { depth: usize, line: usize },

    #[error("TEAL program failed with err at line {line}")]
    TealError { line: usize },

    #[error("Assertion failed at line {line}")]
    AssertionFailed { line: usize },

    #[error("TEAL code rejected by logic at line {line}")]
    RejectedByLogic { line: usize },

    #[error("Cost {cost} exceeds budget {budget} at line {line}")]
    CostLimitExceeded { cost: u64, budget: u64, line: usize },

    #[error("Log limit exceeded at line {line}: {reason}")]
    LogLimitExceeded { reason: String, line: usize },

    #[error("Subroutine call depth exceeds {max} at line {line}")]
    CallDepthExceeded { max: usize, line: usize },

    #[error("More than {max} inner transactions at line {line}")]
    InnerTransactionLimit { max: usize, line: usize },

    #[error("Ledger error at line {line}: {source}")]
    Ledger { source: LedgerError, line: usize },
}

impl RuntimeError {
    /// Convert a malformed-instruction error from `teal_spec`
    pub fn program(line: usize, err: SpecError) -> Self {
        match err {
            SpecError::OpcodeNotAvailable {
                opcode,
                required,
                version,
            } => RuntimeError::OpcodeNotAvailable {
                opcode,
                required,
                version,
                line,
            },
            SpecError::UnknownLabel(label) => RuntimeError::UnknownLabel { label, line },
            other => RuntimeError::InvalidProgram {
                reason: other.to_string(),
                line,
            },
        }
    }

    /// Attach a line to a ledger failure
    pub fn ledger(line: usize, source: LedgerError) -> Self {
        RuntimeError::Ledger { source, line }
    }

    /// Classify into the error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::StackUnderflow { .. } => ErrorKind::StackUnderflow,

            RuntimeError::Uint64Overflow { .. } | RuntimeError::Uint128Overflow { .. } => {
                ErrorKind::NumericOverflow
            }

            RuntimeError::Uint64Underflow { .. }
            | RuntimeError::DivisionByZero { .. }
            | RuntimeError::ZeroToThePowerOfZero { .. } => ErrorKind::NumericUnderflow,

            RuntimeError::InvalidType { .. } | RuntimeError::InvalidUint8 { .. } => {
                ErrorKind::TypeMismatch
            }

            RuntimeError::StackOverflow { .. }
            | RuntimeError::BytesLengthExceeded { .. }
            | RuntimeError::IndexOutOfBound { .. }
            | RuntimeError::ArrayLength { .. }
            | RuntimeError::SetBitIndex { .. }
            | RuntimeError::SetBitIndexBytes { .. } => ErrorKind::LengthViolation,

            RuntimeError::UnknownTransactionField { .. }
            | RuntimeError::UnknownGlobalField { .. } => ErrorKind::UnknownField,

            RuntimeError::InvalidOpArg { .. } => ErrorKind::InvalidOpArg,

            RuntimeError::SetBitValue { .. }
            | RuntimeError::SubstringEndBeforeStart { .. }
            | RuntimeError::SubstringRangeBeyond { .. }
            | RuntimeError::ExtractRange { .. } => ErrorKind::RangeError,

            RuntimeError::TealError { .. }
            | RuntimeError::AssertionFailed { .. }
            | RuntimeError::RejectedByLogic { .. } => ErrorKind::Rejected,

            RuntimeError::OpcodeNotAvailable { .. }
            | RuntimeError::InvalidMode { .. }
            | RuntimeError::InvalidProgram { .. }
            | RuntimeError::UnknownLabel { .. }
            | RuntimeError::InvalidFinalStack { .. } => ErrorKind::InvalidProgram,

            RuntimeError::CostLimitExceeded { .. }
            | RuntimeError::LogLimitExceeded { .. }
            | RuntimeError::CallDepthExceeded { .. }
            | RuntimeError::InnerTransactionLimit { .. } => ErrorKind::ExecutionLimit,

            RuntimeError::Ledger { .. } => ErrorKind::Ledger,
        }
    }

    /// Source line the error is attributed to
    pub fn line(&self) -> usize {
        match self {
            RuntimeError::StackUnderflow { line, .. }
            | RuntimeError::StackOverflow { line, .. }
            | RuntimeError::Uint64Overflow { line }
            | RuntimeError::Uint128Overflow { line }
            | RuntimeError::Uint64Underflow { line }
            | RuntimeError::DivisionByZero { line }
            | RuntimeError::ZeroToThePowerOfZero { line }
            | RuntimeError::InvalidType { line, .. }
            | RuntimeError::BytesLengthExceeded { line, .. }
            | RuntimeError::InvalidUint8 { line, .. }
            | RuntimeError::IndexOutOfBound { line, .. }
            | RuntimeError::ArrayLength { line, .. }
            | RuntimeError::SetBitIndex { line, .. }
            | RuntimeError::SetBitIndexBytes { line, .. }
            | RuntimeError::SetBitValue { line, .. }
            | RuntimeError::SubstringEndBeforeStart { line, .. }
            | RuntimeError::SubstringRangeBeyond { line, .. }
            | RuntimeError::ExtractRange { line, .. }
            | RuntimeError::UnknownTransactionField { line, .. }
            | RuntimeError::UnknownGlobalField { line, .. }
            | RuntimeError::InvalidOpArg { line, .. }
            | RuntimeError::OpcodeNotAvailable { line, .. }
            | RuntimeError::InvalidMode { line, .. }
            | RuntimeError::InvalidProgram { line, .. }
            | RuntimeError::UnknownLabel { line, .. }
            | RuntimeError::InvalidFinalStack { line, .. }
            | RuntimeError::TealError { line }
            | RuntimeError::AssertionFailed { line }
            | RuntimeError::RejectedByLogic { line }
            | RuntimeError::CostLimitExceeded { line, .. }
            | RuntimeError::LogLimitExceeded { line, .. }
            | RuntimeError::CallDepthExceeded { line, .. }
            | RuntimeError::InnerTransactionLimit { line, .. }
            | RuntimeError::Ledger { line, .. } => *line,
        }
    }

    /// Expected and actual values, where the error records them
    pub fn expected_actual(&self) -> (Option<String>, Option<String>) {
        match self {
            RuntimeError::StackUnderflow {
                expected, actual, ..
            } => (Some(expected.to_string()), Some(actual.to_string())),
            RuntimeError::InvalidType {
                expected, actual, ..
            } => (Some(expected.clone()), Some(actual.clone())),
            RuntimeError::BytesLengthExceeded { len, max, .. } => {
                (Some(format!("<= {}", max)), Some(len.to_string()))
            }
            RuntimeError::InvalidUint8 { value, .. } => {
                (Some("uint8 {0..255}".to_string()), Some(value.to_string()))
            }
            RuntimeError::IndexOutOfBound { index, len, .. } => {
                (Some(format!("< {}", len)), Some(index.to_string()))
            }
            RuntimeError::ArrayLength { len, .. } => {
                (Some("1..=256".to_string()), Some(len.to_string()))
            }
            RuntimeError::SetBitIndex { index, .. } => {
                (Some("<= 63".to_string()), Some(index.to_string()))
            }
            RuntimeError::SetBitIndexBytes { index, len, .. } => {
                (Some(format!("< {}", len * 8)), Some(index.to_string()))
            }
            RuntimeError::SetBitValue { value, .. } => {
                (Some("0 or 1".to_string()), Some(value.to_string()))
            }
            RuntimeError::SubstringEndBeforeStart { start, end, .. } => {
                (Some(format!(">= {}", start)), Some(end.to_string()))
            }
            RuntimeError::SubstringRangeBeyond { end, len, .. } => {
                (Some(format!("<= {}", len)), Some(end.to_string()))
            }
            RuntimeError::ExtractRange { given, length, .. } => {
                (Some(format!("<= {}", length)), Some(given.to_string()))
            }
            RuntimeError::OpcodeNotAvailable {
                required, version, ..
            } => (Some(format!("version >= {}", required)), Some(version.to_string())),
            RuntimeError::InvalidFinalStack { depth, .. } => {
                (Some("1".to_string()), Some(depth.to_string()))
            }
            RuntimeError::CostLimitExceeded { cost, budget, .. } => {
                (Some(format!("<= {}", budget)), Some(cost.to_string()))
            }
            _ => (None, None),
        }
    }
}

/// Structured report of an errored run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub line: usize,
    /// Mnemonic of the failing opcode (empty when the failure happened
    /// after the last instruction)
    pub opcode: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub message: String,
    #[serde(skip)]
    pub error: RuntimeError,
}

impl Diagnostic {
    pub fn new(opcode: Option<Opcode>, error: RuntimeError) -> Self {
        let (expected, actual) = error.expected_actual();
        Self {
            kind: error.kind(),
            line: error.line(),
            opcode: opcode.map(|op| op.mnemonic().to_string()).unwrap_or_default(),
            expected,
            actual,
            message: error.to_string(),
            error,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] line {}", self.kind, self.line)?;
        if !self.opcode.is_empty() {
            write!(f, " ({})", self.opcode)?;
        }
        write!(f, ": {}", self.message)
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
