//! Interpreter state for one TEAL run

use crate::error::Diagnostic;
use crate::stack::Stack;
use crate::txn::Transaction;
use serde::Serialize;
use teal_spec::{StackValue, SCRATCH_SIZE};

/// Mutable state threaded through opcode execution
#[derive(Debug, Clone)]
pub struct ExecutionState {
    /// Operand stack
    pub stack: Stack,

    /// Scratch slots, initially uint 0
    pub scratch: Vec<StackValue>,

    /// Index of the instruction being executed
    pub pc: usize,

    /// Cost charged so far
    pub cost: u64,

    /// Return addresses of active `callsub`s
    pub call_stack: Vec<usize>,

    /// Constant blocks loaded by `intcblock`/`bytecblock`
    pub int_constants: Vec<u64>,
    pub byte_constants: Vec<Vec<u8>>,

    /// Output of `log`
    pub logs: Vec<Vec<u8>>,

    /// Inner transaction under construction (`itxn_begin` .. `itxn_submit`)
    pub pending_inner: Option<Transaction>,

    /// Executed inner transactions, in submission order
    pub inner_transactions: Vec<Transaction>,
}

impl ExecutionState {
    pub fn new(max_stack_depth: usize) -> Self {
        Self {
            stack: Stack::with_max_depth(max_stack_depth),
            scratch: vec![StackValue::ZERO; SCRATCH_SIZE],
            pc: 0,
            cost: 0,
            call_stack: Vec::new(),
            int_constants: Vec::new(),
            byte_constants: Vec::new(),
            logs: Vec::new(),
            pending_inner: None,
            inner_transactions: Vec::new(),
        }
    }

    /// Total bytes logged so far
    pub fn log_size(&self) -> usize {
        self.logs.iter().map(Vec::len).sum()
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HaltReason {
    /// Program accepted the transaction
    Approved,
    /// Program completed and rejected the transaction
    Rejected,
    /// Execution failed
    Errored(Diagnostic),
}

impl HaltReason {
    pub fn is_approved(&self) -> bool {
        matches!(self, HaltReason::Approved)
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            HaltReason::Errored(diag) => Some(diag),
            _ => None,
        }
    }
}
