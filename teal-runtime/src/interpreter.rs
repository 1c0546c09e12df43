//! TEAL interpreter

use crate::error::{Diagnostic, Result, RuntimeError};
use crate::execute::{execute, Context, Step};
use crate::guard;
use crate::ledger::Ledger;
use crate::state::{ExecutionState, HaltReason};
use crate::txn::Transaction;
use serde::Serialize;
use teal_spec::{
    ExecutionMode, Opcode, Program, StackValue, APPLICATION_COST_BUDGET, MAX_STACK_DEPTH,
    MAX_VERSION, SIGNATURE_COST_BUDGET,
};

/// Interpreter configuration
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Signature (stateless) or application (stateful) execution
    pub mode: ExecutionMode,

    /// Cost budget override; `None` uses the default for `mode`
    pub max_cost: Option<u64>,

    /// Emit a `tracing` event for every executed instruction
    pub trace: bool,

    /// Operand stack depth limit
    pub max_stack_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Application,
            max_cost: None,
            trace: false,
            max_stack_depth: MAX_STACK_DEPTH,
        }
    }
}

impl InterpreterConfig {
    pub fn signature() -> Self {
        Self::default().with_mode(ExecutionMode::Signature)
    }

    pub fn application() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_cost(mut self, max_cost: u64) -> Self {
        self.max_cost = Some(max_cost);
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_max_stack_depth(mut self, max_stack_depth: usize) -> Self {
        self.max_stack_depth = max_stack_depth;
        self
    }

    /// Effective cost budget
    pub fn cost_budget(&self) -> u64 {
        self.max_cost.unwrap_or(match self.mode {
            ExecutionMode::Signature => SIGNATURE_COST_BUDGET,
            ExecutionMode::Application => APPLICATION_COST_BUDGET,
        })
    }
}

/// Execution result
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// How the run ended
    pub halt_reason: HaltReason,

    /// Operand stack at halt
    pub stack: Vec<StackValue>,

    /// Total cost charged
    pub cost: u64,

    /// `log` output, in order
    pub logs: Vec<Vec<u8>>,

    /// Inner transactions submitted by the program
    pub inner_transactions: Vec<Transaction>,

    /// Source line of the last executed instruction
    pub line: usize,
}

impl ExecutionResult {
    pub fn is_approved(&self) -> bool {
        self.halt_reason.is_approved()
    }

    /// Diagnostic of an errored run
    pub fn error(&self) -> Option<&Diagnostic> {
        self.halt_reason.diagnostic()
    }

    /// Final stack of an approved run; a rejection becomes
    /// [`RuntimeError::RejectedByLogic`]
    pub fn into_result(self) -> Result<Vec<StackValue>> {
        match self.halt_reason {
            HaltReason::Approved => Ok(self.stack),
            HaltReason::Rejected => Err(RuntimeError::RejectedByLogic { line: self.line }),
            HaltReason::Errored(diagnostic) => Err(diagnostic.error),
        }
    }
}

/// TEAL interpreter bound to one program and one ledger for a single run
pub struct Interpreter<'a, L: Ledger> {
    program: &'a Program,
    ledger: &'a mut L,
    config: InterpreterConfig,

    /// Logic signature arguments
    args: Vec<Vec<u8>>,

    state: ExecutionState,

    /// Opcode being executed, for diagnostics
    current: Option<Opcode>,

    /// Line of the last instruction started
    line: usize,
}

impl<'a, L: Ledger> Interpreter<'a, L> {
    pub fn new(program: &'a Program, ledger: &'a mut L, config: InterpreterConfig) -> Self {
        let state = ExecutionState::new(config.max_stack_depth);
        Self {
            program,
            ledger,
            config,
            args: Vec::new(),
            state,
            current: None,
            line: 0,
        }
    }

    /// Set the arguments read by `arg N`
    pub fn with_args(mut self, args: Vec<Vec<u8>>) -> Self {
        self.args = args;
        self
    }

    /// Run the program to completion
    pub fn run(mut self) -> ExecutionResult {
        tracing::debug!(
            version = self.program.version,
            mode = %self.config.mode,
            instructions = self.program.len(),
            budget = self.config.cost_budget(),
            "starting TEAL run"
        );

        self.ledger.checkpoint();
        let halt_reason = match self.execute_all() {
            Ok(true) => HaltReason::Approved,
            Ok(false) => HaltReason::Rejected,
            Err(err) => {
                let diagnostic = Diagnostic::new(self.current, err);
                tracing::warn!(%diagnostic, "TEAL run errored");
                HaltReason::Errored(diagnostic)
            }
        };
        if halt_reason.is_approved() {
            self.ledger.commit();
        } else {
            tracing::debug!("rolling back ledger writes");
            self.ledger.rollback();
        }

        tracing::debug!(
            outcome = ?halt_reason,
            cost = self.state.cost,
            depth = self.state.stack.len(),
            "TEAL run finished"
        );

        ExecutionResult {
            halt_reason,
            stack: self.state.stack.into_vec(),
            cost: self.state.cost,
            logs: self.state.logs,
            inner_transactions: self.state.inner_transactions,
            line: self.line,
        }
    }

    /// Step until a halt, returning the verdict
    fn execute_all(&mut self) -> Result<bool> {
        let program = self.program;
        let version = program.version;
        if version == 0 || version > MAX_VERSION {
            return Err(RuntimeError::InvalidProgram {
                reason: format!("unsupported TEAL version {} (supported: 1-{})", version, MAX_VERSION),
                line: 0,
            });
        }
        let budget = self.config.cost_budget();

        loop {
            let Some(instr) = program.instructions.get(self.state.pc) else {
                self.current = None;
                return self.final_verdict();
            };
            let line = instr.line;
            self.current = Some(instr.opcode);
            self.line = line;

            let required = instr.opcode.min_version();
            if required > version {
                return Err(RuntimeError::OpcodeNotAvailable {
                    opcode: instr.opcode,
                    required,
                    version,
                    line,
                });
            }
            if !instr.opcode.mode().allows(self.config.mode) {
                return Err(RuntimeError::InvalidMode {
                    opcode: instr.opcode,
                    mode: self.config.mode,
                    line,
                });
            }

            self.state
                .stack
                .assert_room(instr.opcode.stack_growth(), line)?;

            self.state.cost = self.state.cost.saturating_add(instr.opcode.cost(version));
            if self.state.cost > budget {
                return Err(RuntimeError::CostLimitExceeded {
                    cost: self.state.cost,
                    budget,
                    line,
                });
            }

            if self.config.trace {
                tracing::trace!(
                    pc = self.state.pc,
                    line,
                    depth = self.state.stack.len(),
                    "{}",
                    teal_disassembler::format_instruction(instr)
                );
            }

            let step = {
                let mut ctx = Context {
                    state: &mut self.state,
                    ledger: &mut *self.ledger,
                    program,
                    mode: self.config.mode,
                    args: &self.args,
                };
                execute(&mut ctx, instr)?
            };

            match step {
                Step::Next => self.state.pc += 1,
                Step::Jump(target) => self.state.pc = target,
                Step::Halt { approved } => return Ok(approved),
            }
        }
    }

    /// Verdict when execution runs past the last instruction
    fn final_verdict(&self) -> Result<bool> {
        let depth = self.state.stack.len();
        if depth != 1 {
            return Err(RuntimeError::InvalidFinalStack {
                depth,
                line: self.line,
            });
        }
        let top = self.state.stack.top_n(1, self.line)?;
        Ok(guard::assert_uint64(&top[0], self.line)? != 0)
    }

    /// Current state (for debugging)
    pub fn state(&self) -> &ExecutionState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ledger::InMemoryLedger;
    use teal_spec::{Immediate, Instruction};

    fn program(version: u64, ops: Vec<Instruction>) -> Program {
        Program::with_instructions(version, ops)
    }

    fn int(v: u64, line: usize) -> Instruction {
        Instruction::new(Opcode::Int, vec![Immediate::Uint(v)], line)
    }

    fn op(opcode: Opcode, line: usize) -> Instruction {
        Instruction::simple(opcode, line)
    }

    fn run(program: &Program, config: InterpreterConfig) -> ExecutionResult {
        let mut ledger = InMemoryLedger::new();
        Interpreter::new(program, &mut ledger, config).run()
    }

    #[test]
    fn test_config_defaults() {
        let config = InterpreterConfig::default();
        assert_eq!(config.mode, ExecutionMode::Application);
        assert_eq!(config.cost_budget(), 700);
        assert_eq!(InterpreterConfig::signature().cost_budget(), 20_000);
        assert_eq!(config.with_max_cost(5).cost_budget(), 5);
        assert!(!InterpreterConfig::default().trace);
    }

    #[test]
    fn test_division() {
        let p = program(2, vec![int(5, 1), int(3, 2), op(Opcode::Div, 3)]);
        let result = run(&p, InterpreterConfig::signature());
        assert!(result.is_approved());
        assert_eq!(result.stack, vec![StackValue::Uint(1)]);
        assert_eq!(result.cost, 3);
    }

    #[test]
    fn test_division_by_zero_diagnostic() {
        let p = program(2, vec![int(5, 1), int(0, 2), op(Opcode::Div, 3)]);
        let result = run(&p, InterpreterConfig::signature());
        let diag = result.error().unwrap();
        assert_eq!(diag.kind, ErrorKind::NumericUnderflow);
        assert_eq!(diag.line, 3);
        assert_eq!(diag.opcode, "/");
        // operands stay on the stack
        assert_eq!(result.stack, vec![StackValue::Uint(5), StackValue::Uint(0)]);
    }

    #[test]
    fn test_zero_result_rejects() {
        let p = program(1, vec![int(0, 1)]);
        let result = run(&p, InterpreterConfig::signature());
        assert_eq!(result.halt_reason, HaltReason::Rejected);
        assert!(matches!(
            result.into_result(),
            Err(RuntimeError::RejectedByLogic { line: 1 })
        ));
    }

    #[test]
    fn test_final_stack_shape() {
        let p = program(1, vec![int(1, 1), int(1, 2)]);
        let diag = run(&p, InterpreterConfig::signature()).error().cloned().unwrap();
        assert!(matches!(diag.error, RuntimeError::InvalidFinalStack { depth: 2, .. }));
        assert_eq!(diag.opcode, "");

        let bytes = Instruction::new(Opcode::Byte, vec![Immediate::Bytes(b"a".to_vec())], 1);
        let diag = run(&program(1, vec![bytes]), InterpreterConfig::signature())
            .error()
            .cloned()
            .unwrap();
        assert_eq!(diag.kind, ErrorKind::TypeMismatch);

        let diag = run(&program(1, vec![]), InterpreterConfig::signature())
            .error()
            .cloned()
            .unwrap();
        assert!(matches!(diag.error, RuntimeError::InvalidFinalStack { depth: 0, .. }));
    }

    #[test]
    fn test_version_gate() {
        let p = program(1, vec![int(1, 1), op(Opcode::Dup, 2), op(Opcode::Concat, 3)]);
        let diag = run(&p, InterpreterConfig::signature()).error().cloned().unwrap();
        assert!(matches!(
            diag.error,
            RuntimeError::OpcodeNotAvailable {
                required: 2,
                version: 1,
                line: 3,
                ..
            }
        ));

        let diag = run(&program(9, vec![int(1, 1)]), InterpreterConfig::signature())
            .error()
            .cloned()
            .unwrap();
        assert_eq!(diag.kind, ErrorKind::InvalidProgram);
    }

    #[test]
    fn test_mode_gate() {
        let p = program(2, vec![op(Opcode::Arg0, 1)]);
        let diag = run(&p, InterpreterConfig::application()).error().cloned().unwrap();
        assert!(matches!(diag.error, RuntimeError::InvalidMode { .. }));
    }

    #[test]
    fn test_cost_budget() {
        let p = program(
            2,
            vec![
                Instruction::new(Opcode::Byte, vec![Immediate::Bytes(vec![1])], 1),
                op(Opcode::Sha256, 2),
                op(Opcode::Len, 3),
            ],
        );
        // byte (1) + sha256 at v2 (35) + len (1)
        let result = run(&p, InterpreterConfig::signature().with_max_cost(37));
        assert!(result.is_approved());
        assert_eq!(result.cost, 37);

        let result = run(&p, InterpreterConfig::signature().with_max_cost(35));
        let diag = result.error().unwrap();
        assert_eq!(diag.kind, ErrorKind::ExecutionLimit);
        assert_eq!(diag.line, 2);
    }

    #[test]
    fn test_stack_depth_limit() {
        let p = program(1, vec![int(1, 1), int(1, 2), int(1, 3), op(Opcode::Pop, 4)]);
        let result = run(&p, InterpreterConfig::signature().with_max_stack_depth(2));
        assert!(matches!(
            result.error().map(|d| &d.error),
            Some(RuntimeError::StackOverflow { max: 2, line: 3 })
        ));
        // the failing push never lands
        assert_eq!(result.stack, vec![StackValue::Uint(1), StackValue::Uint(1)]);
        assert_eq!(result.cost, 2);

        // dup2 needs room for two values
        let p = program(2, vec![int(1, 1), int(1, 2), op(Opcode::Dup2, 3)]);
        let result = run(&p, InterpreterConfig::signature().with_max_stack_depth(3));
        assert_eq!(result.error().map(|d| d.line), Some(3));
        assert_eq!(result.stack.len(), 2);
    }

    #[test]
    fn test_args() {
        let p = program(1, vec![op(Opcode::Arg0, 1), op(Opcode::Len, 2)]);
        let mut ledger = InMemoryLedger::new();
        let result = Interpreter::new(&p, &mut ledger, InterpreterConfig::signature())
            .with_args(vec![b"xyz".to_vec()])
            .run();
        assert_eq!(result.into_result().unwrap(), vec![StackValue::Uint(3)]);
    }
}
