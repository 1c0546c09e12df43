//! Instruction dispatch
//!
//! [`execute`] runs one decoded instruction against the execution state.
//! Constants, scratch space, control flow and stack shuffling are handled
//! here; arithmetic, byte and ledger opcodes are delegated to their own
//! modules.
//!
//! Every opcode reads its operands first, validates them, and only then
//! mutates the stack, so a failing instruction leaves the state as it was.

use crate::error::{Result, RuntimeError};
use crate::guard;
use crate::ledger::Ledger;
use crate::state::ExecutionState;
use crate::{arith, bytes, ledger_ops};
use teal_spec::{ExecutionMode, Instruction, Opcode, Program, MAX_CALL_DEPTH};

/// What the interpreter does after an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Continue with the following instruction
    Next,
    /// Continue at an instruction index
    Jump(usize),
    /// Stop with a verdict
    Halt { approved: bool },
}

/// Everything an opcode may touch
pub struct Context<'a, L: Ledger> {
    pub state: &'a mut ExecutionState,
    pub ledger: &'a mut L,
    pub program: &'a Program,
    pub mode: ExecutionMode,
    /// Logic signature arguments (`arg N`)
    pub args: &'a [Vec<u8>],
}

/// Attach a line to a malformed-immediate error
pub(crate) fn immediate<T>(result: teal_spec::error::Result<T>, line: usize) -> Result<T> {
    result.map_err(|e| RuntimeError::program(line, e))
}

fn branch_target(program: &Program, instr: &Instruction) -> Result<usize> {
    let line = instr.line;
    let label = immediate(instr.label(0), line)?;
    program
        .label_target(label)
        .ok_or_else(|| RuntimeError::UnknownLabel {
            label: label.to_string(),
            line,
        })
}

fn int_constant(state: &mut ExecutionState, index: u64, line: usize) -> Result<()> {
    let i = guard::check_index_bound(index, &state.int_constants, line)?;
    let value = state.int_constants[i];
    state.stack.push(value);
    Ok(())
}

fn byte_constant(state: &mut ExecutionState, index: u64, line: usize) -> Result<()> {
    let i = guard::check_index_bound(index, &state.byte_constants, line)?;
    let value = state.byte_constants[i].clone();
    state.stack.push(value);
    Ok(())
}

fn argument(state: &mut ExecutionState, args: &[Vec<u8>], index: u64, line: usize) -> Result<()> {
    let i = guard::check_index_bound(index, args, line)?;
    state.stack.push(args[i].clone());
    Ok(())
}

/// Execute one instruction
pub fn execute<L: Ledger>(ctx: &mut Context<'_, L>, instr: &Instruction) -> Result<Step> {
    let line = instr.line;
    let state = &mut *ctx.state;

    match instr.opcode {
        Opcode::Err => return Err(RuntimeError::TealError { line }),

        // ========== Constants ==========
        Opcode::Int | Opcode::PushInt => {
            let value = immediate(instr.uint(0), line)?;
            state.stack.push(value);
        }
        Opcode::Byte | Opcode::PushBytes => {
            let value = immediate(instr.bytes(0), line)?.to_vec();
            state.stack.push(value);
        }
        Opcode::Intcblock => {
            let values = immediate(instr.uint_list(), line)?;
            guard::assert_arr_length(&values, line)?;
            state.int_constants = values;
        }
        Opcode::Bytecblock => {
            let values = immediate(instr.bytes_list(), line)?;
            guard::assert_arr_length(&values, line)?;
            state.byte_constants = values;
        }
        Opcode::Intc => int_constant(state, immediate(instr.uint(0), line)?, line)?,
        Opcode::Intc0 => int_constant(state, 0, line)?,
        Opcode::Intc1 => int_constant(state, 1, line)?,
        Opcode::Intc2 => int_constant(state, 2, line)?,
        Opcode::Intc3 => int_constant(state, 3, line)?,
        Opcode::Bytec => byte_constant(state, immediate(instr.uint(0), line)?, line)?,
        Opcode::Bytec0 => byte_constant(state, 0, line)?,
        Opcode::Bytec1 => byte_constant(state, 1, line)?,
        Opcode::Bytec2 => byte_constant(state, 2, line)?,
        Opcode::Bytec3 => byte_constant(state, 3, line)?,
        Opcode::Arg => argument(state, ctx.args, immediate(instr.uint(0), line)?, line)?,
        Opcode::Arg0 => argument(state, ctx.args, 0, line)?,
        Opcode::Arg1 => argument(state, ctx.args, 1, line)?,
        Opcode::Arg2 => argument(state, ctx.args, 2, line)?,
        Opcode::Arg3 => argument(state, ctx.args, 3, line)?,

        // ========== Scratch Space ==========
        Opcode::Load => {
            let i = guard::check_index_bound(immediate(instr.uint(0), line)?, &state.scratch, line)?;
            let value = state.scratch[i].clone();
            state.stack.push(value);
        }
        Opcode::Store => {
            let i = guard::check_index_bound(immediate(instr.uint(0), line)?, &state.scratch, line)?;
            let value = state.stack.pop(line)?;
            state.scratch[i] = value;
        }

        // ========== Control Flow ==========
        Opcode::Bnz | Opcode::Bz => {
            let target = branch_target(ctx.program, instr)?;
            let args = state.stack.top_n(1, line)?;
            let cond = guard::assert_uint64(&args[0], line)?;
            state.stack.discard(1);
            let taken = (cond != 0) == (instr.opcode == Opcode::Bnz);
            if taken {
                return Ok(Step::Jump(target));
            }
        }
        Opcode::B => return Ok(Step::Jump(branch_target(ctx.program, instr)?)),
        Opcode::Return => {
            let args = state.stack.top_n(1, line)?;
            let verdict = guard::assert_uint64(&args[0], line)?;
            state.stack.keep_top();
            return Ok(Step::Halt {
                approved: verdict != 0,
            });
        }
        Opcode::Assert => {
            let args = state.stack.top_n(1, line)?;
            if guard::assert_uint64(&args[0], line)? == 0 {
                return Err(RuntimeError::AssertionFailed { line });
            }
            state.stack.discard(1);
        }
        Opcode::Callsub => {
            let target = branch_target(ctx.program, instr)?;
            if state.call_stack.len() >= MAX_CALL_DEPTH {
                return Err(RuntimeError::CallDepthExceeded {
                    max: MAX_CALL_DEPTH,
                    line,
                });
            }
            state.call_stack.push(state.pc + 1);
            return Ok(Step::Jump(target));
        }
        Opcode::Retsub => {
            let ret = state
                .call_stack
                .pop()
                .ok_or_else(|| RuntimeError::InvalidProgram {
                    reason: "retsub with empty call stack".to_string(),
                    line,
                })?;
            return Ok(Step::Jump(ret));
        }

        // ========== Stack Manipulation ==========
        Opcode::Pop => {
            state.stack.pop(line)?;
        }
        Opcode::Dup => {
            let top = state.stack.top_n(1, line)?[0].clone();
            state.stack.push(top);
        }
        Opcode::Dup2 => {
            let pair = state.stack.top_n(2, line)?.to_vec();
            state.stack.replace_top(0, pair);
        }
        Opcode::Dig => {
            let depth = immediate(instr.uint(0), line)?;
            let n = usize::try_from(depth)
                .ok()
                .and_then(|d| d.checked_add(1))
                .unwrap_or(usize::MAX);
            let value = state.stack.top_n(n, line)?[0].clone();
            state.stack.push(value);
        }
        Opcode::Swap => {
            let args = state.stack.top_n(2, line)?;
            let swapped = [args[1].clone(), args[0].clone()];
            state.stack.replace_top(2, swapped);
        }
        Opcode::Select => {
            // A B C: C != 0 ? B : A
            let args = state.stack.top_n(3, line)?;
            let cond = guard::assert_uint64(&args[2], line)?;
            let chosen = if cond != 0 {
                args[1].clone()
            } else {
                args[0].clone()
            };
            state.stack.replace_top(3, [chosen]);
        }
        Opcode::Cover => {
            let n = immediate(instr.uint(0), line)?;
            state.stack.cover(depth(n), line)?;
        }
        Opcode::Uncover => {
            let n = immediate(instr.uint(0), line)?;
            state.stack.uncover(depth(n), line)?;
        }

        // ========== Arithmetic ==========
        Opcode::Add
        | Opcode::Sub
        | Opcode::Mul
        | Opcode::Div
        | Opcode::Mod
        | Opcode::Lt
        | Opcode::Gt
        | Opcode::Le
        | Opcode::Ge
        | Opcode::And
        | Opcode::Or
        | Opcode::Not
        | Opcode::Eq
        | Opcode::Neq
        | Opcode::BitOr
        | Opcode::BitAnd
        | Opcode::BitXor
        | Opcode::BitNot
        | Opcode::Mulw
        | Opcode::Addw
        | Opcode::Divmodw
        | Opcode::Shl
        | Opcode::Shr
        | Opcode::Sqrt
        | Opcode::Bitlen
        | Opcode::Exp
        | Opcode::Expw => arith::execute(instr.opcode, &mut state.stack, line)?,

        // ========== Byte Strings ==========
        Opcode::Sha256
        | Opcode::Keccak256
        | Opcode::Sha512_256
        | Opcode::Len
        | Opcode::Itob
        | Opcode::Btoi
        | Opcode::Concat
        | Opcode::Substring
        | Opcode::Substring3
        | Opcode::Getbit
        | Opcode::Setbit
        | Opcode::Getbyte
        | Opcode::Setbyte
        | Opcode::Extract
        | Opcode::Extract3
        | Opcode::ExtractUint16
        | Opcode::ExtractUint32
        | Opcode::ExtractUint64 => bytes::execute(instr, &mut state.stack)?,

        // ========== Ledger ==========
        Opcode::Txn
        | Opcode::Global
        | Opcode::Gtxn
        | Opcode::Txna
        | Opcode::Gtxna
        | Opcode::Gtxns
        | Opcode::Gtxnsa
        | Opcode::Balance
        | Opcode::MinBalance
        | Opcode::AppOptedIn
        | Opcode::AppLocalGet
        | Opcode::AppLocalGetEx
        | Opcode::AppGlobalGet
        | Opcode::AppGlobalGetEx
        | Opcode::AppLocalPut
        | Opcode::AppGlobalPut
        | Opcode::AppLocalDel
        | Opcode::AppGlobalDel
        | Opcode::Log
        | Opcode::ItxnBegin
        | Opcode::ItxnField
        | Opcode::ItxnSubmit
        | Opcode::Itxn
        | Opcode::Itxna => ledger_ops::execute(ctx, instr)?,
    }

    Ok(Step::Next)
}

/// Stack depth immediate, saturated so oversized values fail the depth
/// check instead of wrapping
fn depth(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}
