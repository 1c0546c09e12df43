//! Opcodes that read transaction and global context, read or write
//! application state, log, or build inner transactions

use crate::error::{LedgerError, Result, RuntimeError};
use crate::execute::{immediate, Context};
use crate::guard;
use crate::ledger::{Ledger, MIN_TXN_FEE};
use crate::txn::{application_address, Address, Transaction};
use teal_spec::{
    Instruction, Opcode, StackValue, TxnField, MAX_INNER_TRANSACTIONS, MAX_LOG_CALLS,
    MAX_LOG_SIZE,
};

/// First version accepting account addresses and application ids in place
/// of array offsets
const DIRECT_REF_VERSION: u64 = 4;

fn scalar_field(
    txn: &Transaction,
    field: TxnField,
    group_index: usize,
    version: u64,
    line: usize,
) -> Result<StackValue> {
    if field.is_array() {
        return Err(RuntimeError::InvalidOpArg {
            arg: field.name().to_string(),
            version,
            line,
        });
    }
    txn.field(field, group_index)
        .map_err(|e| RuntimeError::ledger(line, e))
}

fn group_txn<L: Ledger>(ledger: &L, index: u64, line: usize) -> Result<(&Transaction, usize)> {
    let i = guard::check_index_bound(index, ledger.group(), line)?;
    Ok((&ledger.group()[i], i))
}

fn current_txn<L: Ledger>(ledger: &L, line: usize) -> Result<&Transaction> {
    ledger
        .current_transaction()
        .map_err(|e| RuntimeError::ledger(line, e))
}

/// Account referenced by a stack value: an offset into `Accounts` (0 is the
/// sender) or, from version 4, an available address
fn resolve_account(
    txn: &Transaction,
    value: &StackValue,
    version: u64,
    line: usize,
) -> Result<Address> {
    match value {
        StackValue::Uint(0) => Ok(txn.sender),
        StackValue::Uint(i) => {
            let idx = guard::check_index_bound(i - 1, &txn.accounts, line).map_err(|_| {
                RuntimeError::IndexOutOfBound {
                    index: *i,
                    len: txn.accounts.len() + 1,
                    line,
                }
            })?;
            Ok(txn.accounts[idx])
        }
        StackValue::Bytes(bytes) if version >= DIRECT_REF_VERSION => {
            let address = Address::try_from(bytes.as_slice()).map_err(|_| {
                RuntimeError::InvalidType {
                    expected: "address".to_string(),
                    actual: format!("byte[{}]", bytes.len()),
                    line,
                }
            })?;
            let available = address == txn.sender
                || txn.accounts.contains(&address)
                || address == application_address(txn.application_id);
            if !available {
                return Err(RuntimeError::ledger(
                    line,
                    LedgerError::AccountNotAvailable(hex::encode(address)),
                ));
            }
            Ok(address)
        }
        other => guard::assert_uint64(other, line).map(|_| txn.sender),
    }
}

/// Application referenced by a stack value: 0 is the current application,
/// otherwise an offset into `Applications` or, from version 4, an
/// available application id
fn resolve_app(txn: &Transaction, value: &StackValue, version: u64, line: usize) -> Result<u64> {
    let reference = guard::assert_uint64(value, line)?;
    if version >= DIRECT_REF_VERSION
        && (reference == txn.application_id || txn.applications.contains(&reference))
    {
        return Ok(reference);
    }
    if reference == 0 {
        return Ok(txn.application_id);
    }
    let idx = guard::check_index_bound(reference - 1, &txn.applications, line).map_err(|_| {
        RuntimeError::IndexOutOfBound {
            index: reference,
            len: txn.applications.len() + 1,
            line,
        }
    })?;
    Ok(txn.applications[idx])
}

fn no_pending(what: &str, line: usize) -> RuntimeError {
    RuntimeError::InvalidProgram {
        reason: format!("{} without itxn_begin", what),
        line,
    }
}

pub fn execute<L: Ledger>(ctx: &mut Context<'_, L>, instr: &Instruction) -> Result<()> {
    let line = instr.line;
    let version = ctx.program.version;
    let le = move |e: LedgerError| RuntimeError::ledger(line, e);

    match instr.opcode {
        // ========== Transaction and Global ==========
        Opcode::Txn => {
            let field = guard::assert_tx_field_defined(immediate(instr.field(0), line)?, version, line)?;
            let index = ctx.ledger.current_index();
            let txn = current_txn(&*ctx.ledger, line)?;
            let value = scalar_field(txn, field, index, version, line)?;
            ctx.state.stack.push(value);
        }
        Opcode::Gtxn => {
            let group_index = immediate(instr.uint(0), line)?;
            let field = guard::assert_tx_field_defined(immediate(instr.field(1), line)?, version, line)?;
            let (txn, index) = group_txn(&*ctx.ledger, group_index, line)?;
            let value = scalar_field(txn, field, index, version, line)?;
            ctx.state.stack.push(value);
        }
        Opcode::Gtxns => {
            let field = guard::assert_tx_field_defined(immediate(instr.field(0), line)?, version, line)?;
            let args = ctx.state.stack.top_n(1, line)?;
            let group_index = guard::assert_uint64(&args[0], line)?;
            let (txn, index) = group_txn(&*ctx.ledger, group_index, line)?;
            let value = scalar_field(txn, field, index, version, line)?;
            ctx.state.stack.replace_top(1, [value]);
        }
        Opcode::Txna => {
            let field =
                guard::assert_tx_arr_field_defined(immediate(instr.field(0), line)?, version, line)?;
            let element = immediate(instr.uint(1), line)?;
            let value = current_txn(&*ctx.ledger, line)?.array_field(field, element, line)?;
            ctx.state.stack.push(value);
        }
        Opcode::Gtxna => {
            let group_index = immediate(instr.uint(0), line)?;
            let field =
                guard::assert_tx_arr_field_defined(immediate(instr.field(1), line)?, version, line)?;
            let element = immediate(instr.uint(2), line)?;
            let (txn, _) = group_txn(&*ctx.ledger, group_index, line)?;
            let value = txn.array_field(field, element, line)?;
            ctx.state.stack.push(value);
        }
        Opcode::Gtxnsa => {
            let field =
                guard::assert_tx_arr_field_defined(immediate(instr.field(0), line)?, version, line)?;
            let element = immediate(instr.uint(1), line)?;
            let args = ctx.state.stack.top_n(1, line)?;
            let group_index = guard::assert_uint64(&args[0], line)?;
            let (txn, _) = group_txn(&*ctx.ledger, group_index, line)?;
            let value = txn.array_field(field, element, line)?;
            ctx.state.stack.replace_top(1, [value]);
        }
        Opcode::Global => {
            let field = guard::assert_global_defined(immediate(instr.field(0), line)?, version, line)?;
            let value = ctx.ledger.global_field(field).map_err(le)?;
            ctx.state.stack.push(value);
        }

        // ========== Balances ==========
        Opcode::Balance | Opcode::MinBalance => {
            let args = ctx.state.stack.top_n(1, line)?;
            let account = resolve_account(current_txn(&*ctx.ledger, line)?, &args[0], version, line)?;
            let amount = if instr.opcode == Opcode::Balance {
                ctx.ledger.balance(&account)
            } else {
                ctx.ledger.min_balance(&account)
            }
            .map_err(le)?;
            ctx.state.stack.replace_top(1, [StackValue::Uint(amount)]);
        }
        Opcode::AppOptedIn => {
            let args = ctx.state.stack.top_n(2, line)?;
            let txn = current_txn(&*ctx.ledger, line)?;
            let account = resolve_account(txn, &args[0], version, line)?;
            let app_id = resolve_app(txn, &args[1], version, line)?;
            let opted_in = ctx.ledger.opted_in(&account, app_id).map_err(le)?;
            ctx.state.stack.discard(2);
            guard::push_boolean_check(&mut ctx.state.stack, opted_in);
        }

        // ========== Local State ==========
        Opcode::AppLocalGet => {
            let args = ctx.state.stack.top_n(2, line)?;
            let txn = current_txn(&*ctx.ledger, line)?;
            let account = resolve_account(txn, &args[0], version, line)?;
            let key = guard::assert_bytes(&args[1], line, None)?;
            let value = ctx
                .ledger
                .local_get(&account, txn.application_id, key)
                .map_err(le)?;
            ctx.state
                .stack
                .replace_top(2, [value.unwrap_or(StackValue::ZERO)]);
        }
        Opcode::AppLocalGetEx => {
            let args = ctx.state.stack.top_n(3, line)?;
            let txn = current_txn(&*ctx.ledger, line)?;
            let account = resolve_account(txn, &args[0], version, line)?;
            let app_id = resolve_app(txn, &args[1], version, line)?;
            let key = guard::assert_bytes(&args[2], line, None)?;
            let value = ctx.ledger.local_get(&account, app_id, key).map_err(le)?;
            let found = value.is_some();
            ctx.state.stack.replace_top(
                3,
                [value.unwrap_or(StackValue::ZERO), StackValue::from_bool(found)],
            );
        }
        Opcode::AppLocalPut => {
            let args = ctx.state.stack.top_n(3, line)?;
            let txn = current_txn(&*ctx.ledger, line)?;
            let account = resolve_account(txn, &args[0], version, line)?;
            let app_id = txn.application_id;
            let key = guard::assert_bytes(&args[1], line, None)?.to_vec();
            let value = args[2].clone();
            ctx.ledger
                .local_put(&account, app_id, &key, value)
                .map_err(le)?;
            ctx.state.stack.discard(3);
        }
        Opcode::AppLocalDel => {
            let args = ctx.state.stack.top_n(2, line)?;
            let txn = current_txn(&*ctx.ledger, line)?;
            let account = resolve_account(txn, &args[0], version, line)?;
            let app_id = txn.application_id;
            let key = guard::assert_bytes(&args[1], line, None)?.to_vec();
            ctx.ledger.local_del(&account, app_id, &key).map_err(le)?;
            ctx.state.stack.discard(2);
        }

        // ========== Global State ==========
        Opcode::AppGlobalGet => {
            let args = ctx.state.stack.top_n(1, line)?;
            let app_id = current_txn(&*ctx.ledger, line)?.application_id;
            let key = guard::assert_bytes(&args[0], line, None)?;
            let value = ctx.ledger.global_get(app_id, key).map_err(le)?;
            ctx.state
                .stack
                .replace_top(1, [value.unwrap_or(StackValue::ZERO)]);
        }
        Opcode::AppGlobalGetEx => {
            let args = ctx.state.stack.top_n(2, line)?;
            let app_id = resolve_app(current_txn(&*ctx.ledger, line)?, &args[0], version, line)?;
            let key = guard::assert_bytes(&args[1], line, None)?;
            let value = ctx.ledger.global_get(app_id, key).map_err(le)?;
            let found = value.is_some();
            ctx.state.stack.replace_top(
                2,
                [value.unwrap_or(StackValue::ZERO), StackValue::from_bool(found)],
            );
        }
        Opcode::AppGlobalPut => {
            let args = ctx.state.stack.top_n(2, line)?;
            let app_id = current_txn(&*ctx.ledger, line)?.application_id;
            let key = guard::assert_bytes(&args[0], line, None)?.to_vec();
            let value = args[1].clone();
            ctx.ledger.global_put(app_id, &key, value).map_err(le)?;
            ctx.state.stack.discard(2);
        }
        Opcode::AppGlobalDel => {
            let args = ctx.state.stack.top_n(1, line)?;
            let app_id = current_txn(&*ctx.ledger, line)?.application_id;
            let key = guard::assert_bytes(&args[0], line, None)?.to_vec();
            ctx.ledger.global_del(app_id, &key).map_err(le)?;
            ctx.state.stack.discard(1);
        }

        // ========== Logging ==========
        Opcode::Log => {
            let args = ctx.state.stack.top_n(1, line)?;
            let message = guard::assert_bytes(&args[0], line, None)?.to_vec();
            if ctx.state.logs.len() >= MAX_LOG_CALLS {
                return Err(RuntimeError::LogLimitExceeded {
                    reason: format!("more than {} calls", MAX_LOG_CALLS),
                    line,
                });
            }
            if ctx.state.log_size() + message.len() > MAX_LOG_SIZE {
                return Err(RuntimeError::LogLimitExceeded {
                    reason: format!("more than {} bytes", MAX_LOG_SIZE),
                    line,
                });
            }
            let app_id = current_txn(&*ctx.ledger, line)?.application_id;
            ctx.ledger.log(app_id, &message);
            ctx.state.logs.push(message);
            ctx.state.stack.discard(1);
        }

        // ========== Inner Transactions ==========
        Opcode::ItxnBegin => {
            if ctx.state.pending_inner.is_some() {
                return Err(RuntimeError::InvalidProgram {
                    reason: "itxn_begin without itxn_submit".to_string(),
                    line,
                });
            }
            if ctx.state.inner_transactions.len() >= MAX_INNER_TRANSACTIONS {
                return Err(RuntimeError::InnerTransactionLimit {
                    max: MAX_INNER_TRANSACTIONS,
                    line,
                });
            }
            let app_id = current_txn(&*ctx.ledger, line)?.application_id;
            ctx.state.pending_inner = Some(Transaction {
                sender: application_address(app_id),
                fee: MIN_TXN_FEE,
                ..Default::default()
            });
        }
        Opcode::ItxnField => {
            let field = guard::assert_itx_field_defined(immediate(instr.field(0), line)?, version, line)?;
            if !field.is_inner_settable() {
                return Err(RuntimeError::InvalidOpArg {
                    arg: field.name().to_string(),
                    version,
                    line,
                });
            }
            let args = ctx.state.stack.top_n(1, line)?;
            let pending = ctx
                .state
                .pending_inner
                .as_mut()
                .ok_or_else(|| no_pending("itxn_field", line))?;
            pending.set_field(field, &args[0], line)?;
            ctx.state.stack.discard(1);
        }
        Opcode::ItxnSubmit => {
            let pending = ctx
                .state
                .pending_inner
                .clone()
                .ok_or_else(|| no_pending("itxn_submit", line))?;
            let executed = ctx.ledger.submit_inner(pending).map_err(le)?;
            ctx.state.pending_inner = None;
            ctx.state.inner_transactions.push(executed);
        }
        Opcode::Itxn => {
            let field = guard::assert_itx_field_defined(immediate(instr.field(0), line)?, version, line)?;
            let last = ctx
                .state
                .inner_transactions
                .last()
                .ok_or_else(|| RuntimeError::InvalidProgram {
                    reason: "no inner transaction has been submitted".to_string(),
                    line,
                })?;
            let value = scalar_field(last, field, 0, version, line)?;
            ctx.state.stack.push(value);
        }
        Opcode::Itxna => {
            let field =
                guard::assert_itx_arr_field_defined(immediate(instr.field(0), line)?, version, line)?;
            let element = immediate(instr.uint(1), line)?;
            let last = ctx
                .state
                .inner_transactions
                .last()
                .ok_or_else(|| RuntimeError::InvalidProgram {
                    reason: "no inner transaction has been submitted".to_string(),
                    line,
                })?;
            let value = last.array_field(field, element, line)?;
            ctx.state.stack.push(value);
        }

        other => {
            return Err(RuntimeError::InvalidProgram {
                reason: format!("{} is not a ledger opcode", other),
                line,
            })
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn() -> Transaction {
        let mut txn = Transaction::app_call([1; 32], 10);
        txn.accounts = vec![[2; 32]];
        txn.applications = vec![20, 30];
        txn
    }

    #[test]
    fn test_resolve_account_by_offset() {
        let t = txn();
        assert_eq!(resolve_account(&t, &StackValue::Uint(0), 2, 1).unwrap(), [1; 32]);
        assert_eq!(resolve_account(&t, &StackValue::Uint(1), 2, 1).unwrap(), [2; 32]);
        assert!(matches!(
            resolve_account(&t, &StackValue::Uint(2), 2, 1),
            Err(RuntimeError::IndexOutOfBound { index: 2, len: 2, .. })
        ));
    }

    #[test]
    fn test_resolve_account_by_address() {
        let t = txn();
        let addr = StackValue::Bytes(vec![2; 32]);
        assert!(resolve_account(&t, &addr, 3, 1).is_err());
        assert_eq!(resolve_account(&t, &addr, 4, 1).unwrap(), [2; 32]);
        assert!(matches!(
            resolve_account(&t, &StackValue::Bytes(vec![9; 32]), 4, 1),
            Err(RuntimeError::Ledger {
                source: LedgerError::AccountNotAvailable(_),
                ..
            })
        ));
        assert!(resolve_account(&t, &StackValue::Bytes(vec![2; 31]), 4, 1).is_err());
    }

    #[test]
    fn test_failed_submit_keeps_pending_transaction() {
        use crate::ledger::InMemoryLedger;
        use crate::state::ExecutionState;
        use teal_spec::{ExecutionMode, Program};

        let mut ledger = InMemoryLedger::new();
        ledger.set_group(vec![txn()], 0);
        let mut state = ExecutionState::new(1000);
        let mut pending = Transaction::payment(application_address(10), [2; 32], 5_000);
        pending.fee = MIN_TXN_FEE;
        state.pending_inner = Some(pending.clone());

        let program = Program::new(5);
        let mut ctx = Context {
            state: &mut state,
            ledger: &mut ledger,
            program: &program,
            mode: ExecutionMode::Application,
            args: &[],
        };
        let err = execute(&mut ctx, &Instruction::simple(Opcode::ItxnSubmit, 3)).unwrap_err();
        assert!(matches!(err, RuntimeError::Ledger { line: 3, .. }));
        assert_eq!(state.pending_inner, Some(pending));
        assert!(state.inner_transactions.is_empty());
    }

    #[test]
    fn test_resolve_app() {
        let t = txn();
        assert_eq!(resolve_app(&t, &StackValue::Uint(0), 2, 1).unwrap(), 10);
        assert_eq!(resolve_app(&t, &StackValue::Uint(2), 2, 1).unwrap(), 30);
        assert!(resolve_app(&t, &StackValue::Uint(3), 2, 1).is_err());
        // direct ids from version 4
        assert!(resolve_app(&t, &StackValue::Uint(20), 3, 1).is_err());
        assert_eq!(resolve_app(&t, &StackValue::Uint(20), 4, 1).unwrap(), 20);
        assert_eq!(resolve_app(&t, &StackValue::Uint(10), 4, 1).unwrap(), 10);
    }
}
