//! # Guard Layer
//!
//! Validation primitives shared by every opcode. Each guard either returns
//! a validated (often narrowed) value or fails with a [`RuntimeError`]
//! carrying the source line of the executing instruction. Guards never
//! mutate the stack, except [`push_boolean_check`] which exists to push.
//!
//! Arithmetic that can leave the `u64` range is evaluated on unbounded
//! integers ([`BigInt`]) and brought back through [`check_overflow`] and
//! [`check_underflow`].

use crate::error::{Result, RuntimeError};
use crate::stack::Stack;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};
use teal_spec::{
    schema, GlobalField, StackType, StackValue, TxnField, MAX_CONSTANT_BLOCK, MAX_UINT6,
    MAX_UINT8,
};

/// Ceiling selector for [`check_overflow`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UintWidth {
    U64,
    U128,
}

impl UintWidth {
    fn bits(self) -> u64 {
        match self {
            UintWidth::U64 => 64,
            UintWidth::U128 => 128,
        }
    }
}

/// Fail unless the stack holds at least `min_len` values
pub fn assert_min_stack_len(stack: &Stack, min_len: usize, line: usize) -> Result<()> {
    if stack.len() < min_len {
        return Err(RuntimeError::StackUnderflow {
            expected: min_len,
            actual: stack.len(),
            line,
        });
    }
    Ok(())
}

/// Fail if `value` exceeds the ceiling selected by `width`.
/// Values at or below the ceiling pass unchanged.
pub fn check_overflow(value: &BigInt, line: usize, width: UintWidth) -> Result<()> {
    // A non-negative integer fits in `bits` iff its bit length is at most `bits`
    if value.is_positive() && value.bits() > width.bits() {
        return Err(match width {
            UintWidth::U64 => RuntimeError::Uint64Overflow { line },
            UintWidth::U128 => RuntimeError::Uint128Overflow { line },
        });
    }
    Ok(())
}

/// Fail if `value` is negative; otherwise narrow it to `u64`, failing
/// with an overflow if it does not fit
pub fn check_underflow(value: &BigInt, line: usize) -> Result<u64> {
    if value.is_negative() {
        return Err(RuntimeError::Uint64Underflow { line });
    }
    check_overflow(value, line, UintWidth::U64)?;
    value.to_u64().ok_or(RuntimeError::Uint64Overflow { line })
}

/// Fail unless `index` addresses an element of `array`
pub fn check_index_bound<T>(index: u64, array: &[T], line: usize) -> Result<usize> {
    match usize::try_from(index) {
        Ok(i) if i < array.len() => Ok(i),
        _ => Err(RuntimeError::IndexOutOfBound {
            index,
            len: array.len(),
            line,
        }),
    }
}

/// Fail unless `1 <= array.len() <= 256`
pub fn assert_arr_length<T>(array: &[T], line: usize) -> Result<()> {
    if array.is_empty() || array.len() > MAX_CONSTANT_BLOCK {
        return Err(RuntimeError::ArrayLength {
            len: array.len(),
            line,
        });
    }
    Ok(())
}

fn type_error(expected: StackType, actual: &StackValue, line: usize) -> RuntimeError {
    RuntimeError::InvalidType {
        expected: expected.name().to_string(),
        actual: actual.type_name().to_string(),
        line,
    }
}

/// Narrow a stack value to an integer
pub fn assert_uint64(value: &StackValue, line: usize) -> Result<u64> {
    match value {
        StackValue::Uint(v) => Ok(*v),
        other => Err(type_error(StackType::Uint64, other, line)),
    }
}

/// Narrow a stack value to a byte string, optionally bounding its length
pub fn assert_bytes<'a>(
    value: &'a StackValue,
    line: usize,
    max_len: Option<usize>,
) -> Result<&'a [u8]> {
    match value {
        StackValue::Bytes(bytes) => {
            if let Some(max) = max_len {
                if bytes.len() > max {
                    return Err(RuntimeError::BytesLengthExceeded {
                        len: bytes.len(),
                        max,
                        line,
                    });
                }
            }
            Ok(bytes)
        }
        other => Err(type_error(StackType::Bytes, other, line)),
    }
}

/// Fail unless `value` lies in 0..=255
pub fn assert_uint8(value: u64, line: usize) -> Result<u8> {
    if value > MAX_UINT8 {
        return Err(RuntimeError::InvalidUint8 { value, line });
    }
    u8::try_from(value).map_err(|_| RuntimeError::InvalidUint8 { value, line })
}

/// Fail unless `index` is a bit index into a 64-bit integer
pub fn assert_64bit_index(index: u64, line: usize) -> Result<u32> {
    if index > MAX_UINT6 {
        return Err(RuntimeError::SetBitIndex { index, line });
    }
    Ok(index as u32)
}

/// Fail unless `index` is a bit index into `array`
pub fn assert_bytes_index(index: u64, array: &[u8], line: usize) -> Result<usize> {
    let bits = (array.len() as u64).saturating_mul(8);
    if index >= bits {
        return Err(RuntimeError::SetBitIndexBytes {
            index,
            len: array.len(),
            line,
        });
    }
    Ok(index as usize)
}

fn unknown_txn_field(field: &str, version: u64, line: usize) -> RuntimeError {
    RuntimeError::UnknownTransactionField {
        field: field.to_string(),
        version,
        line,
    }
}

fn invalid_op_arg(arg: &str, version: u64, line: usize) -> RuntimeError {
    RuntimeError::InvalidOpArg {
        arg: arg.to_string(),
        version,
        line,
    }
}

/// Resolve a scalar transaction field name for `version`
pub fn assert_tx_field_defined(field: &str, version: u64, line: usize) -> Result<TxnField> {
    schema(version)
        .and_then(|s| s.txn(field))
        .ok_or_else(|| unknown_txn_field(field, version, line))
}

/// Resolve an array transaction field name for `version`
pub fn assert_tx_arr_field_defined(field: &str, version: u64, line: usize) -> Result<TxnField> {
    schema(version)
        .and_then(|s| s.txn_array(field))
        .ok_or_else(|| invalid_op_arg(field, version, line))
}

/// Resolve an inner transaction field name for `version`
pub fn assert_itx_field_defined(field: &str, version: u64, line: usize) -> Result<TxnField> {
    schema(version)
        .and_then(|s| s.itxn(field))
        .ok_or_else(|| unknown_txn_field(field, version, line))
}

/// Resolve an inner transaction array field name for `version`
pub fn assert_itx_arr_field_defined(field: &str, version: u64, line: usize) -> Result<TxnField> {
    schema(version)
        .and_then(|s| s.itxn_array(field))
        .ok_or_else(|| invalid_op_arg(field, version, line))
}

/// Resolve a global field name for `version`
pub fn assert_global_defined(field: &str, version: u64, line: usize) -> Result<GlobalField> {
    schema(version)
        .and_then(|s| s.global(field))
        .ok_or_else(|| RuntimeError::UnknownGlobalField {
            field: field.to_string(),
            version,
            line,
        })
}

/// Bytes `start..end` of `bytes` as a new buffer
pub fn sub_string(bytes: &[u8], start: u64, end: u64, line: usize) -> Result<Vec<u8>> {
    if end < start {
        return Err(RuntimeError::SubstringEndBeforeStart { start, end, line });
    }
    if end > bytes.len() as u64 {
        return Err(RuntimeError::SubstringRangeBeyond {
            start,
            end,
            len: bytes.len(),
            line,
        });
    }
    Ok(bytes[start as usize..end as usize].to_vec())
}

/// Push 1 if `ok`, otherwise 0
pub fn push_boolean_check(stack: &mut Stack, ok: bool) -> &mut Stack {
    stack.push(StackValue::from_bool(ok));
    stack
}

/// `length` bytes of `array` starting at `start` as a new buffer
pub fn op_extract_impl(array: &[u8], start: u64, length: u64, line: usize) -> Result<Vec<u8>> {
    let end = start.saturating_add(length);
    if end > array.len() as u64 {
        return Err(RuntimeError::ExtractRange {
            given: end,
            length: array.len(),
            line,
        });
    }
    Ok(array[start as usize..end as usize].to_vec())
}
