//! Arithmetic, comparison and bitwise opcodes
//!
//! Results that can leave the `u64` range are computed on [`BigInt`] and
//! narrowed through the guard layer, so overflow and underflow are always
//! reported rather than wrapped. `shl` is the exception: it truncates to
//! 64 bits.

use crate::error::{Result, RuntimeError};
use crate::guard::{self, UintWidth};
use crate::stack::Stack;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use teal_spec::{Opcode, StackValue};

/// Apply `f` to the two integers on top of the stack (A below B)
fn binary<I>(stack: &mut Stack, line: usize, f: impl FnOnce(u64, u64) -> Result<I>) -> Result<()>
where
    I: IntoIterator<Item = StackValue>,
{
    let args = stack.top_n(2, line)?;
    let a = guard::assert_uint64(&args[0], line)?;
    let b = guard::assert_uint64(&args[1], line)?;
    let out = f(a, b)?;
    stack.replace_top(2, out);
    Ok(())
}

fn unary<I>(stack: &mut Stack, line: usize, f: impl FnOnce(u64) -> Result<I>) -> Result<()>
where
    I: IntoIterator<Item = StackValue>,
{
    let args = stack.top_n(1, line)?;
    let a = guard::assert_uint64(&args[0], line)?;
    let out = f(a)?;
    stack.replace_top(1, out);
    Ok(())
}

fn one(v: u64) -> Result<[StackValue; 1]> {
    Ok([StackValue::Uint(v)])
}

fn boolean(ok: bool) -> Result<[StackValue; 1]> {
    Ok([StackValue::from_bool(ok)])
}

/// Narrow an unbounded result to `u64`
fn narrow(value: &BigInt, line: usize) -> Result<u64> {
    guard::check_overflow(value, line, UintWidth::U64)?;
    guard::check_underflow(value, line)
}

/// Split a 128-bit value into (high, low) words
fn split(value: u128) -> [StackValue; 2] {
    [
        StackValue::Uint((value >> 64) as u64),
        StackValue::Uint(value as u64),
    ]
}

pub fn execute(op: Opcode, stack: &mut Stack, line: usize) -> Result<()> {
    match op {
        Opcode::Add => binary(stack, line, |a, b| one(narrow(&(BigInt::from(a) + b), line)?)),
        Opcode::Sub => binary(stack, line, |a, b| one(narrow(&(BigInt::from(a) - b), line)?)),
        Opcode::Mul => binary(stack, line, |a, b| one(narrow(&(BigInt::from(a) * b), line)?)),
        Opcode::Div => binary(stack, line, |a, b| {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero { line });
            }
            one(a / b)
        }),
        Opcode::Mod => binary(stack, line, |a, b| {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero { line });
            }
            one(a % b)
        }),

        Opcode::Lt => binary(stack, line, |a, b| boolean(a < b)),
        Opcode::Gt => binary(stack, line, |a, b| boolean(a > b)),
        Opcode::Le => binary(stack, line, |a, b| boolean(a <= b)),
        Opcode::Ge => binary(stack, line, |a, b| boolean(a >= b)),
        Opcode::And => binary(stack, line, |a, b| boolean(a != 0 && b != 0)),
        Opcode::Or => binary(stack, line, |a, b| boolean(a != 0 || b != 0)),
        Opcode::Not => unary(stack, line, |a| boolean(a == 0)),

        Opcode::Eq | Opcode::Neq => equality(op == Opcode::Eq, stack, line),

        Opcode::BitOr => binary(stack, line, |a, b| one(a | b)),
        Opcode::BitAnd => binary(stack, line, |a, b| one(a & b)),
        Opcode::BitXor => binary(stack, line, |a, b| one(a ^ b)),
        Opcode::BitNot => unary(stack, line, |a| one(!a)),

        Opcode::Mulw => binary(stack, line, |a, b| Ok(split(a as u128 * b as u128))),
        Opcode::Addw => binary(stack, line, |a, b| {
            let (sum, carry) = a.overflowing_add(b);
            Ok([StackValue::from_bool(carry), StackValue::Uint(sum)])
        }),
        Opcode::Divmodw => divmodw(stack, line),

        Opcode::Shl => binary(stack, line, |a, b| {
            let shift = guard::assert_64bit_index(b, line)?;
            one(a << shift)
        }),
        Opcode::Shr => binary(stack, line, |a, b| {
            let shift = guard::assert_64bit_index(b, line)?;
            one(a >> shift)
        }),
        Opcode::Sqrt => unary(stack, line, |a| {
            let root = BigInt::from(a).sqrt();
            one(narrow(&root, line)?)
        }),
        Opcode::Bitlen => bitlen(stack, line),
        Opcode::Exp => binary(stack, line, |a, b| one(narrow(&pow(a, b, UintWidth::U64, line)?, line)?)),
        Opcode::Expw => binary(stack, line, |a, b| {
            let value = pow(a, b, UintWidth::U128, line)?;
            let wide = value
                .to_u128()
                .ok_or(RuntimeError::Uint128Overflow { line })?;
            Ok(split(wide))
        }),

        other => Err(RuntimeError::InvalidProgram {
            reason: format!("{} is not an arithmetic opcode", other),
            line,
        }),
    }
}

/// `==` / `!=`: operands may be of either type but must share it
fn equality(want_equal: bool, stack: &mut Stack, line: usize) -> Result<()> {
    let args = stack.top_n(2, line)?;
    let (a, b) = (&args[0], &args[1]);
    if a.stack_type() != b.stack_type() {
        return Err(RuntimeError::InvalidType {
            expected: a.type_name().to_string(),
            actual: b.type_name().to_string(),
            line,
        });
    }
    let equal = a == b;
    stack.discard(2);
    guard::push_boolean_check(stack, equal == want_equal);
    Ok(())
}

/// A ** B on unbounded integers, failing early once the result is known to
/// exceed `width`
fn pow(a: u64, b: u64, width: UintWidth, line: usize) -> Result<BigInt> {
    if a == 0 && b == 0 {
        return Err(RuntimeError::ZeroToThePowerOfZero { line });
    }
    if a <= 1 || b == 0 {
        return Ok(BigInt::from(if b == 0 { 1 } else { a }));
    }
    let max_bits = match width {
        UintWidth::U64 => 64,
        UintWidth::U128 => 128,
    };
    // a >= 2, so a ** b >= 2 ** b
    if b >= max_bits {
        guard::check_overflow(&(BigInt::from(1u8) << max_bits), line, width)?;
    }
    let result = BigInt::from(a).pow(b as u32);
    guard::check_overflow(&result, line, width)?;
    Ok(result)
}

/// divmodw: (A:B) / (C:D) as (quotient high, quotient low, remainder high,
/// remainder low)
fn divmodw(stack: &mut Stack, line: usize) -> Result<()> {
    let args = stack.top_n(4, line)?;
    let mut words = [0u64; 4];
    for (slot, value) in words.iter_mut().zip(args) {
        *slot = guard::assert_uint64(value, line)?;
    }
    let dividend = (words[0] as u128) << 64 | words[1] as u128;
    let divisor = (words[2] as u128) << 64 | words[3] as u128;
    if divisor.is_zero() {
        return Err(RuntimeError::DivisionByZero { line });
    }
    let [qh, ql] = split(dividend / divisor);
    let [rh, rl] = split(dividend % divisor);
    stack.replace_top(4, [qh, ql, rh, rl]);
    Ok(())
}

/// bitlen: index of the highest set bit plus one. Byte strings are read as
/// big-endian unsigned integers.
fn bitlen(stack: &mut Stack, line: usize) -> Result<()> {
    let args = stack.top_n(1, line)?;
    let bits = match &args[0] {
        StackValue::Uint(v) => 64 - v.leading_zeros() as u64,
        StackValue::Bytes(bytes) => match bytes.iter().position(|b| *b != 0) {
            Some(first) => {
                let rest = (bytes.len() - first - 1) as u64;
                rest * 8 + (8 - bytes[first].leading_zeros() as u64)
            }
            None => 0,
        },
    };
    stack.replace_top(1, [StackValue::Uint(bits)]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    fn run(op: Opcode, inputs: &[StackValue]) -> Result<Vec<StackValue>> {
        let mut stack = Stack::new();
        for v in inputs {
            stack.push(v.clone());
        }
        execute(op, &mut stack, 1)?;
        Ok(stack.into_vec())
    }

    fn uints(values: &[u64]) -> Vec<StackValue> {
        values.iter().map(|v| StackValue::Uint(*v)).collect()
    }

    #[test]
    fn test_div() {
        assert_eq!(run(Opcode::Div, &uints(&[5, 3])).unwrap(), uints(&[1]));
        let err = run(Opcode::Div, &uints(&[5, 0])).unwrap_err();
        assert_eq!(err, RuntimeError::DivisionByZero { line: 1 });
        assert_eq!(err.kind(), ErrorKind::NumericUnderflow);
    }

    #[test]
    fn test_failed_op_leaves_stack() {
        let mut stack = Stack::new();
        stack.push(5u64);
        stack.push(0u64);
        assert!(execute(Opcode::Div, &mut stack, 1).is_err());
        assert_eq!(stack.values(), &uints(&[5, 0])[..]);
    }

    #[test]
    fn test_add_overflow() {
        assert_eq!(
            run(Opcode::Add, &uints(&[u64::MAX, 0])).unwrap(),
            uints(&[u64::MAX])
        );
        assert_eq!(
            run(Opcode::Add, &uints(&[u64::MAX, 1])).unwrap_err().kind(),
            ErrorKind::NumericOverflow
        );
    }

    #[test]
    fn test_sub_underflow() {
        assert_eq!(run(Opcode::Sub, &uints(&[3, 3])).unwrap(), uints(&[0]));
        assert_eq!(
            run(Opcode::Sub, &uints(&[3, 4])).unwrap_err(),
            RuntimeError::Uint64Underflow { line: 1 }
        );
    }

    #[test]
    fn test_type_mismatch() {
        let err = run(Opcode::Add, &[StackValue::Uint(1), StackValue::from("x")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_equality() {
        assert_eq!(
            run(Opcode::Eq, &[StackValue::from("a"), StackValue::from("a")]).unwrap(),
            uints(&[1])
        );
        assert_eq!(run(Opcode::Neq, &uints(&[1, 2])).unwrap(), uints(&[1]));
        assert_eq!(
            run(Opcode::Eq, &[StackValue::Uint(1), StackValue::from("a")])
                .unwrap_err()
                .kind(),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn test_wide_ops() {
        assert_eq!(
            run(Opcode::Mulw, &uints(&[u64::MAX, 2])).unwrap(),
            uints(&[1, u64::MAX - 1])
        );
        assert_eq!(
            run(Opcode::Addw, &uints(&[u64::MAX, 2])).unwrap(),
            uints(&[1, 1])
        );
        // (1:0) / (0:2) = 2^63 remainder 0
        assert_eq!(
            run(Opcode::Divmodw, &uints(&[1, 0, 0, 2])).unwrap(),
            uints(&[0, 1 << 63, 0, 0])
        );
        assert!(run(Opcode::Divmodw, &uints(&[1, 0, 0, 0])).is_err());
    }

    #[test]
    fn test_shifts() {
        assert_eq!(run(Opcode::Shl, &uints(&[1, 63])).unwrap(), uints(&[1 << 63]));
        assert_eq!(run(Opcode::Shl, &uints(&[3, 63])).unwrap(), uints(&[1 << 63]));
        assert_eq!(run(Opcode::Shr, &uints(&[8, 3])).unwrap(), uints(&[1]));
        assert!(run(Opcode::Shl, &uints(&[1, 64])).is_err());
    }

    #[test]
    fn test_exp() {
        assert_eq!(run(Opcode::Exp, &uints(&[2, 10])).unwrap(), uints(&[1024]));
        assert_eq!(run(Opcode::Exp, &uints(&[2, 63])).unwrap(), uints(&[1 << 63]));
        assert_eq!(
            run(Opcode::Exp, &uints(&[2, 64])).unwrap_err().kind(),
            ErrorKind::NumericOverflow
        );
        assert_eq!(run(Opcode::Exp, &uints(&[1, u64::MAX])).unwrap(), uints(&[1]));
        assert_eq!(run(Opcode::Exp, &uints(&[7, 0])).unwrap(), uints(&[1]));
        assert_eq!(
            run(Opcode::Exp, &uints(&[0, 0])).unwrap_err(),
            RuntimeError::ZeroToThePowerOfZero { line: 1 }
        );
        assert_eq!(
            run(Opcode::Expw, &uints(&[2, 64])).unwrap(),
            uints(&[1, 0])
        );
        assert_eq!(
            run(Opcode::Expw, &uints(&[2, 128])).unwrap_err(),
            RuntimeError::Uint128Overflow { line: 1 }
        );
    }

    #[test]
    fn test_sqrt_and_bitlen() {
        assert_eq!(run(Opcode::Sqrt, &uints(&[17])).unwrap(), uints(&[4]));
        assert_eq!(run(Opcode::Bitlen, &uints(&[0])).unwrap(), uints(&[0]));
        assert_eq!(run(Opcode::Bitlen, &uints(&[8])).unwrap(), uints(&[4]));
        assert_eq!(
            run(Opcode::Bitlen, &[StackValue::Bytes(vec![0, 1, 0])]).unwrap(),
            uints(&[9])
        );
    }

    proptest! {
        #[test]
        fn prop_add_matches_checked(a in any::<u64>(), b in any::<u64>()) {
            let result = run(Opcode::Add, &uints(&[a, b]));
            match a.checked_add(b) {
                Some(sum) => prop_assert_eq!(result.unwrap(), uints(&[sum])),
                None => prop_assert!(result.is_err()),
            }
        }

        #[test]
        fn prop_mul_matches_checked(a in any::<u64>(), b in any::<u64>()) {
            let result = run(Opcode::Mul, &uints(&[a, b]));
            match a.checked_mul(b) {
                Some(p) => prop_assert_eq!(result.unwrap(), uints(&[p])),
                None => prop_assert!(result.is_err()),
            }
        }

        #[test]
        fn prop_mulw_recombines(a in any::<u64>(), b in any::<u64>()) {
            let out = run(Opcode::Mulw, &uints(&[a, b])).unwrap();
            let high = out[0].as_uint().unwrap() as u128;
            let low = out[1].as_uint().unwrap() as u128;
            prop_assert_eq!(high << 64 | low, a as u128 * b as u128);
        }
    }
}
