//! Byte-string, bit and hashing opcodes

use crate::error::{Result, RuntimeError};
use crate::execute::immediate;
use crate::guard;
use crate::stack::Stack;
use sha2::{Digest, Sha256, Sha512_256};
use sha3::Keccak256;
use teal_spec::{Instruction, Opcode, StackValue, MAX_STRING_SIZE};

fn hash<D: Digest>(stack: &mut Stack, line: usize) -> Result<()> {
    let args = stack.top_n(1, line)?;
    let input = guard::assert_bytes(&args[0], line, None)?;
    let digest = D::digest(input).to_vec();
    stack.replace_top(1, [StackValue::Bytes(digest)]);
    Ok(())
}

fn be_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| acc << 8 | *b as u64)
}

pub fn execute(instr: &Instruction, stack: &mut Stack) -> Result<()> {
    let line = instr.line;
    match instr.opcode {
        Opcode::Sha256 => hash::<Sha256>(stack, line),
        Opcode::Keccak256 => hash::<Keccak256>(stack, line),
        Opcode::Sha512_256 => hash::<Sha512_256>(stack, line),

        Opcode::Len => {
            let args = stack.top_n(1, line)?;
            let len = guard::assert_bytes(&args[0], line, None)?.len() as u64;
            stack.replace_top(1, [StackValue::Uint(len)]);
            Ok(())
        }
        Opcode::Itob => {
            let args = stack.top_n(1, line)?;
            let v = guard::assert_uint64(&args[0], line)?;
            stack.replace_top(1, [StackValue::Bytes(v.to_be_bytes().to_vec())]);
            Ok(())
        }
        Opcode::Btoi => {
            let args = stack.top_n(1, line)?;
            let bytes = guard::assert_bytes(&args[0], line, Some(8))?;
            let v = be_uint(bytes);
            stack.replace_top(1, [StackValue::Uint(v)]);
            Ok(())
        }
        Opcode::Concat => {
            let args = stack.top_n(2, line)?;
            let a = guard::assert_bytes(&args[0], line, None)?;
            let b = guard::assert_bytes(&args[1], line, None)?;
            if a.len() + b.len() > MAX_STRING_SIZE {
                return Err(RuntimeError::BytesLengthExceeded {
                    len: a.len() + b.len(),
                    max: MAX_STRING_SIZE,
                    line,
                });
            }
            let joined = [a, b].concat();
            stack.replace_top(2, [StackValue::Bytes(joined)]);
            Ok(())
        }
        Opcode::Substring => {
            let start = immediate(instr.uint(0), line)?;
            let end = immediate(instr.uint(1), line)?;
            let args = stack.top_n(1, line)?;
            let bytes = guard::assert_bytes(&args[0], line, None)?;
            let out = guard::sub_string(bytes, start, end, line)?;
            stack.replace_top(1, [StackValue::Bytes(out)]);
            Ok(())
        }
        Opcode::Substring3 => {
            let args = stack.top_n(3, line)?;
            let bytes = guard::assert_bytes(&args[0], line, None)?;
            let start = guard::assert_uint64(&args[1], line)?;
            let end = guard::assert_uint64(&args[2], line)?;
            let out = guard::sub_string(bytes, start, end, line)?;
            stack.replace_top(3, [StackValue::Bytes(out)]);
            Ok(())
        }
        Opcode::Extract => {
            let start = immediate(instr.uint(0), line)?;
            let length = immediate(instr.uint(1), line)?;
            let args = stack.top_n(1, line)?;
            let bytes = guard::assert_bytes(&args[0], line, None)?;
            // A zero length immediate extracts to the end
            let length = if length == 0 {
                (bytes.len() as u64).checked_sub(start).ok_or(RuntimeError::ExtractRange {
                    given: start,
                    length: bytes.len(),
                    line,
                })?
            } else {
                length
            };
            let out = guard::op_extract_impl(bytes, start, length, line)?;
            stack.replace_top(1, [StackValue::Bytes(out)]);
            Ok(())
        }
        Opcode::Extract3 => {
            let args = stack.top_n(3, line)?;
            let bytes = guard::assert_bytes(&args[0], line, None)?;
            let start = guard::assert_uint64(&args[1], line)?;
            let length = guard::assert_uint64(&args[2], line)?;
            let out = guard::op_extract_impl(bytes, start, length, line)?;
            stack.replace_top(3, [StackValue::Bytes(out)]);
            Ok(())
        }
        Opcode::ExtractUint16 => extract_uint(stack, 2, line),
        Opcode::ExtractUint32 => extract_uint(stack, 4, line),
        Opcode::ExtractUint64 => extract_uint(stack, 8, line),

        Opcode::Getbit => {
            let args = stack.top_n(2, line)?;
            let index = guard::assert_uint64(&args[1], line)?;
            let bit = match &args[0] {
                StackValue::Uint(v) => (v >> guard::assert_64bit_index(index, line)?) & 1,
                StackValue::Bytes(bytes) => {
                    let i = guard::assert_bytes_index(index, bytes, line)?;
                    ((bytes[i / 8] >> (7 - i % 8)) & 1) as u64
                }
            };
            stack.replace_top(2, [StackValue::Uint(bit)]);
            Ok(())
        }
        Opcode::Setbit => {
            let args = stack.top_n(3, line)?;
            let index = guard::assert_uint64(&args[1], line)?;
            let bit = guard::assert_uint64(&args[2], line)?;
            if bit > 1 {
                return Err(RuntimeError::SetBitValue { value: bit, line });
            }
            let out = match &args[0] {
                StackValue::Uint(v) => {
                    let mask = 1u64 << guard::assert_64bit_index(index, line)?;
                    StackValue::Uint(if bit == 1 { v | mask } else { v & !mask })
                }
                StackValue::Bytes(bytes) => {
                    let i = guard::assert_bytes_index(index, bytes, line)?;
                    let mut out = bytes.clone();
                    let mask = 1u8 << (7 - i % 8);
                    if bit == 1 {
                        out[i / 8] |= mask;
                    } else {
                        out[i / 8] &= !mask;
                    }
                    StackValue::Bytes(out)
                }
            };
            stack.replace_top(3, [out]);
            Ok(())
        }
        Opcode::Getbyte => {
            let args = stack.top_n(2, line)?;
            let bytes = guard::assert_bytes(&args[0], line, None)?;
            let index = guard::assert_uint64(&args[1], line)?;
            let i = guard::check_index_bound(index, bytes, line)?;
            let v = bytes[i] as u64;
            stack.replace_top(2, [StackValue::Uint(v)]);
            Ok(())
        }
        Opcode::Setbyte => {
            let args = stack.top_n(3, line)?;
            let bytes = guard::assert_bytes(&args[0], line, None)?;
            let index = guard::assert_uint64(&args[1], line)?;
            let value = guard::assert_uint64(&args[2], line)?;
            let i = guard::check_index_bound(index, bytes, line)?;
            let byte = guard::assert_uint8(value, line)?;
            let mut out = bytes.to_vec();
            out[i] = byte;
            stack.replace_top(3, [StackValue::Bytes(out)]);
            Ok(())
        }

        other => Err(RuntimeError::InvalidProgram {
            reason: format!("{} is not a byte opcode", other),
            line,
        }),
    }
}

/// Big-endian unsigned integer of `width` bytes at offset B of A
fn extract_uint(stack: &mut Stack, width: u64, line: usize) -> Result<()> {
    let args = stack.top_n(2, line)?;
    let bytes = guard::assert_bytes(&args[0], line, None)?;
    let start = guard::assert_uint64(&args[1], line)?;
    let slice = guard::op_extract_impl(bytes, start, width, line)?;
    let v = be_uint(&slice);
    stack.replace_top(2, [StackValue::Uint(v)]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use teal_spec::Immediate;

    fn run(instr: Instruction, inputs: Vec<StackValue>) -> Result<Vec<StackValue>> {
        let mut stack = Stack::new();
        for v in inputs {
            stack.push(v);
        }
        execute(&instr, &mut stack)?;
        Ok(stack.into_vec())
    }

    fn op(opcode: Opcode) -> Instruction {
        Instruction::simple(opcode, 1)
    }

    fn with(opcode: Opcode, a: u64, b: u64) -> Instruction {
        Instruction::new(opcode, vec![Immediate::Uint(a), Immediate::Uint(b)], 1)
    }

    fn bytes(b: &[u8]) -> StackValue {
        StackValue::Bytes(b.to_vec())
    }

    #[test]
    fn test_hashes() {
        let out = run(op(Opcode::Sha256), vec![bytes(b"")]).unwrap();
        assert_eq!(
            hex::encode(out[0].as_bytes().unwrap()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        let out = run(op(Opcode::Keccak256), vec![bytes(b"")]).unwrap();
        assert_eq!(
            hex::encode(out[0].as_bytes().unwrap()),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        let out = run(op(Opcode::Sha512_256), vec![bytes(b"")]).unwrap();
        assert_eq!(out[0].as_bytes().unwrap().len(), 32);
        assert!(run(op(Opcode::Sha256), vec![StackValue::Uint(1)]).is_err());
    }

    #[test]
    fn test_itob_btoi() {
        let out = run(op(Opcode::Itob), vec![StackValue::Uint(258)]).unwrap();
        assert_eq!(out, vec![bytes(&[0, 0, 0, 0, 0, 0, 1, 2])]);
        assert_eq!(
            run(op(Opcode::Btoi), vec![bytes(&[1, 2])]).unwrap(),
            vec![StackValue::Uint(258)]
        );
        assert_eq!(
            run(op(Opcode::Btoi), vec![bytes(&[])]).unwrap(),
            vec![StackValue::Uint(0)]
        );
        assert_eq!(
            run(op(Opcode::Btoi), vec![bytes(&[0; 9])]).unwrap_err().kind(),
            ErrorKind::LengthViolation
        );
    }

    #[test]
    fn test_concat_limit() {
        let a = bytes(&vec![0; MAX_STRING_SIZE]);
        assert!(run(op(Opcode::Concat), vec![a.clone(), bytes(b"")]).is_ok());
        assert_eq!(
            run(op(Opcode::Concat), vec![a, bytes(b"x")]).unwrap_err().kind(),
            ErrorKind::LengthViolation
        );
    }

    #[test]
    fn test_substring() {
        assert_eq!(
            run(with(Opcode::Substring, 1, 3), vec![bytes(b"hello")]).unwrap(),
            vec![bytes(b"el")]
        );
        assert_eq!(
            run(
                op(Opcode::Substring3),
                vec![bytes(b"hello"), StackValue::Uint(0), StackValue::Uint(5)]
            )
            .unwrap(),
            vec![bytes(b"hello")]
        );
        assert!(run(with(Opcode::Substring, 4, 2), vec![bytes(b"hello")]).is_err());
    }

    #[test]
    fn test_extract() {
        assert_eq!(
            run(with(Opcode::Extract, 1, 3), vec![bytes(b"hello")]).unwrap(),
            vec![bytes(b"ell")]
        );
        assert_eq!(
            run(with(Opcode::Extract, 2, 0), vec![bytes(b"hello")]).unwrap(),
            vec![bytes(b"llo")]
        );
        assert_eq!(
            run(with(Opcode::Extract, 1, 5), vec![bytes(b"hello")])
                .unwrap_err()
                .kind(),
            ErrorKind::RangeError
        );
        assert_eq!(
            run(
                op(Opcode::Extract3),
                vec![bytes(b"hello"), StackValue::Uint(1), StackValue::Uint(0)]
            )
            .unwrap(),
            vec![bytes(b"")]
        );
    }

    #[test]
    fn test_extract_uint() {
        let data = bytes(&[0, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(
            run(op(Opcode::ExtractUint16), vec![data.clone(), StackValue::Uint(1)]).unwrap(),
            vec![StackValue::Uint(0x0102)]
        );
        assert_eq!(
            run(op(Opcode::ExtractUint32), vec![data.clone(), StackValue::Uint(0)]).unwrap(),
            vec![StackValue::Uint(0x00010203)]
        );
        assert_eq!(
            run(op(Opcode::ExtractUint64), vec![data.clone(), StackValue::Uint(1)]).unwrap(),
            vec![StackValue::Uint(0x0102030405060708)]
        );
        assert!(run(op(Opcode::ExtractUint64), vec![data, StackValue::Uint(2)]).is_err());
    }

    #[test]
    fn test_bits() {
        assert_eq!(
            run(op(Opcode::Getbit), vec![StackValue::Uint(4), StackValue::Uint(2)]).unwrap(),
            vec![StackValue::Uint(1)]
        );
        assert_eq!(
            run(op(Opcode::Getbit), vec![bytes(&[0x80]), StackValue::Uint(0)]).unwrap(),
            vec![StackValue::Uint(1)]
        );
        assert_eq!(
            run(
                op(Opcode::Setbit),
                vec![StackValue::Uint(0), StackValue::Uint(3), StackValue::Uint(1)]
            )
            .unwrap(),
            vec![StackValue::Uint(8)]
        );
        assert_eq!(
            run(
                op(Opcode::Setbit),
                vec![bytes(&[0x00, 0x00]), StackValue::Uint(15), StackValue::Uint(1)]
            )
            .unwrap(),
            vec![bytes(&[0x00, 0x01])]
        );
        assert_eq!(
            run(
                op(Opcode::Setbit),
                vec![StackValue::Uint(0), StackValue::Uint(64), StackValue::Uint(1)]
            )
            .unwrap_err()
            .kind(),
            ErrorKind::LengthViolation
        );
        assert_eq!(
            run(
                op(Opcode::Setbit),
                vec![StackValue::Uint(0), StackValue::Uint(1), StackValue::Uint(2)]
            )
            .unwrap_err()
            .kind(),
            ErrorKind::RangeError
        );
    }

    #[test]
    fn test_bytes_get_set() {
        assert_eq!(
            run(op(Opcode::Getbyte), vec![bytes(b"abc"), StackValue::Uint(1)]).unwrap(),
            vec![StackValue::Uint(b'b' as u64)]
        );
        assert_eq!(
            run(
                op(Opcode::Setbyte),
                vec![bytes(b"abc"), StackValue::Uint(0), StackValue::Uint(b'z' as u64)]
            )
            .unwrap(),
            vec![bytes(b"zbc")]
        );
        let err = run(
            op(Opcode::Setbyte),
            vec![bytes(b"abc"), StackValue::Uint(0), StackValue::Uint(300)],
        )
        .unwrap_err();
        assert_eq!(err, RuntimeError::InvalidUint8 { value: 300, line: 1 });
        assert!(run(op(Opcode::Getbyte), vec![bytes(b"abc"), StackValue::Uint(3)]).is_err());
    }
}
