//! # Stack Values for TEAL
//!
//! Every slot on the operand stack, in scratch space, and in application
//! state holds one of two tagged values: an unsigned 64-bit integer or a
//! byte string. Opcodes pattern-match on the tag; there is no coercion
//! between the two.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tagged TEAL value
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StackValue {
    /// Unsigned 64-bit integer
    Uint(u64),
    /// Arbitrary-length byte string
    Bytes(Vec<u8>),
}

/// The tag of a [`StackValue`], used when reporting type mismatches
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StackType {
    Uint64,
    Bytes,
}

impl StackType {
    /// Name as it appears in TEAL documentation and diagnostics
    pub fn name(self) -> &'static str {
        match self {
            StackType::Uint64 => "uint64",
            StackType::Bytes => "byte[]",
        }
    }
}

impl fmt::Display for StackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl StackValue {
    /// The zero value scratch slots and missing state start from
    pub const ZERO: StackValue = StackValue::Uint(0);

    pub fn stack_type(&self) -> StackType {
        match self {
            StackValue::Uint(_) => StackType::Uint64,
            StackValue::Bytes(_) => StackType::Bytes,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.stack_type().name()
    }

    pub fn is_uint(&self) -> bool {
        matches!(self, StackValue::Uint(_))
    }

    pub fn is_bytes(&self) -> bool {
        matches!(self, StackValue::Bytes(_))
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            StackValue::Uint(v) => Some(*v),
            StackValue::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            StackValue::Bytes(b) => Some(b),
            StackValue::Uint(_) => None,
        }
    }

    /// Build a boolean result the way comparison opcodes push it
    pub fn from_bool(ok: bool) -> Self {
        StackValue::Uint(ok as u64)
    }
}

impl From<u64> for StackValue {
    fn from(value: u64) -> Self {
        StackValue::Uint(value)
    }
}

impl From<Vec<u8>> for StackValue {
    fn from(value: Vec<u8>) -> Self {
        StackValue::Bytes(value)
    }
}

impl From<&[u8]> for StackValue {
    fn from(value: &[u8]) -> Self {
        StackValue::Bytes(value.to_vec())
    }
}

impl From<&str> for StackValue {
    fn from(value: &str) -> Self {
        StackValue::Bytes(value.as_bytes().to_vec())
    }
}

impl fmt::Display for StackValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackValue::Uint(v) => write!(f, "{}", v),
            StackValue::Bytes(b) => {
                f.write_str("0x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}
