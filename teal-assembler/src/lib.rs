//! TEAL Assembler
//!
//! Assemble TEAL source into decoded instruction streams.
//!
//! Supported syntax: `#pragma version N`, `name:` labels, `//` comments,
//! integer immediates in decimal or `0x` hex (plus named constants such as
//! `pay` and `OptIn` for `int`), and byte literals as `0x` hex, quoted
//! strings with escapes, `base64`/`b64` and `base16`/`b16`.
//!
//! ## Example
//!
//! ```rust
//! use teal_assembler::assemble;
//!
//! let source = r#"
//!     #pragma version 5
//!     byte "hello"
//!     extract 1 3
//!     len
//! "#;
//!
//! let program = assemble(source).unwrap();
//! assert_eq!(program.version, 5);
//! ```

pub mod error;
pub mod lexer;
pub mod parser;
pub mod assembler;

pub use error::{AssemblerError, Result};
pub use assembler::{assemble, assemble_to_bytes, DEFAULT_VERSION};
pub use parser::{parse_instruction, parse_uint};
