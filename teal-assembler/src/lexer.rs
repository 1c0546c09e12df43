//! # Lexer for TEAL Assembly
//!
//! TEAL source is line oriented and whitespace separated. Apart from quoted
//! strings, comments and the version pragma, every token is a bare word;
//! the parser decides from the opcode's immediate layout whether a word is
//! a number, a field, a label or a byte literal.

use logos::Logos;

/// Tokens for TEAL assembly
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    /// `#pragma` directive
    #[token("#pragma")]
    Pragma,

    /// Quoted string with escapes decoded
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    Str(Vec<u8>),

    /// Mnemonics, numbers, field names, labels, encoded byte payloads
    #[regex(r#"[^ \t\r\n"]+"#, |lex| lex.slice().to_string())]
    Word(String),

    /// Newline
    #[token("\n")]
    Newline,
}

/// Decode a quoted string literal, including the surrounding quotes.
/// Supports `\n \r \t \0 \\ \"` and `\xHH`.
pub fn unescape(quoted: &str) -> Option<Vec<u8>> {
    let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next()? {
            'n' => out.push(b'\n'),
            'r' => out.push(b'\r'),
            't' => out.push(b'\t'),
            '0' => out.push(0),
            '\\' => out.push(b'\\'),
            '"' => out.push(b'"'),
            'x' => {
                let hi = chars.next()?.to_digit(16)?;
                let lo = chars.next()?.to_digit(16)?;
                out.push((hi * 16 + lo) as u8);
            }
            _ => return None,
        }
    }
    Some(out)
}
