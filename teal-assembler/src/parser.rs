//! Assembly parser
//!
//! Source is split into lines of tokens, and each line parses into zero or
//! more [`Item`]s: a version pragma, a label definition, an instruction.
//! Immediates are read according to the opcode's [`ImmediateLayout`].

use crate::error::{AssemblerError, Result};
use crate::lexer::Token;
use base64::Engine;
use logos::Logos;
use teal_spec::{Immediate, ImmediateLayout, Instruction, Opcode};

/// A token and its 1-based column
pub type Spanned = (Token, usize);

/// One parsed element of a source line
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Pragma(u64),
    Label(String),
    Instruction(Instruction),
}

/// Split source into lines of tokens; index `i` holds line `i + 1`
pub fn tokenize(source: &str) -> Result<Vec<Vec<Spanned>>> {
    let mut lines = vec![Vec::new()];
    let mut line_start = 0;
    for (token, span) in Token::lexer(source).spanned() {
        let column = span.start - line_start + 1;
        match token {
            Ok(Token::Newline) => {
                lines.push(Vec::new());
                line_start = span.end;
            }
            Ok(token) => {
                if let Some(current) = lines.last_mut() {
                    current.push((token, column));
                }
            }
            Err(()) => {
                return Err(AssemblerError::SyntaxError {
                    line: lines.len(),
                    column,
                    message: format!("invalid token {}", &source[span]),
                })
            }
        }
    }

    Ok(lines)
}

/// Parse a single instruction from assembly text
pub fn parse_instruction(text: &str) -> Result<Instruction> {
    let lines = tokenize(text)?;
    let tokens = lines.first().map(Vec::as_slice).unwrap_or(&[]);
    let mut cursor = Cursor::new(tokens, 1);
    instruction(&mut cursor)
}

/// Parse one line of tokens
pub fn parse_line(tokens: &[Spanned], line: usize) -> Result<Vec<Item>> {
    let mut cursor = Cursor::new(tokens, line);
    let mut items = Vec::new();

    match cursor.peek() {
        None => return Ok(items),
        Some(Token::Pragma) => {
            items.push(Item::Pragma(pragma(&mut cursor)?));
            return Ok(items);
        }
        Some(Token::Word(w)) if w.len() > 1 && w.ends_with(':') => {
            items.push(Item::Label(w[..w.len() - 1].to_string()));
            cursor.advance();
        }
        Some(_) => {}
    }

    if !cursor.is_empty() {
        items.push(Item::Instruction(instruction(&mut cursor)?));
    }
    Ok(items)
}

/// Parse an unsigned integer: decimal or `0x` hex
pub fn parse_uint(word: &str) -> Option<u64> {
    match word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => word.parse().ok(),
    }
}

/// Named integer constants accepted by `int`: transaction types and
/// application call completion actions
pub fn named_int(word: &str) -> Option<u64> {
    let value = match word {
        "unknown" => 0,
        "pay" => 1,
        "keyreg" => 2,
        "acfg" => 3,
        "axfer" => 4,
        "afrz" => 5,
        "appl" => 6,
        "NoOp" => 0,
        "OptIn" => 1,
        "CloseOut" => 2,
        "ClearState" => 3,
        "UpdateApplication" => 4,
        "DeleteApplication" => 5,
        _ => return None,
    };
    Some(value)
}

struct Cursor<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Spanned], line: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        let tokens = self.tokens;
        tokens.get(self.pos).map(|(t, _)| t)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn remaining(&self) -> usize {
        self.tokens.len().saturating_sub(self.pos)
    }

    /// Column of the next token, or one past the last
    fn column(&self) -> usize {
        match self.tokens.get(self.pos) {
            Some((_, col)) => *col,
            None => self.tokens.last().map(|(_, col)| col + 1).unwrap_or(1),
        }
    }

    fn syntax(&self, message: impl Into<String>) -> AssemblerError {
        AssemblerError::SyntaxError {
            line: self.line,
            column: self.column(),
            message: message.into(),
        }
    }

    fn invalid(&self, column: usize, message: impl Into<String>) -> AssemblerError {
        AssemblerError::InvalidImmediate {
            line: self.line,
            column,
            message: message.into(),
        }
    }

    fn next(&mut self) -> Option<(&'a Token, usize)> {
        let tokens = self.tokens;
        let item = tokens.get(self.pos)?;
        self.pos += 1;
        Some((&item.0, item.1))
    }

    fn word(&mut self, what: &str) -> Result<(&'a str, usize)> {
        let tokens = self.tokens;
        match tokens.get(self.pos) {
            Some((Token::Word(w), col)) => {
                self.pos += 1;
                Ok((w.as_str(), *col))
            }
            Some(_) => Err(self.syntax(format!("expected {}", what))),
            None => Err(self.syntax(format!("missing {}", what))),
        }
    }

    fn uint(&mut self) -> Result<u64> {
        let (w, col) = self.word("integer")?;
        parse_uint(w).ok_or_else(|| self.invalid(col, format!("{} is not a uint64", w)))
    }

    /// Integer or named constant (`int pay`, `int OptIn`)
    fn int_constant(&mut self) -> Result<u64> {
        let (w, col) = self.word("integer")?;
        parse_uint(w)
            .or_else(|| named_int(w))
            .ok_or_else(|| self.invalid(col, format!("{} is not a uint64 or named constant", w)))
    }

    fn bytes(&mut self) -> Result<Vec<u8>> {
        let column = self.column();
        let word = match self.next() {
            Some((Token::Str(b), _)) => return Ok(b.clone()),
            Some((Token::Word(w), _)) => w.as_str(),
            Some(_) => return Err(self.syntax("expected byte literal")),
            None => return Err(self.syntax("missing byte literal")),
        };

        if let Some(digits) = word.strip_prefix("0x") {
            return hex::decode(digits).map_err(|e| self.invalid(column, format!("hex: {}", e)));
        }
        if let Some((encoding, payload)) = parenthesized(word) {
            return self.decode(encoding, payload, column);
        }
        match word {
            "base64" | "b64" | "base16" | "b16" => {
                let (payload, col) = self.word("encoded payload")?;
                self.decode(word, payload, col)
            }
            "addr" => Err(AssemblerError::Unsupported {
                feature: "addr literal".to_string(),
                line: self.line,
            }),
            other => Err(self.invalid(column, format!("{} is not a byte literal", other))),
        }
    }

    fn decode(&self, encoding: &str, payload: &str, column: usize) -> Result<Vec<u8>> {
        match encoding {
            "base64" | "b64" => base64::engine::general_purpose::STANDARD
                .decode(payload)
                .map_err(|e| self.invalid(column, format!("base64: {}", e))),
            "base16" | "b16" => {
                hex::decode(payload).map_err(|e| self.invalid(column, format!("base16: {}", e)))
            }
            other => Err(self.invalid(column, format!("unknown encoding {}", other))),
        }
    }
}

/// Split `base64(...)` style literals into encoding and payload
fn parenthesized(word: &str) -> Option<(&str, &str)> {
    let (encoding, rest) = word.split_once('(')?;
    let payload = rest.strip_suffix(')')?;
    Some((encoding, payload))
}

fn pragma(cursor: &mut Cursor<'_>) -> Result<u64> {
    let line = cursor.line;
    cursor.advance();
    let invalid = |message: &str| AssemblerError::InvalidPragma {
        line,
        message: message.to_string(),
    };

    let (key, _) = cursor.word("pragma name").map_err(|_| invalid("expected `version`"))?;
    if key != "version" {
        return Err(invalid("only `#pragma version` is supported"));
    }
    let (value, _) = cursor.word("version number").map_err(|_| invalid("missing version"))?;
    let version = parse_uint(value).ok_or_else(|| invalid("version is not a number"))?;
    if !cursor.is_empty() {
        return Err(invalid("trailing tokens"));
    }
    Ok(version)
}

fn instruction(cursor: &mut Cursor<'_>) -> Result<Instruction> {
    let line = cursor.line;
    let (mnemonic, _) = cursor.word("instruction")?;
    let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| {
        AssemblerError::UnknownInstruction {
            mnemonic: mnemonic.to_string(),
            line,
        }
    })?;

    // `txn Accounts 1` is shorthand for `txna Accounts 1`
    let opcode = match (opcode, cursor.remaining()) {
        (Opcode::Txn, 2) => Opcode::Txna,
        (Opcode::Gtxn, 3) => Opcode::Gtxna,
        (Opcode::Gtxns, 2) => Opcode::Gtxnsa,
        (Opcode::Itxn, 2) => Opcode::Itxna,
        (op, _) => op,
    };

    let field = |cursor: &mut Cursor<'_>| -> Result<Immediate> {
        Ok(Immediate::Field(cursor.word("field name")?.0.to_string()))
    };

    let mut immediates = Vec::new();
    match opcode.immediates() {
        ImmediateLayout::None => {}
        ImmediateLayout::Uint => {
            let value = if matches!(opcode, Opcode::Int | Opcode::PushInt) {
                cursor.int_constant()?
            } else {
                cursor.uint()?
            };
            immediates.push(Immediate::Uint(value));
        }
        ImmediateLayout::UintUint => {
            immediates.push(Immediate::Uint(cursor.uint()?));
            immediates.push(Immediate::Uint(cursor.uint()?));
        }
        ImmediateLayout::Bytes => immediates.push(Immediate::Bytes(cursor.bytes()?)),
        ImmediateLayout::UintList => {
            while !cursor.is_empty() {
                immediates.push(Immediate::Uint(cursor.int_constant()?));
            }
        }
        ImmediateLayout::BytesList => {
            while !cursor.is_empty() {
                immediates.push(Immediate::Bytes(cursor.bytes()?));
            }
        }
        ImmediateLayout::Field => immediates.push(field(cursor)?),
        ImmediateLayout::FieldUint => {
            immediates.push(field(cursor)?);
            immediates.push(Immediate::Uint(cursor.uint()?));
        }
        ImmediateLayout::UintField => {
            immediates.push(Immediate::Uint(cursor.uint()?));
            immediates.push(field(cursor)?);
        }
        ImmediateLayout::UintFieldUint => {
            immediates.push(Immediate::Uint(cursor.uint()?));
            immediates.push(field(cursor)?);
            immediates.push(Immediate::Uint(cursor.uint()?));
        }
        ImmediateLayout::Label => {
            immediates.push(Immediate::Label(cursor.word("label")?.0.to_string()));
        }
    }

    if !cursor.is_empty() {
        return Err(cursor.syntax(format!("unexpected operand after {}", mnemonic)));
    }

    Ok(Instruction::new(opcode, immediates, line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imm_uint(v: u64) -> Immediate {
        Immediate::Uint(v)
    }

    #[test]
    fn test_parse_simple() {
        let instr = parse_instruction("+").unwrap();
        assert_eq!(instr, Instruction::simple(Opcode::Add, 1));
        assert_eq!(parse_instruction("sha512_256").unwrap().opcode, Opcode::Sha512_256);
    }

    #[test]
    fn test_parse_int_forms() {
        assert_eq!(parse_instruction("int 42").unwrap().immediates, vec![imm_uint(42)]);
        assert_eq!(parse_instruction("int 0xff").unwrap().immediates, vec![imm_uint(255)]);
        assert_eq!(parse_instruction("int appl").unwrap().immediates, vec![imm_uint(6)]);
        assert_eq!(parse_instruction("int OptIn").unwrap().immediates, vec![imm_uint(1)]);
        assert!(matches!(
            parse_instruction("int 18446744073709551616"),
            Err(AssemblerError::InvalidImmediate { column: 5, .. })
        ));
        // named constants are only for `int`
        assert!(parse_instruction("load pay").is_err());
    }

    #[test]
    fn test_parse_byte_forms() {
        let bytes = |src: &str| parse_instruction(src).unwrap().bytes(0).unwrap().to_vec();
        assert_eq!(bytes("byte 0x0102"), vec![1, 2]);
        assert_eq!(bytes("byte 0x"), Vec::<u8>::new());
        assert_eq!(bytes(r#"byte "hi""#), b"hi".to_vec());
        assert_eq!(bytes("byte base64 aGk="), b"hi".to_vec());
        assert_eq!(bytes("byte b64(aGk=)"), b"hi".to_vec());
        assert_eq!(bytes("byte base16 6869"), b"hi".to_vec());
        assert_eq!(bytes("pushbytes b16(6869)"), b"hi".to_vec());

        assert!(parse_instruction("byte 0x123").is_err());
        assert!(parse_instruction("byte base64").is_err());
        assert!(matches!(
            parse_instruction("byte addr AAAA"),
            Err(AssemblerError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_parse_blocks() {
        let instr = parse_instruction(r#"bytecblock 0x01 "a" base64 AA=="#).unwrap();
        assert_eq!(
            instr.bytes_list().unwrap(),
            vec![vec![1], b"a".to_vec(), vec![0]]
        );
        let instr = parse_instruction("intcblock 1 2 pay").unwrap();
        assert_eq!(instr.uint_list().unwrap(), vec![1, 2, 1]);
    }

    #[test]
    fn test_parse_txn_shorthand() {
        let instr = parse_instruction("txn Accounts 1").unwrap();
        assert_eq!(instr.opcode, Opcode::Txna);
        assert_eq!(instr.field(0).unwrap(), "Accounts");
        assert_eq!(instr.uint(1).unwrap(), 1);

        assert_eq!(parse_instruction("gtxn 0 Accounts 1").unwrap().opcode, Opcode::Gtxna);
        assert_eq!(parse_instruction("gtxn 0 Sender").unwrap().opcode, Opcode::Gtxn);
        assert_eq!(parse_instruction("gtxns ApplicationArgs 0").unwrap().opcode, Opcode::Gtxnsa);
        assert_eq!(parse_instruction("itxn Logs 0").unwrap().opcode, Opcode::Itxna);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_instruction("frobnicate"),
            Err(AssemblerError::UnknownInstruction { .. })
        ));
        assert!(matches!(
            parse_instruction("pop 1"),
            Err(AssemblerError::SyntaxError { column: 5, .. })
        ));
        assert!(matches!(
            parse_instruction("extract 1"),
            Err(AssemblerError::SyntaxError { .. })
        ));
    }

    #[test]
    fn test_parse_line_label() {
        let tokens = &tokenize("loop: int 1").unwrap()[0];
        let items = parse_line(tokens, 3).unwrap();
        assert_eq!(items[0], Item::Label("loop".to_string()));
        assert!(matches!(&items[1], Item::Instruction(i) if i.line == 3));
    }

    #[test]
    fn test_parse_pragma() {
        let tokens = &tokenize("#pragma version 4").unwrap()[0];
        assert_eq!(parse_line(tokens, 1).unwrap(), vec![Item::Pragma(4)]);

        let tokens = &tokenize("#pragma mode 4").unwrap()[0];
        assert!(matches!(
            parse_line(tokens, 1),
            Err(AssemblerError::InvalidPragma { .. })
        ));
    }

    #[test]
    fn test_tokenize_lines() {
        let lines = tokenize("int 1\n\n  // note\nint 2").unwrap();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].is_empty());
        assert!(lines[2].is_empty());
        assert_eq!(lines[3][1], (Token::Word("2".to_string()), 5));
    }

    #[test]
    fn test_tokenize_error_position() {
        let err = tokenize("int 1\nbyte \"\\q\"").unwrap_err();
        assert!(matches!(err, AssemblerError::SyntaxError { line: 2, column: 6, .. }));
    }
}
