//! # TEAL Opcode Definitions
//!
//! Opcodes are identified by their TEAL mnemonic. Each opcode carries the
//! first language version that accepts it, its execution cost and the
//! execution mode it is restricted to.
//!
//! ## Opcode Families
//!
//! - Crypto: `sha256`, `keccak256`, `sha512_256`
//! - Arithmetic and logic: `+ - / * % < > <= >= && || == != ! ~ | & ^`,
//!   `mulw`, `addw`, `divmodw`, `exp`, `expw`, `shl`, `shr`, `sqrt`, `bitlen`
//! - Byte strings: `len`, `itob`, `btoi`, `concat`, `substring*`,
//!   `extract*`, `getbit`, `setbit`, `getbyte`, `setbyte`
//! - Constants: `int`, `byte`, `intc*`, `bytec*`, `pushint`, `pushbytes`, `arg*`
//! - Flow: `err`, `bnz`, `bz`, `b`, `return`, `assert`, `callsub`, `retsub`
//! - Stack: `pop`, `dup`, `dup2`, `dig`, `swap`, `select`, `cover`, `uncover`
//! - Ledger: `txn*`, `gtxn*`, `global`, `load`, `store`, `balance`,
//!   `app_*`, `log`, `itxn*`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution mode a program runs in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Stateless logic signature
    Signature,
    /// Stateful application call
    Application,
}

impl ExecutionMode {
    pub fn name(self) -> &'static str {
        match self {
            ExecutionMode::Signature => "Signature",
            ExecutionMode::Application => "Application",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which execution modes accept an opcode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpcodeMode {
    Any,
    SignatureOnly,
    ApplicationOnly,
}

impl OpcodeMode {
    pub fn allows(self, mode: ExecutionMode) -> bool {
        match self {
            OpcodeMode::Any => true,
            OpcodeMode::SignatureOnly => mode == ExecutionMode::Signature,
            OpcodeMode::ApplicationOnly => mode == ExecutionMode::Application,
        }
    }
}

/// Immediate operand layout for an opcode, used by the assembler and the
/// disassembler
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImmediateLayout {
    /// No immediates
    None,
    /// One unsigned integer (`int 5`, `load 3`, `dig 1`)
    Uint,
    /// Two unsigned integers (`substring 0 4`, `extract 1 2`)
    UintUint,
    /// One byte-string literal (`byte 0x01`)
    Bytes,
    /// A list of unsigned integers (`intcblock 1 2 3`)
    UintList,
    /// A list of byte-string literals (`bytecblock 0x01 "a"`)
    BytesList,
    /// A field name (`txn Sender`)
    Field,
    /// A field name and an array index (`txna Accounts 1`)
    FieldUint,
    /// A group index and a field name (`gtxn 0 Amount`)
    UintField,
    /// A group index, a field name and an array index (`gtxna 0 Accounts 1`)
    UintFieldUint,
    /// A branch label (`bnz done`)
    Label,
}

/// TEAL opcode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // ========== Flow ==========
    /// err: fail immediately
    Err,

    // ========== Crypto ==========
    /// sha256: SHA-256 of A
    Sha256,
    /// keccak256: Keccak-256 of A
    Keccak256,
    /// sha512_256: SHA-512/256 of A
    Sha512_256,

    // ========== Arithmetic ==========
    /// +: A + B, fails on overflow
    Add,
    /// -: A - B, fails on underflow
    Sub,
    /// /: A / B, fails if B == 0
    Div,
    /// *: A * B, fails on overflow
    Mul,
    /// <: A < B
    Lt,
    /// >: A > B
    Gt,
    /// <=: A <= B
    Le,
    /// >=: A >= B
    Ge,
    /// &&: A != 0 && B != 0
    And,
    /// ||: A != 0 || B != 0
    Or,
    /// ==: A == B, operands must share a type
    Eq,
    /// !=: A != B, operands must share a type
    Neq,
    /// !: A == 0
    Not,
    /// len: length of byte string A
    Len,
    /// itob: big-endian 8-byte encoding of A
    Itob,
    /// btoi: big-endian decode of at most 8 bytes
    Btoi,
    /// %: A % B, fails if B == 0
    Mod,
    /// |: A | B
    BitOr,
    /// &: A & B
    BitAnd,
    /// ^: A ^ B
    BitXor,
    /// ~: bitwise inverse of A
    BitNot,
    /// mulw: 128-bit product of A and B as (high, low)
    Mulw,
    /// addw: 128-bit sum of A and B as (carry, low)
    Addw,
    /// divmodw: 128-bit division (A:B) / (C:D) with remainder
    Divmodw,

    // ========== Constants ==========
    /// int: push an integer literal
    Int,
    /// byte: push a byte-string literal
    Byte,
    /// intcblock: load the integer constant block
    Intcblock,
    /// intc: push integer constant N
    Intc,
    Intc0,
    Intc1,
    Intc2,
    Intc3,
    /// bytecblock: load the byte constant block
    Bytecblock,
    /// bytec: push byte constant N
    Bytec,
    Bytec0,
    Bytec1,
    Bytec2,
    Bytec3,
    /// arg: push logic-signature argument N
    Arg,
    Arg0,
    Arg1,
    Arg2,
    Arg3,
    /// pushbytes: push an inline byte-string literal
    PushBytes,
    /// pushint: push an inline integer literal
    PushInt,

    // ========== Transaction and Global ==========
    /// txn F: field F of the current transaction
    Txn,
    /// global F: global field F
    Global,
    /// gtxn T F: field F of transaction T in the group
    Gtxn,
    /// txna F I: element I of array field F
    Txna,
    /// gtxna T F I: element I of array field F of transaction T
    Gtxna,
    /// gtxns F: field F of transaction A
    Gtxns,
    /// gtxnsa F I: element I of array field F of transaction A
    Gtxnsa,

    // ========== Scratch ==========
    /// load I: push scratch slot I
    Load,
    /// store I: pop into scratch slot I
    Store,

    // ========== Branching ==========
    /// bnz L: branch if A != 0
    Bnz,
    /// bz L: branch if A == 0
    Bz,
    /// b L: unconditional branch
    B,
    /// return: end with A as the result
    Return,
    /// assert: fail unless A != 0
    Assert,
    /// callsub L: call subroutine
    Callsub,
    /// retsub: return from subroutine
    Retsub,

    // ========== Stack ==========
    /// pop: discard A
    Pop,
    /// dup: duplicate A
    Dup,
    /// dup2: duplicate A and B
    Dup2,
    /// dig N: copy the Nth value from the top
    Dig,
    /// swap: swap A and B
    Swap,
    /// select: C != 0 ? B : A
    Select,
    /// cover N: move the top value below the next N values
    Cover,
    /// uncover N: move the value N deep to the top
    Uncover,

    // ========== Byte Strings ==========
    /// concat: A ++ B
    Concat,
    /// substring S E: A[S..E]
    Substring,
    /// substring3: A[B..C]
    Substring3,
    /// getbit: bit B of A
    Getbit,
    /// setbit: A with bit B set to C
    Setbit,
    /// getbyte: byte B of A
    Getbyte,
    /// setbyte: A with byte B set to C
    Setbyte,
    /// extract S L: A[S..S+L], L == 0 means to the end
    Extract,
    /// extract3: A[B..B+C]
    Extract3,
    /// extract_uint16: big-endian uint16 at offset B
    ExtractUint16,
    /// extract_uint32: big-endian uint32 at offset B
    ExtractUint32,
    /// extract_uint64: big-endian uint64 at offset B
    ExtractUint64,

    // ========== Extended Arithmetic ==========
    /// shl: A << B, truncated to 64 bits
    Shl,
    /// shr: A >> B
    Shr,
    /// sqrt: integer square root of A
    Sqrt,
    /// bitlen: highest set bit of A plus one
    Bitlen,
    /// exp: A ** B, fails on overflow and on 0 ** 0
    Exp,
    /// expw: 128-bit A ** B as (high, low)
    Expw,

    // ========== Application State ==========
    /// balance: microalgo balance of account A
    Balance,
    /// min_balance: minimum balance of account A
    MinBalance,
    /// app_opted_in: whether account A opted in to application B
    AppOptedIn,
    /// app_local_get: local state key B of account A in the current app
    AppLocalGet,
    /// app_local_get_ex: local state key C of account A in app B, with existence flag
    AppLocalGetEx,
    /// app_global_get: global state key A of the current app
    AppGlobalGet,
    /// app_global_get_ex: global state key B of app A, with existence flag
    AppGlobalGetEx,
    /// app_local_put: set local state key B of account A to C
    AppLocalPut,
    /// app_global_put: set global state key A to B
    AppGlobalPut,
    /// app_local_del: delete local state key B of account A
    AppLocalDel,
    /// app_global_del: delete global state key A
    AppGlobalDel,

    // ========== Logging and Inner Transactions ==========
    /// log: append A to the application log
    Log,
    /// itxn_begin: start building an inner transaction
    ItxnBegin,
    /// itxn_field F: set field F of the pending inner transaction
    ItxnField,
    /// itxn_submit: submit the pending inner transaction
    ItxnSubmit,
    /// itxn F: field F of the last submitted inner transaction
    Itxn,
    /// itxna F I: element I of array field F of the last inner transaction
    Itxna,
}

impl Opcode {
    /// Every opcode, in declaration order
    pub const ALL: &'static [Opcode] = &[
        Opcode::Err,
        Opcode::Sha256,
        Opcode::Keccak256,
        Opcode::Sha512_256,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Div,
        Opcode::Mul,
        Opcode::Lt,
        Opcode::Gt,
        Opcode::Le,
        Opcode::Ge,
        Opcode::And,
        Opcode::Or,
        Opcode::Eq,
        Opcode::Neq,
        Opcode::Not,
        Opcode::Len,
        Opcode::Itob,
        Opcode::Btoi,
        Opcode::Mod,
        Opcode::BitOr,
        Opcode::BitAnd,
        Opcode::BitXor,
        Opcode::BitNot,
        Opcode::Mulw,
        Opcode::Addw,
        Opcode::Divmodw,
        Opcode::Int,
        Opcode::Byte,
        Opcode::Intcblock,
        Opcode::Intc,
        Opcode::Intc0,
        Opcode::Intc1,
        Opcode::Intc2,
        Opcode::Intc3,
        Opcode::Bytecblock,
        Opcode::Bytec,
        Opcode::Bytec0,
        Opcode::Bytec1,
        Opcode::Bytec2,
        Opcode::Bytec3,
        Opcode::Arg,
        Opcode::Arg0,
        Opcode::Arg1,
        Opcode::Arg2,
        Opcode::Arg3,
        Opcode::PushBytes,
        Opcode::PushInt,
        Opcode::Txn,
        Opcode::Global,
        Opcode::Gtxn,
        Opcode::Txna,
        Opcode::Gtxna,
        Opcode::Gtxns,
        Opcode::Gtxnsa,
        Opcode::Load,
        Opcode::Store,
        Opcode::Bnz,
        Opcode::Bz,
        Opcode::B,
        Opcode::Return,
        Opcode::Assert,
        Opcode::Callsub,
        Opcode::Retsub,
        Opcode::Pop,
        Opcode::Dup,
        Opcode::Dup2,
        Opcode::Dig,
        Opcode::Swap,
        Opcode::Select,
        Opcode::Cover,
        Opcode::Uncover,
        Opcode::Concat,
        Opcode::Substring,
        Opcode::Substring3,
        Opcode::Getbit,
        Opcode::Setbit,
        Opcode::Getbyte,
        Opcode::Setbyte,
        Opcode::Extract,
        Opcode::Extract3,
        Opcode::ExtractUint16,
        Opcode::ExtractUint32,
        Opcode::ExtractUint64,
        Opcode::Shl,
        Opcode::Shr,
        Opcode::Sqrt,
        Opcode::Bitlen,
        Opcode::Exp,
        Opcode::Expw,
        Opcode::Balance,
        Opcode::MinBalance,
        Opcode::AppOptedIn,
        Opcode::AppLocalGet,
        Opcode::AppLocalGetEx,
        Opcode::AppGlobalGet,
        Opcode::AppGlobalGetEx,
        Opcode::AppLocalPut,
        Opcode::AppGlobalPut,
        Opcode::AppLocalDel,
        Opcode::AppGlobalDel,
        Opcode::Log,
        Opcode::ItxnBegin,
        Opcode::ItxnField,
        Opcode::ItxnSubmit,
        Opcode::Itxn,
        Opcode::Itxna,
    ];

    /// TEAL mnemonic
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Err => "err",
            Opcode::Sha256 => "sha256",
            Opcode::Keccak256 => "keccak256",
            Opcode::Sha512_256 => "sha512_256",
            Opcode::Add => "+",
            Opcode::Sub => "-",
            Opcode::Div => "/",
            Opcode::Mul => "*",
            Opcode::Lt => "<",
            Opcode::Gt => ">",
            Opcode::Le => "<=",
            Opcode::Ge => ">=",
            Opcode::And => "&&",
            Opcode::Or => "||",
            Opcode::Eq => "==",
            Opcode::Neq => "!=",
            Opcode::Not => "!",
            Opcode::Len => "len",
            Opcode::Itob => "itob",
            Opcode::Btoi => "btoi",
            Opcode::Mod => "%",
            Opcode::BitOr => "|",
            Opcode::BitAnd => "&",
            Opcode::BitXor => "^",
            Opcode::BitNot => "~",
            Opcode::Mulw => "mulw",
            Opcode::Addw => "addw",
            Opcode::Divmodw => "divmodw",
            Opcode::Int => "int",
            Opcode::Byte => "byte",
            Opcode::Intcblock => "intcblock",
            Opcode::Intc => "intc",
            Opcode::Intc0 => "intc_0",
            Opcode::Intc1 => "intc_1",
            Opcode::Intc2 => "intc_2",
            Opcode::Intc3 => "intc_3",
            Opcode::Bytecblock => "bytecblock",
            Opcode::Bytec => "bytec",
            Opcode::Bytec0 => "bytec_0",
            Opcode::Bytec1 => "bytec_1",
            Opcode::Bytec2 => "bytec_2",
            Opcode::Bytec3 => "bytec_3",
            Opcode::Arg => "arg",
            Opcode::Arg0 => "arg_0",
            Opcode::Arg1 => "arg_1",
            Opcode::Arg2 => "arg_2",
            Opcode::Arg3 => "arg_3",
            Opcode::PushBytes => "pushbytes",
            Opcode::PushInt => "pushint",
            Opcode::Txn => "txn",
            Opcode::Global => "global",
            Opcode::Gtxn => "gtxn",
            Opcode::Txna => "txna",
            Opcode::Gtxna => "gtxna",
            Opcode::Gtxns => "gtxns",
            Opcode::Gtxnsa => "gtxnsa",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::Bnz => "bnz",
            Opcode::Bz => "bz",
            Opcode::B => "b",
            Opcode::Return => "return",
            Opcode::Assert => "assert",
            Opcode::Callsub => "callsub",
            Opcode::Retsub => "retsub",
            Opcode::Pop => "pop",
            Opcode::Dup => "dup",
            Opcode::Dup2 => "dup2",
            Opcode::Dig => "dig",
            Opcode::Swap => "swap",
            Opcode::Select => "select",
            Opcode::Cover => "cover",
            Opcode::Uncover => "uncover",
            Opcode::Concat => "concat",
            Opcode::Substring => "substring",
            Opcode::Substring3 => "substring3",
            Opcode::Getbit => "getbit",
            Opcode::Setbit => "setbit",
            Opcode::Getbyte => "getbyte",
            Opcode::Setbyte => "setbyte",
            Opcode::Extract => "extract",
            Opcode::Extract3 => "extract3",
            Opcode::ExtractUint16 => "extract_uint16",
            Opcode::ExtractUint32 => "extract_uint32",
            Opcode::ExtractUint64 => "extract_uint64",
            Opcode::Shl => "shl",
            Opcode::Shr => "shr",
            Opcode::Sqrt => "sqrt",
            Opcode::Bitlen => "bitlen",
            Opcode::Exp => "exp",
            Opcode::Expw => "expw",
            Opcode::Balance => "balance",
            Opcode::MinBalance => "min_balance",
            Opcode::AppOptedIn => "app_opted_in",
            Opcode::AppLocalGet => "app_local_get",
            Opcode::AppLocalGetEx => "app_local_get_ex",
            Opcode::AppGlobalGet => "app_global_get",
            Opcode::AppGlobalGetEx => "app_global_get_ex",
            Opcode::AppLocalPut => "app_local_put",
            Opcode::AppGlobalPut => "app_global_put",
            Opcode::AppLocalDel => "app_local_del",
            Opcode::AppGlobalDel => "app_global_del",
            Opcode::Log => "log",
            Opcode::ItxnBegin => "itxn_begin",
            Opcode::ItxnField => "itxn_field",
            Opcode::ItxnSubmit => "itxn_submit",
            Opcode::Itxn => "itxn",
            Opcode::Itxna => "itxna",
        }
    }

    /// Look up an opcode by mnemonic
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.mnemonic() == mnemonic)
    }

    /// First TEAL version accepting this opcode
    pub fn min_version(self) -> u64 {
        match self {
            Opcode::Addw
            | Opcode::Txna
            | Opcode::Gtxna
            | Opcode::Bz
            | Opcode::B
            | Opcode::Return
            | Opcode::Dup2
            | Opcode::Concat
            | Opcode::Substring
            | Opcode::Substring3
            | Opcode::Balance
            | Opcode::AppOptedIn
            | Opcode::AppLocalGet
            | Opcode::AppLocalGetEx
            | Opcode::AppGlobalGet
            | Opcode::AppGlobalGetEx
            | Opcode::AppLocalPut
            | Opcode::AppGlobalPut
            | Opcode::AppLocalDel
            | Opcode::AppGlobalDel => 2,

            Opcode::Gtxns
            | Opcode::Gtxnsa
            | Opcode::Assert
            | Opcode::Dig
            | Opcode::Swap
            | Opcode::Select
            | Opcode::Getbit
            | Opcode::Setbit
            | Opcode::Getbyte
            | Opcode::Setbyte
            | Opcode::MinBalance
            | Opcode::PushBytes
            | Opcode::PushInt => 3,

            Opcode::Divmodw
            | Opcode::Callsub
            | Opcode::Retsub
            | Opcode::Shl
            | Opcode::Shr
            | Opcode::Sqrt
            | Opcode::Bitlen
            | Opcode::Exp
            | Opcode::Expw => 4,

            Opcode::Cover
            | Opcode::Uncover
            | Opcode::Extract
            | Opcode::Extract3
            | Opcode::ExtractUint16
            | Opcode::ExtractUint32
            | Opcode::ExtractUint64
            | Opcode::Log
            | Opcode::ItxnBegin
            | Opcode::ItxnField
            | Opcode::ItxnSubmit
            | Opcode::Itxn
            | Opcode::Itxna => 5,

            _ => 1,
        }
    }

    /// Execution cost at the given TEAL version
    pub fn cost(self, version: u64) -> u64 {
        match self {
            Opcode::Sha256 => if version == 1 { 7 } else { 35 },
            Opcode::Keccak256 => if version == 1 { 26 } else { 130 },
            Opcode::Sha512_256 => if version == 1 { 9 } else { 45 },
            Opcode::Sqrt => 4,
            Opcode::Divmodw => 20,
            Opcode::Expw => 10,
            _ => 1,
        }
    }

    /// Most values the opcode adds to the stack beyond those it consumes
    pub fn stack_growth(self) -> usize {
        match self {
            Opcode::Dup2 => 2,

            Opcode::Int
            | Opcode::PushInt
            | Opcode::Byte
            | Opcode::PushBytes
            | Opcode::Intc
            | Opcode::Intc0
            | Opcode::Intc1
            | Opcode::Intc2
            | Opcode::Intc3
            | Opcode::Bytec
            | Opcode::Bytec0
            | Opcode::Bytec1
            | Opcode::Bytec2
            | Opcode::Bytec3
            | Opcode::Arg
            | Opcode::Arg0
            | Opcode::Arg1
            | Opcode::Arg2
            | Opcode::Arg3
            | Opcode::Load
            | Opcode::Txn
            | Opcode::Gtxn
            | Opcode::Txna
            | Opcode::Gtxna
            | Opcode::Global
            | Opcode::Itxn
            | Opcode::Itxna
            | Opcode::Dup
            | Opcode::Dig => 1,

            _ => 0,
        }
    }

    /// Modes in which this opcode may execute
    pub fn mode(self) -> OpcodeMode {
        match self {
            Opcode::Arg
            | Opcode::Arg0
            | Opcode::Arg1
            | Opcode::Arg2
            | Opcode::Arg3 => OpcodeMode::SignatureOnly,

            Opcode::Balance
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
            | Opcode::Itxna => OpcodeMode::ApplicationOnly,

            _ => OpcodeMode::Any,
        }
    }

    /// Immediate operand layout
    pub fn immediates(self) -> ImmediateLayout {
        match self {
            Opcode::Int
            | Opcode::PushInt
            | Opcode::Intc
            | Opcode::Bytec
            | Opcode::Arg
            | Opcode::Load
            | Opcode::Store
            | Opcode::Dig
            | Opcode::Cover
            | Opcode::Uncover => ImmediateLayout::Uint,

            Opcode::Substring | Opcode::Extract => ImmediateLayout::UintUint,

            Opcode::Byte | Opcode::PushBytes => ImmediateLayout::Bytes,
            Opcode::Intcblock => ImmediateLayout::UintList,
            Opcode::Bytecblock => ImmediateLayout::BytesList,

            Opcode::Txn
            | Opcode::Global
            | Opcode::Gtxns
            | Opcode::Itxn
            | Opcode::ItxnField => ImmediateLayout::Field,

            Opcode::Txna | Opcode::Gtxnsa | Opcode::Itxna => ImmediateLayout::FieldUint,
            Opcode::Gtxn => ImmediateLayout::UintField,
            Opcode::Gtxna => ImmediateLayout::UintFieldUint,

            Opcode::Bnz | Opcode::Bz | Opcode::B | Opcode::Callsub => ImmediateLayout::Label,

            _ => ImmediateLayout::None,
        }
    }

    /// Whether this opcode transfers control to a label
    pub fn is_branch(self) -> bool {
        self.immediates() == ImmediateLayout::Label
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
