//! Turning TrueType assembly into bytecode.
//!
//! The accepted syntax is the one used for instructions stored in font
//! sources: every instruction is written as `NAME[flags]`, where `flags` is a
//! string of binary digits selecting the variant of the instruction (for
//! instance `MDAP[1]` or `MIRP[10100]`). Push instructions are followed by
//! their operands:
//!
//! ```text
//! PUSHB[ ]  /* 2 values pushed */
//! 1 0
//! MIRP[10100]
//! ```

/// Something that can compile assembly source into bytecode.
pub trait Assemble {
    fn assemble(&self, source: &str) -> Result<Vec<u8>, AssembleError>;
}

/// The default [`Assemble`] implementation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Assembler;

/// An error encountered while assembling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembleError {
    /// The 1-based line on which the error occurred.
    pub line: usize,
    pub kind: AssembleErrorKind,
}

/// The reason assembly failed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssembleErrorKind {
    UnexpectedCharacter(char),
    UnterminatedComment,
    UnterminatedFlags,
    UnknownInstruction(String),
    InvalidFlags {
        instruction: String,
        flags: String,
        expected_bits: u8,
    },
    /// A number appeared where an instruction was expected.
    UnexpectedOperand(i64),
    InvalidOperand(String),
    OperandOutOfRange {
        instruction: String,
        value: i64,
    },
    WrongOperandCount {
        instruction: String,
        count: usize,
    },
}

impl Assemble for Assembler {
    fn assemble(&self, source: &str) -> Result<Vec<u8>, AssembleError> {
        let mut tokens = Lexer::new(source).peekable();
        let mut out = Vec::new();
        while let Some(token) = tokens.next() {
            let (line, token) = token?;
            let err = |kind| AssembleError { line, kind };
            let (name, flags) = match token {
                Token::Instruction { name, flags } => (name, flags),
                Token::Number(value) => {
                    return Err(err(AssembleErrorKind::UnexpectedOperand(value)))
                }
            };
            if let Some(push) = Push::from_name(name) {
                let mut values = Vec::new();
                loop {
                    match tokens.peek() {
                        Some(Ok((_, Token::Number(value)))) => {
                            values.push(*value);
                            tokens.next();
                        }
                        Some(Err(_)) => {
                            if let Some(Err(e)) = tokens.next() {
                                return Err(e);
                            }
                        }
                        _ => break,
                    }
                }
                push.encode(name, flags, &values, &mut out).map_err(err)?;
                continue;
            }
            let (opcode, bits) = lookup(name)
                .ok_or_else(|| err(AssembleErrorKind::UnknownInstruction(name.to_owned())))?;
            let variant = parse_flags(flags, bits).ok_or_else(|| {
                err(AssembleErrorKind::InvalidFlags {
                    instruction: name.to_owned(),
                    flags: flags.to_owned(),
                    expected_bits: bits,
                })
            })?;
            out.push(opcode + variant);
        }
        Ok(out)
    }
}

impl<F> Assemble for F
where
    F: Fn(&str) -> Result<Vec<u8>, AssembleError>,
{
    fn assemble(&self, source: &str) -> Result<Vec<u8>, AssembleError> {
        self(source)
    }
}

// opcodes for the fixed-size push instructions; the low three bits hold
// the operand count minus one.
const PUSHB: u8 = 0xB0;
const PUSHW: u8 = 0xB8;
const NPUSHB: u8 = 0x40;
const NPUSHW: u8 = 0x41;

/// The largest number of operands for a single NPUSHB/NPUSHW.
const MAX_NPUSH: usize = u8::MAX as usize;
const MAX_PUSH: usize = 8;

/// Name, base opcode and number of flag bits, for every non-push instruction.
#[rustfmt::skip]
const INSTRUCTIONS: &[(&str, u8, u8)] = &[
    ("SVTCA", 0x00, 1), ("SPVTCA", 0x02, 1), ("SFVTCA", 0x04, 1), ("SPVTL", 0x06, 1),
    ("SFVTL", 0x08, 1), ("SPVFS", 0x0A, 0), ("SFVFS", 0x0B, 0), ("GPV", 0x0C, 0),
    ("GFV", 0x0D, 0), ("SFVTPV", 0x0E, 0), ("ISECT", 0x0F, 0), ("SRP0", 0x10, 0),
    ("SRP1", 0x11, 0), ("SRP2", 0x12, 0), ("SZP0", 0x13, 0), ("SZP1", 0x14, 0),
    ("SZP2", 0x15, 0), ("SZPS", 0x16, 0), ("SLOOP", 0x17, 0), ("RTG", 0x18, 0),
    ("RTHG", 0x19, 0), ("SMD", 0x1A, 0), ("ELSE", 0x1B, 0), ("JMPR", 0x1C, 0),
    ("SCVTCI", 0x1D, 0), ("SSWCI", 0x1E, 0), ("SSW", 0x1F, 0), ("DUP", 0x20, 0),
    ("POP", 0x21, 0), ("CLEAR", 0x22, 0), ("SWAP", 0x23, 0), ("DEPTH", 0x24, 0),
    ("CINDEX", 0x25, 0), ("MINDEX", 0x26, 0), ("ALIGNPTS", 0x27, 0), ("UTP", 0x29, 0),
    ("LOOPCALL", 0x2A, 0), ("CALL", 0x2B, 0), ("FDEF", 0x2C, 0), ("ENDF", 0x2D, 0),
    ("MDAP", 0x2E, 1), ("IUP", 0x30, 1), ("SHP", 0x32, 1), ("SHC", 0x34, 1),
    ("SHZ", 0x36, 1), ("SHPIX", 0x38, 0), ("IP", 0x39, 0), ("MSIRP", 0x3A, 1),
    ("ALIGNRP", 0x3C, 0), ("RTDG", 0x3D, 0), ("MIAP", 0x3E, 1), ("WS", 0x42, 0),
    ("RS", 0x43, 0), ("WCVTP", 0x44, 0), ("RCVT", 0x45, 0), ("GC", 0x46, 1),
    ("SCFS", 0x48, 0), ("MD", 0x49, 1), ("MPPEM", 0x4B, 0), ("MPS", 0x4C, 0),
    ("FLIPON", 0x4D, 0), ("FLIPOFF", 0x4E, 0), ("DEBUG", 0x4F, 0), ("LT", 0x50, 0),
    ("LTEQ", 0x51, 0), ("GT", 0x52, 0), ("GTEQ", 0x53, 0), ("EQ", 0x54, 0),
    ("NEQ", 0x55, 0), ("ODD", 0x56, 0), ("EVEN", 0x57, 0), ("IF", 0x58, 0),
    ("EIF", 0x59, 0), ("AND", 0x5A, 0), ("OR", 0x5B, 0), ("NOT", 0x5C, 0),
    ("DELTAP1", 0x5D, 0), ("SDB", 0x5E, 0), ("SDS", 0x5F, 0), ("ADD", 0x60, 0),
    ("SUB", 0x61, 0), ("DIV", 0x62, 0), ("MUL", 0x63, 0), ("ABS", 0x64, 0),
    ("NEG", 0x65, 0), ("FLOOR", 0x66, 0), ("CEILING", 0x67, 0), ("ROUND", 0x68, 2),
    ("NROUND", 0x6C, 2), ("WCVTF", 0x70, 0), ("DELTAP2", 0x71, 0), ("DELTAP3", 0x72, 0),
    ("DELTAC1", 0x73, 0), ("DELTAC2", 0x74, 0), ("DELTAC3", 0x75, 0), ("SROUND", 0x76, 0),
    ("S45ROUND", 0x77, 0), ("JROT", 0x78, 0), ("JROF", 0x79, 0), ("ROFF", 0x7A, 0),
    ("RUTG", 0x7C, 0), ("RDTG", 0x7D, 0), ("SANGW", 0x7E, 0), ("AA", 0x7F, 0),
    ("FLIPPT", 0x80, 0), ("FLIPRGON", 0x81, 0), ("FLIPRGOFF", 0x82, 0), ("SCANCTRL", 0x85, 0),
    ("SDPVTL", 0x86, 1), ("GETINFO", 0x88, 0), ("IDEF", 0x89, 0), ("ROLL", 0x8A, 0),
    ("MAX", 0x8B, 0), ("MIN", 0x8C, 0), ("SCANTYPE", 0x8D, 0), ("INSTCTRL", 0x8E, 0),
    ("GETVARIATION", 0x91, 0), ("MDRP", 0xC0, 5), ("MIRP", 0xE0, 5),
];

fn lookup(name: &str) -> Option<(u8, u8)> {
    INSTRUCTIONS
        .iter()
        .find(|(mnemonic, ..)| *mnemonic == name)
        .map(|(_, opcode, bits)| (*opcode, *bits))
}

/// Parse the flags of an instruction with `bits` flag bits.
///
/// Returns `None` unless `flags` is exactly `bits` binary digits (or empty,
/// when `bits` is zero).
fn parse_flags(flags: &str, bits: u8) -> Option<u8> {
    if flags.len() != bits as usize || !flags.bytes().all(|b| b == b'0' || b == b'1') {
        return None;
    }
    Some(
        flags
            .bytes()
            .fold(0u8, |acc, digit| (acc << 1) | (digit - b'0')),
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Push {
    Bytes,
    Words,
    NBytes,
    NWords,
    /// Choose the smallest encoding for the operands.
    Any,
}

impl Push {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "PUSHB" => Some(Push::Bytes),
            "PUSHW" => Some(Push::Words),
            "NPUSHB" => Some(Push::NBytes),
            "NPUSHW" => Some(Push::NWords),
            "PUSH" => Some(Push::Any),
            _ => None,
        }
    }

    fn encode(
        self,
        name: &str,
        flags: &str,
        values: &[i64],
        out: &mut Vec<u8>,
    ) -> Result<(), AssembleErrorKind> {
        let bad_count = || AssembleErrorKind::WrongOperandCount {
            instruction: name.to_owned(),
            count: values.len(),
        };
        let max = match self {
            Push::Bytes | Push::Words => MAX_PUSH,
            Push::NBytes | Push::NWords => MAX_NPUSH,
            Push::Any => usize::MAX,
        };
        if values.is_empty() || values.len() > max {
            return Err(bad_count());
        }
        // the count is implied by the operands, but PUSHB[010] and friends
        // are accepted if the count they spell out is correct.
        if !flags.is_empty() {
            let count = match self {
                Push::Bytes | Push::Words => parse_flags(flags, 3),
                _ => None,
            };
            match count {
                Some(count) if count as usize + 1 == values.len() => (),
                Some(_) => return Err(bad_count()),
                None => {
                    return Err(AssembleErrorKind::InvalidFlags {
                        instruction: name.to_owned(),
                        flags: flags.to_owned(),
                        expected_bits: if matches!(self, Push::Bytes | Push::Words) {
                            3
                        } else {
                            0
                        },
                    })
                }
            }
        }
        let out_of_range = |value| AssembleErrorKind::OperandOutOfRange {
            instruction: name.to_owned(),
            value,
        };
        match self {
            Push::Bytes | Push::NBytes => {
                if let Some(bad) = values.iter().find(|v| !is_byte(**v)) {
                    return Err(out_of_range(*bad));
                }
                encode_push(values, true, self == Push::NBytes, out);
            }
            Push::Words | Push::NWords => {
                if let Some(bad) = values.iter().find(|v| !is_word(**v)) {
                    return Err(out_of_range(*bad));
                }
                encode_push(values, false, self == Push::NWords, out);
            }
            Push::Any => {
                if let Some(bad) = values.iter().find(|v| !is_word(**v)) {
                    return Err(out_of_range(*bad));
                }
                for run in values.chunk_by(|a, b| is_byte(*a) == is_byte(*b)) {
                    let bytes = is_byte(run[0]);
                    for chunk in run.chunks(MAX_NPUSH) {
                        encode_push(chunk, bytes, chunk.len() > MAX_PUSH, out);
                    }
                }
            }
        }
        Ok(())
    }
}

fn is_byte(value: i64) -> bool {
    (0..=u8::MAX as i64).contains(&value)
}

fn is_word(value: i64) -> bool {
    (i16::MIN as i64..=u16::MAX as i64).contains(&value)
}

/// Write a single push instruction; values must already be range checked.
fn encode_push(values: &[i64], bytes: bool, variable: bool, out: &mut Vec<u8>) {
    match (bytes, variable) {
        (true, true) => out.extend([NPUSHB, values.len() as u8]),
        (false, true) => out.extend([NPUSHW, values.len() as u8]),
        (true, false) => out.push(PUSHB + values.len() as u8 - 1),
        (false, false) => out.push(PUSHW + values.len() as u8 - 1),
    }
    for value in values {
        if bytes {
            out.push(*value as u8);
        } else {
            out.extend((*value as u16).to_be_bytes());
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token<'a> {
    Instruction { name: &'a str, flags: &'a str },
    Number(i64),
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            source,
            pos: 0,
            line: 1,
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn eat_while(&mut self, mut pred: impl FnMut(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&mut pred) {
            self.bump();
        }
        &self.source[start..self.pos]
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) -> Result<(), AssembleErrorKind> {
        loop {
            self.eat_while(char::is_whitespace);
            if !self.rest().starts_with("/*") {
                return Ok(());
            }
            let Some(len) = self.rest().find("*/") else {
                return Err(AssembleErrorKind::UnterminatedComment);
            };
            let end = self.pos + len + 2;
            while self.pos < end {
                self.bump();
            }
        }
    }

    fn next_token(&mut self) -> Option<Result<(usize, Token<'a>), AssembleError>> {
        let line = self.line;
        if let Err(kind) = self.skip_trivia() {
            return Some(Err(AssembleError { line, kind }));
        }
        let line = self.line;
        let c = self.peek()?;
        let result = if c.is_ascii_alphabetic() {
            self.instruction()
        } else if c.is_ascii_digit() || c == '-' || c == '+' {
            self.number()
        } else {
            Err(AssembleErrorKind::UnexpectedCharacter(c))
        };
        Some(
            result
                .map(|token| (line, token))
                .map_err(|kind| AssembleError { line, kind }),
        )
    }

    fn instruction(&mut self) -> Result<Token<'a>, AssembleErrorKind> {
        let name = self.eat_while(|c| c.is_ascii_alphanumeric());
        self.eat_while(|c| c == ' ' || c == '\t');
        if self.peek() != Some('[') {
            return Ok(Token::Instruction { name, flags: "" });
        }
        self.bump();
        let flags = self.eat_while(|c| c != ']' && c != '\n');
        if self.bump() != Some(']') {
            return Err(AssembleErrorKind::UnterminatedFlags);
        }
        Ok(Token::Instruction {
            name,
            flags: flags.trim(),
        })
    }

    fn number(&mut self) -> Result<Token<'a>, AssembleErrorKind> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        self.eat_while(|c| c.is_ascii_digit());
        // catch things like "12abc"
        self.eat_while(|c| c.is_ascii_alphanumeric());
        let text = &self.source[start..self.pos];
        text.parse()
            .map(Token::Number)
            .map_err(|_| AssembleErrorKind::InvalidOperand(text.to_owned()))
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<(usize, Token<'a>), AssembleError>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if matches!(token, Some(Err(_))) {
            // don't keep lexing after an error
            self.pos = self.source.len();
        }
        token
    }
}

impl std::fmt::Display for AssembleErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedCharacter(c) => write!(f, "unexpected character '{c}'"),
            Self::UnterminatedComment => write!(f, "unterminated comment"),
            Self::UnterminatedFlags => write!(f, "missing ']' after instruction flags"),
            Self::UnknownInstruction(name) => write!(f, "unknown instruction '{name}'"),
            Self::InvalidFlags {
                instruction,
                flags,
                expected_bits,
            } => write!(
                f,
                "invalid flags '{flags}' for {instruction}, expected {expected_bits} binary digits"
            ),
            Self::UnexpectedOperand(value) => {
                write!(f, "operand {value} is not preceded by a push instruction")
            }
            Self::InvalidOperand(text) => write!(f, "invalid operand '{text}'"),
            Self::OperandOutOfRange { instruction, value } => {
                write!(f, "operand {value} is out of range for {instruction}")
            }
            Self::WrongOperandCount { instruction, count } => {
                write!(f, "{instruction} cannot push {count} values")
            }
        }
    }
}

impl std::fmt::Display for AssembleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

impl std::error::Error for AssembleError {}
