//! Text assembly for instruction streams
//!
//! One instruction per line:
//!
//! ```text
//! ; controller.operation followed by operand bytes
//! 2.5 aa bb cc
//! 0x10.0x01            # indices may be hex
//! 7.3 "hello" 00       ; string literals expand to their UTF-8 bytes
//! 1.0
//! ```
//!
//! Operand bytes are hex (`aa` or `0xaa`). `;` and `#` start a comment
//! anywhere outside a string literal.

use super::format::{encode_stream, Instruction};
use super::reader::{InstructionReader, ReadError};
use super::source::{InstructionSource, MemorySource, SeekMode, INVALID_OFFSET};
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    #[error("Invalid index at line {line}: {token}")]
    InvalidIndex { line: usize, token: String },
    #[error("Invalid operand at line {line}: {token}")]
    InvalidOperand { line: usize, token: String },
    #[error("Missing operation index at line {0}")]
    MissingOperation(usize),
    #[error("Too many operands at line {line}: {count} (maximum is 255)")]
    TooManyOperands { line: usize, count: usize },
    #[error("Unterminated string at line {0}")]
    UnterminatedString(usize),
    #[error("Invalid escape at line {line}: {escape}")]
    InvalidEscape { line: usize, escape: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Bytes(Vec<u8>),
}

/// Assembler for instruction text
#[derive(Debug, Default)]
pub struct Assembler {
    /// Instructions assembled by the last successful call
    count: usize,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instructions produced by the last `assemble` call
    pub fn instruction_count(&self) -> usize {
        self.count
    }

    /// Assemble text into instruction records
    pub fn assemble(&mut self, source: &str) -> Result<Vec<Instruction>, AsmError> {
        let mut instructions = Vec::new();

        for (idx, line) in source.lines().enumerate() {
            let line_num = idx + 1;
            let tokens = tokenize(line, line_num)?;
            let mut tokens = tokens.into_iter();

            let head = match tokens.next() {
                Some(Token::Word(word)) => word,
                Some(Token::Bytes(_)) => {
                    return Err(AsmError::InvalidIndex {
                        line: line_num,
                        token: "string literal".to_string(),
                    })
                }
                None => continue,
            };

            let (controller, operation) = head
                .split_once('.')
                .ok_or(AsmError::MissingOperation(line_num))?;
            let controller = parse_index(controller, line_num)?;
            let operation = parse_index(operation, line_num)?;

            let mut operands = Vec::new();
            for token in tokens {
                match token {
                    Token::Word(word) => operands.push(parse_byte(&word, line_num)?),
                    Token::Bytes(bytes) => operands.extend(bytes),
                }
            }

            let instr = Instruction::new(controller, operation, &operands).map_err(|_| {
                AsmError::TooManyOperands {
                    line: line_num,
                    count: operands.len(),
                }
            })?;
            instructions.push(instr);
        }

        self.count = instructions.len();
        Ok(instructions)
    }

    /// Assemble text straight to an encoded stream
    pub fn assemble_bytes(&mut self, source: &str) -> Result<Vec<u8>, AsmError> {
        let instructions = self.assemble(source)?;
        Ok(encode_stream(&instructions))
    }
}

/// Split a line into words and string literals, dropping comments
fn tokenize(line: &str, line_num: usize) -> Result<Vec<Token>, AsmError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars();
    let mut word = String::new();

    while let Some(c) = chars.next() {
        match c {
            ';' | '#' => break,
            '"' => {
                if !word.is_empty() {
                    tokens.push(Token::Word(std::mem::take(&mut word)));
                }
                tokens.push(Token::Bytes(read_string(&mut chars, line_num)?));
            }
            c if c.is_whitespace() => {
                if !word.is_empty() {
                    tokens.push(Token::Word(std::mem::take(&mut word)));
                }
            }
            c => word.push(c),
        }
    }

    if !word.is_empty() {
        tokens.push(Token::Word(word));
    }
    Ok(tokens)
}

/// Read a string literal body (opening quote already consumed)
fn read_string(chars: &mut std::str::Chars<'_>, line_num: usize) -> Result<Vec<u8>, AsmError> {
    let mut bytes = Vec::new();
    let mut buf = [0u8; 4];

    loop {
        let c = chars.next().ok_or(AsmError::UnterminatedString(line_num))?;
        match c {
            '"' => return Ok(bytes),
            '\\' => {
                let esc = chars.next().ok_or(AsmError::UnterminatedString(line_num))?;
                match esc {
                    'n' => bytes.push(b'\n'),
                    't' => bytes.push(b'\t'),
                    'r' => bytes.push(b'\r'),
                    '0' => bytes.push(0),
                    '\\' => bytes.push(b'\\'),
                    '"' => bytes.push(b'"'),
                    'x' => {
                        let hi = chars.next();
                        let lo = chars.next();
                        let digits: String = hi.into_iter().chain(lo).collect();
                        let value = u8::from_str_radix(&digits, 16).map_err(|_| {
                            AsmError::InvalidEscape {
                                line: line_num,
                                escape: format!("\\x{}", digits),
                            }
                        })?;
                        bytes.push(value);
                    }
                    other => {
                        return Err(AsmError::InvalidEscape {
                            line: line_num,
                            escape: format!("\\{}", other),
                        })
                    }
                }
            }
            c => bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes()),
        }
    }
}

/// Controller/operation index: decimal or 0x-prefixed hex
fn parse_index(token: &str, line_num: usize) -> Result<u8, AsmError> {
    let parsed = if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        u8::from_str_radix(hex, 16)
    } else {
        token.parse::<u8>()
    };

    parsed.map_err(|_| AsmError::InvalidIndex {
        line: line_num,
        token: token.to_string(),
    })
}

/// Operand byte: one or two hex digits, optionally 0x-prefixed
fn parse_byte(token: &str, line_num: usize) -> Result<u8, AsmError> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);

    if digits.is_empty() || digits.len() > 2 {
        return Err(AsmError::InvalidOperand {
            line: line_num,
            token: token.to_string(),
        });
    }

    u8::from_str_radix(digits, 16).map_err(|_| AsmError::InvalidOperand {
        line: line_num,
        token: token.to_string(),
    })
}

/// Renders instruction streams as assembler text
#[derive(Debug, Clone)]
pub struct Disassembler {
    show_bytes: bool,
    show_offsets: bool,
    limit: Option<usize>,
}

impl Disassembler {
    pub fn new() -> Self {
        Self {
            show_bytes: false,
            show_offsets: true,
            limit: None,
        }
    }

    /// Show the raw header bytes of each record
    pub fn with_bytes(mut self, show: bool) -> Self {
        self.show_bytes = show;
        self
    }

    pub fn with_offsets(mut self, show: bool) -> Self {
        self.show_offsets = show;
        self
    }

    /// Stop after this many instructions
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Disassemble everything left in the stream
    pub fn disassemble<S: InstructionSource>(
        &self,
        reader: &mut InstructionReader<S>,
    ) -> Result<String, ReadError> {
        let mut output = String::new();
        self.disassemble_to(reader, &mut output)?;
        Ok(output)
    }

    /// Append the disassembly to `output` and return the number of
    /// instructions rendered. On error, `output` keeps every line rendered
    /// before the failure.
    pub fn disassemble_to<S: InstructionSource>(
        &self,
        reader: &mut InstructionReader<S>,
        output: &mut String,
    ) -> Result<usize, ReadError> {
        let mut count = 0;

        loop {
            if self.limit.is_some_and(|limit| count >= limit) {
                if has_remaining(reader)? {
                    let _ = writeln!(output, "; stopped after {} instructions", count);
                }
                break;
            }

            let Some(item) = reader.located().next() else {
                break;
            };
            let located = item?;
            let instr = &located.instruction;

            if self.show_offsets {
                if located.offset == INVALID_OFFSET {
                    output.push_str("????:  ");
                } else {
                    let _ = write!(output, "{:04x}:  ", located.offset);
                }
            }

            if self.show_bytes {
                for b in instr.header().to_bytes() {
                    let _ = write!(output, "{:02x} ", b);
                }
                output.push(' ');
            }

            let _ = writeln!(output, "{}", instr);
            count += 1;
        }

        Ok(count)
    }

    /// Disassemble raw bytes
    pub fn disassemble_bytes(&self, bytes: &[u8]) -> Result<String, ReadError> {
        let mut reader = InstructionReader::new(MemorySource::new(bytes));
        self.disassemble(&mut reader)
    }
}

impl Default for Disassembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether any bytes follow the reader's position. The position is restored
/// before returning. Media that cannot report a position count as non-empty.
fn has_remaining<S: InstructionSource>(
    reader: &mut InstructionReader<S>,
) -> Result<bool, ReadError> {
    let position = reader.tell();
    if position == INVALID_OFFSET {
        return Ok(true);
    }
    let end = reader.seek(0, SeekMode::End)?;
    reader.seek(position, SeekMode::Start)?;
    Ok(end > position)
}
