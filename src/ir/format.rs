//! Instruction record format
//!
//! Every instruction is a 3-byte header followed by an opaque operand payload.
//!
//! # Instruction Encoding
//!
//! ```text
//! ┌────────────┬────────────┬────────────┬─────────────────────────┐
//! │ Controller │ Operation  │  Operand   │  Operands               │
//! │   index    │   index    │   count    │                         │
//! │   8 bits   │   8 bits   │   8 bits   │  operand_count bytes    │
//! └────────────┴────────────┴────────────┴─────────────────────────┘
//! ```
//!
//! Fields are independent bytes with no padding or alignment. A stream is a
//! plain concatenation of records: the header alone tells a decoder where
//! the next record begins, so no outer length prefix or magic is needed.

use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Size of an encoded header in bytes
pub const HEADER_SIZE: usize = 3;

/// Largest operand count a header can announce
pub const MAX_OPERANDS: usize = u8::MAX as usize;

/// Capacity of the inline operand buffer (one byte of slack over `MAX_OPERANDS`)
pub const OPERAND_CAPACITY: usize = 256;

/// Largest on-wire size of a single record
pub const MAX_INSTRUCTION_SIZE: usize = HEADER_SIZE + MAX_OPERANDS;

/// Errors building an instruction record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Too many operands: {0} (maximum is 255)")]
    TooManyOperands(usize),
}

/// Instruction header: which controller owns the instruction, which operation
/// it performs, and how many operand bytes follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InstructionHeader {
    pub controller_index: u8,
    pub operation_index: u8,
    pub operand_count: u8,
}

impl InstructionHeader {
    pub fn new(controller_index: u8, operation_index: u8, operand_count: u8) -> Self {
        Self {
            controller_index,
            operation_index,
            operand_count,
        }
    }

    /// Decode a header from its 3 wire bytes
    pub fn from_bytes(bytes: [u8; HEADER_SIZE]) -> Self {
        Self {
            controller_index: bytes[0],
            operation_index: bytes[1],
            operand_count: bytes[2],
        }
    }

    /// Encode to the 3 wire bytes
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        [
            self.controller_index,
            self.operation_index,
            self.operand_count,
        ]
    }

    /// Size of the whole record this header introduces
    pub fn record_size(&self) -> usize {
        HEADER_SIZE + self.operand_count as usize
    }
}

/// A decoded instruction record.
///
/// Operands live in a fixed inline buffer so that reading a record never
/// allocates. Only the first `operand_count` bytes are meaningful; everything
/// past that is leftover from earlier reads and is never exposed, compared or
/// hashed.
#[derive(Clone, Copy)]
pub struct Instruction {
    header: InstructionHeader,
    operands: [u8; OPERAND_CAPACITY],
}

impl Instruction {
    /// Create an instruction from its parts
    pub fn new(controller_index: u8, operation_index: u8, operands: &[u8]) -> Result<Self, FormatError> {
        if operands.len() > MAX_OPERANDS {
            return Err(FormatError::TooManyOperands(operands.len()));
        }

        let mut instr = Self::empty();
        instr.header = InstructionHeader::new(controller_index, operation_index, operands.len() as u8);
        instr.operands[..operands.len()].copy_from_slice(operands);
        Ok(instr)
    }

    /// Create an instruction with no operands
    pub fn nullary(controller_index: u8, operation_index: u8) -> Self {
        let mut instr = Self::empty();
        instr.header = InstructionHeader::new(controller_index, operation_index, 0);
        instr
    }

    /// A blank record slot, suitable for passing to `InstructionReader::read_into`
    pub fn empty() -> Self {
        Self {
            header: InstructionHeader::default(),
            operands: [0; OPERAND_CAPACITY],
        }
    }

    pub fn header(&self) -> &InstructionHeader {
        &self.header
    }

    pub fn controller_index(&self) -> u8 {
        self.header.controller_index
    }

    pub fn operation_index(&self) -> u8 {
        self.header.operation_index
    }

    pub fn operand_count(&self) -> usize {
        self.header.operand_count as usize
    }

    /// The meaningful operand bytes
    pub fn operands(&self) -> &[u8] {
        &self.operands[..self.operand_count()]
    }

    pub fn operands_mut(&mut self) -> &mut [u8] {
        let count = self.operand_count();
        &mut self.operands[..count]
    }

    /// Overwrite the header. The operand slice grows or shrinks with the new
    /// count; bytes exposed by growing are whatever the buffer held before.
    pub(crate) fn set_header(&mut self, header: InstructionHeader) {
        self.header = header;
    }

    /// Size of this instruction on the wire
    pub fn encoded_len(&self) -> usize {
        self.header.record_size()
    }

    /// Encode to bytes (header followed by operands)
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut bytes);
        bytes
    }

    /// Append the encoded instruction to `out`
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(self.operands());
    }
}

impl Default for Instruction {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Instruction {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.operands() == other.operands()
    }
}

impl Eq for Instruction {}

impl Hash for Instruction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.header.hash(state);
        self.operands().hash(state);
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("controller_index", &self.header.controller_index)
            .field("operation_index", &self.header.operation_index)
            .field("operand_count", &self.header.operand_count)
            .field("operands", &self.operands())
            .finish()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}",
            self.header.controller_index, self.header.operation_index
        )?;
        for byte in self.operands() {
            write!(f, " {:02x}", byte)?;
        }
        Ok(())
    }
}

/// Encode a sequence of instructions as one stream
pub fn encode_stream(instructions: &[Instruction]) -> Vec<u8> {
    let size = instructions.iter().map(|i| i.encoded_len()).sum();
    let mut bytes = Vec::with_capacity(size);
    for instr in instructions {
        instr.encode_into(&mut bytes);
    }
    bytes
}
