//! Instruction records and streams
//!
//! Defines the 3-byte-header instruction format, the medium contract a
//! stream must satisfy, and the reader/writer pair built on it.
//!
//! # Text Assembly
//!
//! The assembler module gives streams a line-per-instruction text form:
//!
//! ```text
//! 2.5 aa bb cc    ; controller 2, operation 5, three operand bytes
//! ```
//!
//! The disassembler renders any stream back into that form, optionally with
//! offsets and raw header bytes.

pub mod assembler;
pub mod format;
pub mod reader;
pub mod source;
pub mod writer;

pub use assembler::{AsmError, Assembler, Disassembler};
pub use format::*;
pub use reader::{InstructionReader, Instructions, Located, LocatedInstruction, ReadError};
pub use source::{
    InstructionSource, IoSource, MemorySource, Offset, SeekError, SeekMode, INVALID_OFFSET,
};
pub use writer::InstructionWriter;
