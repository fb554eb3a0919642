//! Zodiac - Self-Describing Instruction Streams
//!
//! A compact binary encoding for discrete instructions and a reader that
//! decodes them from any medium offering read, seek and tell.
//!
//! # Features
//!
//! - **3-byte header**: controller index, operation index, operand count
//! - **Opaque operands**: up to 255 payload bytes whose meaning belongs to the consumer
//! - **Self-delimiting**: no length prefix, magic or terminator; each header says where the next record starts
//! - **Medium-agnostic reader**: files, sockets and buffers plug in through one trait
//! - **Allocation-free reads**: records carry a fixed inline operand buffer
//! - **Text assembly**: `2.5 aa bb cc` round-trips through the assembler and disassembler
//!
//! # Example
//!
//! ```rust
//! use zodiac::ir::{Assembler, InstructionReader, MemorySource, SeekMode};
//!
//! let bytes = Assembler::new().assemble_bytes("2.5 aa bb cc\n1.0").unwrap();
//! let mut reader = InstructionReader::new(MemorySource::new(bytes));
//!
//! let first = reader.read().unwrap();
//! assert_eq!(first.operands(), &[0xAA, 0xBB, 0xCC]);
//! assert_eq!(reader.tell(), 6);
//!
//! let second = reader.read().unwrap();
//! assert_eq!((second.controller_index(), second.operation_index()), (1, 0));
//!
//! // Clean end of stream on a record boundary
//! assert!(reader.read().unwrap_err().is_end_of_stream());
//!
//! reader.seek(0, SeekMode::Start).unwrap();
//! assert_eq!(reader.read().unwrap(), first);
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ Medium          │  file / socket / buffer
//! └────────┬────────┘
//!          │ read_bytes / seek / tell
//!          ▼
//! ┌─────────────────┐
//! │ InstructionRead │  header → operand count → operands
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Instruction     │  consumed by a controller dispatch layer
//! └─────────────────┘
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod ir;
pub mod logger;

// Re-export commonly used types
pub use config::{ConfigError, ConfigResult, ZodiacConfig};
pub use ir::{
    AsmError, Assembler, Disassembler, Instruction, InstructionHeader, InstructionReader,
    InstructionSource, InstructionWriter, IoSource, MemorySource, Offset, ReadError, SeekError,
    SeekMode,
};
pub use logger::{LogLevel, LogSink, Logger};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
