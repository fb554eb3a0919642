//! Streaming instruction reader
//!
//! Decodes one record per call from any [`InstructionSource`]. The reader
//! keeps no look-ahead and no state between calls: the medium's cursor is the
//! only position there is, so reads, seeks and tells can be interleaved
//! freely by a single caller.
//!
//! ```rust
//! use zodiac::ir::{InstructionReader, MemorySource};
//!
//! let bytes = [0x02, 0x05, 0x03, 0xAA, 0xBB, 0xCC];
//! let mut reader = InstructionReader::new(MemorySource::new(&bytes[..]));
//!
//! let instr = reader.read().unwrap();
//! assert_eq!(instr.controller_index(), 2);
//! assert_eq!(instr.operation_index(), 5);
//! assert_eq!(instr.operands(), &[0xAA, 0xBB, 0xCC]);
//! assert_eq!(reader.tell(), 6);
//! ```

use super::format::{Instruction, InstructionHeader, HEADER_SIZE};
use super::source::{InstructionSource, Offset, SeekError, SeekMode};
use thiserror::Error;

/// Failures decoding an instruction from a stream.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Fewer than 3 bytes were left for the header. With `available == 0`
    /// this is usually just the end of the stream.
    #[error("Incomplete instruction header: {available} of 3 bytes available")]
    Header { available: usize },

    /// The header promised more operand bytes than the stream held.
    #[error(
        "Truncated operands for instruction {}.{}: expected {expected} bytes, got {available}",
        .header.controller_index,
        .header.operation_index
    )]
    Operands {
        header: InstructionHeader,
        expected: usize,
        available: usize,
    },

    #[error(transparent)]
    Seek(#[from] SeekError),
}

impl ReadError {
    /// True for a header error with nothing read, i.e. the stream ended on a
    /// record boundary
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, ReadError::Header { available: 0 })
    }

    /// Bytes the failed read took from the medium. Subtracting this from the
    /// position after the failure gives the offset the damaged record starts at.
    pub fn consumed(&self) -> usize {
        match self {
            ReadError::Header { available } => *available,
            ReadError::Operands { available, .. } => HEADER_SIZE + available,
            ReadError::Seek(_) => 0,
        }
    }
}

/// Reads instruction records from a medium.
#[derive(Debug)]
pub struct InstructionReader<S> {
    source: S,
}

impl<S: InstructionSource> InstructionReader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Decode the next instruction into a caller-supplied slot.
    ///
    /// On a header error the slot's contents are unspecified. On an operands
    /// error the header fields are populated but the operands are not valid.
    pub fn read_into(&mut self, instr: &mut Instruction) -> Result<(), ReadError> {
        let mut header_bytes = [0u8; HEADER_SIZE];
        let available = self.source.read_bytes(&mut header_bytes);
        if available < HEADER_SIZE {
            crate::rt_debug!("Header read stopped after {} of {} bytes", available, HEADER_SIZE);
            return Err(ReadError::Header { available });
        }

        let header = InstructionHeader::from_bytes(header_bytes);
        instr.set_header(header);

        let expected = header.operand_count as usize;
        if expected == 0 {
            return Ok(());
        }

        let available = self.source.read_bytes(instr.operands_mut());
        if available < expected {
            crate::rt_debug!(
                "Operand read for {}.{} stopped after {} of {} bytes",
                header.controller_index,
                header.operation_index,
                available,
                expected
            );
            return Err(ReadError::Operands {
                header,
                expected,
                available,
            });
        }

        Ok(())
    }

    /// Decode the next instruction into a fresh record
    pub fn read(&mut self) -> Result<Instruction, ReadError> {
        let mut instr = Instruction::empty();
        self.read_into(&mut instr)?;
        Ok(instr)
    }

    /// Reposition the underlying stream and return the new absolute offset
    pub fn seek(&mut self, offset: Offset, mode: SeekMode) -> Result<Offset, ReadError> {
        Ok(self.source.seek(offset, mode)?)
    }

    /// Current offset of the underlying stream. Unless the caller seeked into
    /// the middle of a record, this is where the next header starts.
    pub fn tell(&mut self) -> Offset {
        self.source.tell()
    }

    /// Iterate over the remaining instructions
    pub fn instructions(&mut self) -> Instructions<'_, S> {
        Instructions {
            reader: self,
            done: false,
        }
    }

    /// Iterate over the remaining instructions together with their offsets
    pub fn located(&mut self) -> Located<'_, S> {
        Located {
            reader: self,
            done: false,
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

/// Iterator over decoded instructions.
///
/// Ends quietly when the stream ends on a record boundary. Any other failure
/// is yielded once, after which the iterator is exhausted.
pub struct Instructions<'a, S> {
    reader: &'a mut InstructionReader<S>,
    done: bool,
}

impl<S: InstructionSource> Iterator for Instructions<'_, S> {
    type Item = Result<Instruction, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.read() {
            Ok(instr) => Some(Ok(instr)),
            Err(e) => {
                self.done = true;
                if e.is_end_of_stream() {
                    None
                } else {
                    Some(Err(e))
                }
            }
        }
    }
}

impl<S: InstructionSource> std::iter::FusedIterator for Instructions<'_, S> {}

/// An instruction and the stream offset its header started at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedInstruction {
    pub offset: Offset,
    pub instruction: Instruction,
}

/// Iterator over decoded instructions with their start offsets.
pub struct Located<'a, S> {
    reader: &'a mut InstructionReader<S>,
    done: bool,
}

impl<S: InstructionSource> Iterator for Located<'_, S> {
    type Item = Result<LocatedInstruction, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let offset = self.reader.tell();
        match self.reader.read() {
            Ok(instruction) => Some(Ok(LocatedInstruction {
                offset,
                instruction,
            })),
            Err(e) => {
                self.done = true;
                if e.is_end_of_stream() {
                    None
                } else {
                    Some(Err(e))
                }
            }
        }
    }
}

impl<S: InstructionSource> std::iter::FusedIterator for Located<'_, S> {}
