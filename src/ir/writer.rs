//! Instruction stream writer

use super::format::Instruction;
use std::io::{self, Write};

/// Encodes instructions onto any `std::io::Write`.
#[derive(Debug)]
pub struct InstructionWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> InstructionWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Write one instruction and return its encoded size
    pub fn write(&mut self, instr: &Instruction) -> io::Result<usize> {
        self.inner.write_all(&instr.header().to_bytes())?;
        self.inner.write_all(instr.operands())?;

        let size = instr.encoded_len();
        self.written += size as u64;
        Ok(size)
    }

    /// Write every instruction in order, returning the total size
    pub fn write_all<'a, I>(&mut self, instructions: I) -> io::Result<u64>
    where
        I: IntoIterator<Item = &'a Instruction>,
    {
        let mut total = 0u64;
        for instr in instructions {
            total += self.write(instr)? as u64;
        }
        Ok(total)
    }

    /// Bytes written since construction
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
