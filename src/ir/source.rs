//! Stream media for the instruction reader
//!
//! The reader needs exactly three things from whatever holds the bytes:
//! read, seek and tell. [`InstructionSource`] captures that contract; the
//! reader is generic over it and never learns whether it is talking to a
//! file, a socket or a buffer.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;

/// Absolute or relative byte position in a stream.
pub type Offset = i64;

/// Position reported by a medium that cannot tell where it is.
pub const INVALID_OFFSET: Offset = -1;

/// Origin a seek offset is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeekMode {
    /// From the beginning of the stream
    Start,
    /// From the current position
    Current,
    /// From the end of the stream
    End,
}

impl SeekMode {
    /// Equivalent `std::io` seek target
    pub fn to_seek_from(self, offset: Offset) -> Result<SeekFrom, SeekError> {
        match self {
            SeekMode::Start => u64::try_from(offset)
                .map(SeekFrom::Start)
                .map_err(|_| SeekError::BeforeStart { position: offset }),
            SeekMode::Current => Ok(SeekFrom::Current(offset)),
            SeekMode::End => Ok(SeekFrom::End(offset)),
        }
    }
}

/// Seek failures reported by a medium.
#[derive(Debug, Error)]
pub enum SeekError {
    #[error("Seek to {position} is before the start of the stream")]
    BeforeStart { position: Offset },

    #[error("Seek position overflows the offset type")]
    Overflow,

    #[error("Seek failed: {0}")]
    Io(#[from] io::Error),
}

/// The three primitives an instruction reader needs from its medium.
pub trait InstructionSource {
    /// Fill `buf` from the current position and advance past the bytes
    /// consumed. Returns how many bytes were written; anything short of
    /// `buf.len()` means the stream could not supply the rest, whether it
    /// ended or the medium failed.
    fn read_bytes(&mut self, buf: &mut [u8]) -> usize;

    /// Reposition the stream and return the new absolute position.
    fn seek(&mut self, offset: Offset, mode: SeekMode) -> Result<Offset, SeekError>;

    /// Current absolute position, or [`INVALID_OFFSET`].
    fn tell(&mut self) -> Offset;
}

impl<S: InstructionSource + ?Sized> InstructionSource for &mut S {
    fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        (**self).read_bytes(buf)
    }

    fn seek(&mut self, offset: Offset, mode: SeekMode) -> Result<Offset, SeekError> {
        (**self).seek(offset, mode)
    }

    fn tell(&mut self) -> Offset {
        (**self).tell()
    }
}

/// In-memory stream over any byte buffer.
///
/// Seeking past the end is allowed, as with files; reads from there return
/// nothing.
#[derive(Debug, Clone)]
pub struct MemorySource<B> {
    buf: B,
    pos: u64,
}

impl<B: AsRef<[u8]>> MemorySource<B> {
    pub fn new(buf: B) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Bytes left between the cursor and the end of the buffer
    pub fn remaining(&self) -> usize {
        let len = self.buf.as_ref().len();
        len - self.cursor().min(len)
    }

    pub fn get_ref(&self) -> &B {
        &self.buf
    }

    pub fn into_inner(self) -> B {
        self.buf
    }

    fn cursor(&self) -> usize {
        usize::try_from(self.pos).unwrap_or(usize::MAX)
    }
}

impl<B: AsRef<[u8]>> InstructionSource for MemorySource<B> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        let data = self.buf.as_ref();
        let start = self.cursor().min(data.len());
        let count = buf.len().min(data.len() - start);

        buf[..count].copy_from_slice(&data[start..start + count]);
        self.pos += count as u64;
        count
    }

    fn seek(&mut self, offset: Offset, mode: SeekMode) -> Result<Offset, SeekError> {
        let base = match mode {
            SeekMode::Start => 0,
            SeekMode::Current => Offset::try_from(self.pos).map_err(|_| SeekError::Overflow)?,
            SeekMode::End => {
                Offset::try_from(self.buf.as_ref().len()).map_err(|_| SeekError::Overflow)?
            }
        };

        let position = base.checked_add(offset).ok_or(SeekError::Overflow)?;
        if position < 0 {
            return Err(SeekError::BeforeStart { position });
        }

        self.pos = position as u64;
        Ok(position)
    }

    fn tell(&mut self) -> Offset {
        Offset::try_from(self.pos).unwrap_or(INVALID_OFFSET)
    }
}

/// Adapter for anything implementing `std::io::Read + Seek`.
///
/// I/O errors during a read are logged and reported as a short read, which
/// the reader turns into a header or operands error.
#[derive(Debug)]
pub struct IoSource<T> {
    inner: T,
}

impl IoSource<BufReader<File>> {
    /// Open a file as a buffered instruction source
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<T: Read + Seek> IoSource<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Seek> InstructionSource for IoSource<T> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        let mut filled = 0;

        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    crate::rt_warning!(
                        "Stream read failed after {} of {} bytes: {}",
                        filled,
                        buf.len(),
                        e
                    );
                    break;
                }
            }
        }

        filled
    }

    fn seek(&mut self, offset: Offset, mode: SeekMode) -> Result<Offset, SeekError> {
        let target = mode.to_seek_from(offset)?;
        let position = self.inner.seek(target)?;
        Offset::try_from(position).map_err(|_| SeekError::Overflow)
    }

    fn tell(&mut self) -> Offset {
        match self.inner.stream_position() {
            Ok(position) => Offset::try_from(position).unwrap_or(INVALID_OFFSET),
            Err(e) => {
                crate::rt_warning!("Stream position unavailable: {}", e);
                INVALID_OFFSET
            }
        }
    }
}
