//! Stream reader tests
//!
//! Exercises the record format and reader contract over every medium the
//! crate ships: in-memory buffers, `std::io` cursors and real files.

use std::fs;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use zodiac::ir::{
    encode_stream, Instruction, InstructionHeader, InstructionReader, InstructionSource,
    InstructionWriter, IoSource, MemorySource, Offset, ReadError, SeekMode, HEADER_SIZE,
    MAX_OPERANDS,
};

/// Deterministic operand pattern so failures are easy to read
fn operands(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

fn sample_stream() -> Vec<Instruction> {
    vec![
        Instruction::new(2, 5, &[0xAA, 0xBB, 0xCC]).unwrap(),
        Instruction::nullary(0, 0),
        Instruction::new(7, 1, &operands(40, 3)).unwrap(),
        Instruction::new(255, 255, &operands(MAX_OPERANDS, 9)).unwrap(),
        Instruction::nullary(1, 200),
    ]
}

// ============================================================================
// Format
// ============================================================================

#[test]
fn test_round_trip_every_operand_count() {
    for count in [0usize, 1, 2, 3, 127, 128, 254, 255] {
        let instr = Instruction::new(count as u8, 0xFF - count as u8, &operands(count, 1)).unwrap();
        let bytes = instr.encode();
        assert_eq!(bytes.len(), HEADER_SIZE + count);

        let mut reader = InstructionReader::new(MemorySource::new(bytes));
        let decoded = reader.read().unwrap();
        assert_eq!(decoded, instr, "operand count {}", count);
        assert_eq!(decoded.operand_count(), count);
    }
}

#[test]
fn test_example_record_advances_six_bytes() {
    let bytes = [0x02, 0x05, 0x03, 0xAA, 0xBB, 0xCC];
    let mut reader = InstructionReader::new(MemorySource::new(&bytes[..]));

    let before = reader.tell();
    let instr = reader.read().unwrap();
    assert_eq!(*instr.header(), InstructionHeader::new(2, 5, 3));
    assert_eq!(instr.operands(), &[0xAA, 0xBB, 0xCC]);
    assert_eq!(reader.tell(), before + 6);
}

// ============================================================================
// Sequential decode
// ============================================================================

#[test]
fn test_sequential_decode_then_clean_end() {
    let expected = sample_stream();
    let mut reader = InstructionReader::new(MemorySource::new(encode_stream(&expected)));

    for instr in &expected {
        assert_eq!(&reader.read().unwrap(), instr);
    }

    match reader.read() {
        Err(ReadError::Header { available: 0 }) => {}
        other => panic!("expected clean end of stream, got {:?}", other),
    }
}

#[test]
fn test_zero_operand_stream() {
    let bytes = encode_stream(&[Instruction::nullary(3, 3), Instruction::nullary(4, 4)]);
    let mut reader = InstructionReader::new(MemorySource::new(bytes));

    let decoded: Vec<_> = reader.instructions().collect::<Result<_, _>>().unwrap();
    assert_eq!(decoded.len(), 2);
    assert!(decoded.iter().all(|i| i.operands().is_empty()));
}

// ============================================================================
// Truncation
// ============================================================================

#[test]
fn test_truncated_header_after_valid_records() {
    let mut bytes = encode_stream(&sample_stream()[..2]);
    bytes.push(0x09);
    let mut reader = InstructionReader::new(MemorySource::new(bytes));

    reader.read().unwrap();
    reader.read().unwrap();
    let err = reader.read().unwrap_err();
    assert!(matches!(err, ReadError::Header { available: 1 }));
    assert!(!err.is_end_of_stream());
}

#[test]
fn test_truncated_operands() {
    let full = Instruction::new(6, 2, &operands(10, 0)).unwrap().encode();
    for cut in HEADER_SIZE..full.len() {
        let mut reader = InstructionReader::new(MemorySource::new(&full[..cut]));
        match reader.read() {
            Err(ReadError::Operands {
                header,
                expected,
                available,
            }) => {
                assert_eq!(header, InstructionHeader::new(6, 2, 10));
                assert_eq!(expected, 10);
                assert_eq!(available, cut - HEADER_SIZE);
            }
            other => panic!("cut at {}: expected operands error, got {:?}", cut, other),
        }
    }
}

#[test]
fn test_error_messages() {
    let mut reader = InstructionReader::new(MemorySource::new(vec![4u8, 1, 2, 0xFF]));
    let err = reader.read().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Truncated operands for instruction 4.1: expected 2 bytes, got 1"
    );

    let err = reader.read().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Incomplete instruction header: 0 of 3 bytes available"
    );
}

// ============================================================================
// Seek / tell
// ============================================================================

#[test]
fn test_seek_then_tell() {
    let bytes = encode_stream(&sample_stream());
    let len = bytes.len() as Offset;
    let mut reader = InstructionReader::new(MemorySource::new(bytes));

    for offset in [0, 3, 6, len] {
        assert_eq!(reader.seek(offset, SeekMode::Start).unwrap(), offset);
        assert_eq!(reader.tell(), offset);
    }

    reader.seek(0, SeekMode::Start).unwrap();
    reader.seek(6, SeekMode::Current).unwrap();
    assert_eq!(reader.tell(), 6);
    reader.seek(-3, SeekMode::End).unwrap();
    assert_eq!(reader.tell(), len - 3);
}

#[test]
fn test_tell_tracks_record_boundaries() {
    let expected = sample_stream();
    let mut reader = InstructionReader::new(MemorySource::new(encode_stream(&expected)));

    let mut offset = 0;
    for instr in &expected {
        assert_eq!(reader.tell(), offset);
        let decoded = reader.read().unwrap();
        offset += (HEADER_SIZE + decoded.operand_count()) as Offset;
        assert_eq!(reader.tell(), offset);
        assert_eq!(&decoded, instr);
    }
}

#[test]
fn test_seek_to_recorded_offset_rereads_record() {
    let expected = sample_stream();
    let mut reader = InstructionReader::new(MemorySource::new(encode_stream(&expected)));

    let offsets: Vec<Offset> = reader.located().map(|l| l.unwrap().offset).collect();
    assert_eq!(offsets.len(), expected.len());

    for (idx, offset) in offsets.iter().enumerate().rev() {
        reader.seek(*offset, SeekMode::Start).unwrap();
        assert_eq!(reader.read().unwrap(), expected[idx]);
    }
}

// ============================================================================
// Media
// ============================================================================

fn decode_all<S: InstructionSource>(source: S) -> Vec<Instruction> {
    let mut reader = InstructionReader::new(source);
    reader.instructions().map(|i| i.unwrap()).collect()
}

#[test]
fn test_same_results_across_media() {
    let expected = sample_stream();
    let bytes = encode_stream(&expected);

    assert_eq!(decode_all(MemorySource::new(bytes.clone())), expected);
    assert_eq!(decode_all(IoSource::new(Cursor::new(bytes.clone()))), expected);

    let path = std::env::temp_dir().join("zodiac_reader_tests_media.bin");
    fs::write(&path, &bytes).unwrap();
    assert_eq!(decode_all(IoSource::open(&path).unwrap()), expected);
    fs::remove_file(&path).ok();
}

/// Seekable medium whose reads fail once the cursor reaches `fail_at`
struct FailingMedium {
    inner: Cursor<Vec<u8>>,
    fail_at: u64,
}

impl Read for FailingMedium {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let position = self.inner.position();
        if position >= self.fail_at {
            return Err(io::Error::new(io::ErrorKind::Other, "device detached"));
        }
        let allowed = ((self.fail_at - position) as usize).min(buf.len());
        self.inner.read(&mut buf[..allowed])
    }
}

impl Seek for FailingMedium {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

#[test]
fn test_medium_failure_inside_operands() {
    let expected = sample_stream();
    let bytes = encode_stream(&expected);
    // Third record starts after 6 + 3 bytes; fail 10 bytes into its operands
    let fail_at = 9 + HEADER_SIZE as u64 + 10;
    let mut reader = InstructionReader::new(IoSource::new(FailingMedium {
        inner: Cursor::new(bytes),
        fail_at,
    }));

    assert_eq!(reader.read().unwrap(), expected[0]);
    assert_eq!(reader.read().unwrap(), expected[1]);
    match reader.read() {
        Err(ReadError::Operands {
            header,
            expected: wanted,
            available,
        }) => {
            assert_eq!(header, *expected[2].header());
            assert_eq!(wanted, 40);
            assert_eq!(available, 10);
        }
        other => panic!("expected operands error, got {:?}", other),
    }

    // Seeking back before the failure point recovers the earlier records
    reader.seek(6, SeekMode::Start).unwrap();
    assert_eq!(reader.read().unwrap(), expected[1]);
}

#[test]
fn test_medium_failure_inside_header() {
    let bytes = encode_stream(&sample_stream());
    let mut reader = InstructionReader::new(IoSource::new(FailingMedium {
        inner: Cursor::new(bytes),
        fail_at: 7,
    }));

    reader.read().unwrap();
    let err = reader.read().unwrap_err();
    assert!(matches!(err, ReadError::Header { available: 1 }));
    assert!(!err.is_end_of_stream());

    // Iteration reports the failure instead of ending quietly
    reader.seek(0, SeekMode::Start).unwrap();
    let results: Vec<_> = reader.instructions().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(ReadError::Header { available: 1 })));
}

#[test]
fn test_writer_output_reads_back_from_file() {
    let expected = sample_stream();
    let path = std::env::temp_dir().join("zodiac_reader_tests_writer.bin");

    {
        let file = fs::File::create(&path).unwrap();
        let mut writer = InstructionWriter::new(std::io::BufWriter::new(file));
        writer.write_all(&expected).unwrap();
        writer.flush().unwrap();
    }

    let mut reader = InstructionReader::new(IoSource::open(&path).unwrap());
    reader.seek(-(HEADER_SIZE as Offset), SeekMode::End).unwrap();
    assert_eq!(reader.read().unwrap(), Instruction::nullary(1, 200));

    reader.seek(0, SeekMode::Start).unwrap();
    let decoded: Vec<_> = reader.instructions().map(|i| i.unwrap()).collect();
    assert_eq!(decoded, expected);

    fs::remove_file(&path).ok();
}
