use crate::{error::DecodeError, zigzag::zigzag_decode, MAX_FIXED_PRECISION};

/// Cursor over a received byte slice, mirroring [`crate::ArchiveWriter`].
///
/// The boolean side maintains 0-8 buffered bits: when empty, `read_bool`
/// consumes exactly one byte from the stream and loads it as 8 bits, then pops
/// bits on subsequent calls without touching the stream.
pub struct ArchiveReader<'b> {
    buffer: &'b [u8],
    cursor: usize,
    bit_scratch: u8,
    bit_count: u8,
}

impl<'b> ArchiveReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            cursor: 0,
            bit_scratch: 0,
            bit_count: 0,
        }
    }

    /// Bytes left in the stream. Buffered bits are not counted.
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        if self.cursor >= self.buffer.len() {
            return Err(DecodeError::TruncatedInput {
                needed: 1,
                available: 0,
            });
        }
        let byte = self.buffer[self.cursor];
        self.cursor += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'b [u8], DecodeError> {
        if self.remaining() < count {
            return Err(DecodeError::TruncatedInput {
                needed: count,
                available: self.remaining(),
            });
        }
        let bytes = &self.buffer[self.cursor..self.cursor + count];
        self.cursor += count;
        Ok(bytes)
    }

    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let mut value: u64 = 0;
        let mut shift: u32 = 0;
        let mut bytes_read: usize = 0;

        loop {
            let byte = self.read_u8()?;
            bytes_read += 1;

            if shift >= 64 {
                return Err(DecodeError::VarintOverflow { bytes: bytes_read });
            }
            value |= u64::from(byte & 0x7F) << shift;

            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    pub fn read_zigzag(&mut self) -> Result<i64, DecodeError> {
        Ok(zigzag_decode(self.read_varint()?))
    }

    /// Reads a zigzag varint and divides back by `2^precision`.
    pub fn read_fixed(&mut self, precision: u8) -> Result<f32, DecodeError> {
        assert!(
            precision <= MAX_FIXED_PRECISION,
            "fixed-point precision {} exceeds maximum of {}",
            precision,
            MAX_FIXED_PRECISION
        );
        let scale = (1u32 << precision) as f32;
        Ok(self.read_zigzag()? as f32 / scale)
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        if self.bit_count == 0 {
            self.bit_scratch = self.read_u8()?;
            self.bit_count = 8;
        }
        let bit = self.bit_scratch & 1 != 0;
        self.bit_scratch >>= 1;
        self.bit_count -= 1;
        Ok(bit)
    }

    /// Discards buffered bits at a record boundary so a stale group is never
    /// carried into the next record.
    pub fn clear_bools(&mut self) {
        self.bit_scratch = 0;
        self.bit_count = 0;
    }
}
