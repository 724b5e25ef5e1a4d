use crate::{zigzag::zigzag_encode, MAX_FIXED_PRECISION};

/// Growable byte buffer the archive codecs write into.
///
/// Boolean fields do not cost a byte each: the first `write_bool` of a group
/// reserves one byte at the current output position, and subsequent bits are
/// backfilled into it. The byte is patched once 8 bits have been written, and
/// also when the group is closed at the end of a record regardless of fill
/// level, so it is always present on the wire once any boolean in the group
/// has been written.
pub struct ArchiveWriter {
    buffer: Vec<u8>,
    bit_scratch: u8,
    bit_count: u8,
    bit_slot: Option<usize>,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64),
            bit_scratch: 0,
            bit_count: 0,
            bit_slot: None,
        }
    }

    /// Closes any open boolean group and returns the finished bytes.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.close_bools();
        self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn write_u8(&mut self, byte: u8) {
        self.buffer.push(byte);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// 7 data bits per byte, high bit is the continuation flag, little-endian
    /// group order.
    pub fn write_varint(&mut self, value: u64) {
        let mut value = value;
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                self.buffer.push(byte | 0x80);
            } else {
                self.buffer.push(byte);
                return;
            }
        }
    }

    pub fn write_zigzag(&mut self, value: i64) {
        self.write_varint(zigzag_encode(value));
    }

    /// Quantizes to `round(value * 2^precision)` and writes the result as a
    /// zigzag varint. Lossy for floats; exact for the quantized representation.
    pub fn write_fixed(&mut self, value: f32, precision: u8) {
        assert!(
            precision <= MAX_FIXED_PRECISION,
            "fixed-point precision {} exceeds maximum of {}",
            precision,
            MAX_FIXED_PRECISION
        );
        let scale = (1u32 << precision) as f32;
        self.write_zigzag((value * scale).round() as i64);
    }

    /// Appends one bit to the current boolean group, materializing the group's
    /// byte at the current position if this is the group's first bit.
    pub fn write_bool(&mut self, bit: bool) {
        if self.bit_slot.is_none() {
            self.bit_slot = Some(self.buffer.len());
            self.buffer.push(0);
            self.bit_scratch = 0;
            self.bit_count = 0;
        }

        if bit {
            self.bit_scratch |= 1 << self.bit_count;
        }
        self.bit_count += 1;

        if self.bit_count == 8 {
            self.patch_bit_slot();
        }
    }

    /// Closes the open boolean group, if any. The reserved byte is emitted
    /// regardless of how many of its 8 bits were used.
    pub fn close_bools(&mut self) {
        if self.bit_slot.is_some() {
            self.patch_bit_slot();
        }
    }

    fn patch_bit_slot(&mut self) {
        // bit_slot is checked by both callers
        if let Some(index) = self.bit_slot.take() {
            self.buffer[index] = self.bit_scratch;
            self.bit_scratch = 0;
            self.bit_count = 0;
        }
    }
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}
