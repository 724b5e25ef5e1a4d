//! # Riftgate Serde
//! Primitive codecs for the archive wire format: variable-length integers,
//! zigzag mapping, fixed-point quantized floats, and the shared boolean
//! bit-flag buffer.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod error;
mod reader;
mod writer;
mod zigzag;

pub use error::DecodeError;
pub use reader::ArchiveReader;
pub use writer::ArchiveWriter;
pub use zigzag::{zigzag_decode, zigzag_encode};

/// Highest fixed-point precision the archive format uses. Quantization is
/// `round(value * 2^precision)`.
pub const MAX_FIXED_PRECISION: u8 = 6;

/// A varint never spans more than this many bytes for a 64-bit value.
pub const MAX_VARINT_BYTES: usize = 10;
