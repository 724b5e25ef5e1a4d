use thiserror::Error;

/// Errors that can occur while decoding archive primitives.
///
/// The encode side cannot fail at this layer: the writer grows its buffer as
/// needed and value-range misuse is a caller bug caught at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The stream ended before the value could be completed. There is no
    /// resynchronization marker in the format, so the enclosing unit must be
    /// dropped whole.
    #[error("truncated input: needed {needed} more byte(s), only {available} available")]
    TruncatedInput { needed: usize, available: usize },

    /// A varint continuation chain ran past the 64-bit limit (possible
    /// malformed or malicious data).
    #[error("varint overflow after {bytes} bytes (value exceeds 64 bits)")]
    VarintOverflow { bytes: usize },
}
