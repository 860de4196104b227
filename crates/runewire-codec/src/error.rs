//! Codec error types.

/// Errors raised while reading from or writing to a [`Buffer`](crate::Buffer).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A read needed more bytes (or bits) than the buffer holds.
    #[error("buffer underflow: {needed} more needed at {position} of {len}")]
    Underflow {
        /// Bytes (or bits, in bit mode) the read required.
        needed: usize,
        /// Cursor position when the read was attempted.
        position: usize,
        /// Total length of the backing storage, in the same unit.
        len: usize,
    },

    /// Bit reads and writes accept widths in `1..=32`.
    #[error("invalid bit width {0}")]
    InvalidBitWidth(u32),

    /// The value cannot be represented by the smart-int encoding.
    #[error("value {0} out of range for smart encoding")]
    SmartOutOfRange(i32),

    /// A back-patched length does not fit the reserved length byte.
    #[error("length {0} cannot be back-patched")]
    LengthOutOfRange(usize),
}
