//! Errors raised while applying a frame to the world state.

use runewire_codec::CodecError;

/// A frame could not be applied.
///
/// Apart from [`SyncError::Codec`], these are consistency violations between
/// the client's view and the server's encoder. The pass is abandoned but the
/// connection is kept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The payload ended early or held an unrepresentable value.
    #[error("payload decode failed: {0}")]
    Codec(#[from] CodecError),

    /// An existing-entity count larger than the tracked list. Rosters only
    /// grow through admission.
    #[error("roster grew from {previous} to {count} outside admission")]
    RosterGrew { previous: usize, count: usize },

    /// Bytes consumed by the decoder differ from the payload length.
    #[error("consumed {consumed} of {expected} payload bytes")]
    LengthMismatch { consumed: usize, expected: usize },

    /// The tracked list references an empty slot.
    #[error("tracked index {0} has no entity")]
    EmptyTrackedSlot(u16),

    /// An entity was admitted twice in one pass.
    #[error("index {0} admitted while already tracked this pass")]
    DuplicateAdmission(u16),

    /// An index outside the destination table.
    #[error("index {0} out of range")]
    IndexOutOfRange(u32),
}

/// Errors that can occur when loading a descriptor table.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// Failed to read the table from disk.
    #[error("failed to read descriptor table {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse RON content.
    #[error("failed to parse descriptor table: {0}")]
    Parse(#[source] ron::error::SpannedError),
}
