use thiserror::Error;

use lockstep_serde::SerdeErr;

/// Errors that make an export impossible or an import unreadable as a whole.
/// Per module problems are reported through
/// [`ImportStatus`](crate::ImportStatus) instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// Export names end up in line oriented storage
    #[error("Export name {name:?} contains a line break. Export names must fit on a single line")]
    InvalidName { name: String },

    /// None of the requested game states can be exported
    #[error("None of the requested game states support export")]
    NothingExportable,

    /// An export request named a game state index that is not registered
    #[error("No game state is registered at index {index}")]
    UnknownGameState { index: usize },

    /// The text is not valid base64
    #[error("Snapshot text is not valid base64: {reason}")]
    InvalidEncoding { reason: String },

    /// The decoded data cannot even hold the checksum
    #[error("Snapshot is {length} bytes long, but at least {minimum} bytes are required")]
    TooShort { length: usize, minimum: usize },

    /// The trailing checksum does not match the data
    #[error("Snapshot checksum mismatch: expected {expected:#010x}, computed {actual:#010x}. The text was altered or truncated")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// The checksum matched but the layout inside did not
    #[error("Snapshot data is malformed: {0}")]
    Malformed(#[from] SerdeErr),

    /// Bytes were left over after the last game state entry
    #[error("Snapshot has {count} unexpected trailing bytes")]
    TrailingBytes { count: usize },
}
