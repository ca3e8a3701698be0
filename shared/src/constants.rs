// Action channel chunking

/// Default upper bound for a single serialized chunk, header included.
/// Transports usually cap one replicated write somewhere in the low kilobytes.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 2048;

/// flags byte + unique id of the final chunk
pub const CHUNK_HEADER_MAX_BYTES: usize = 1 + 8;

/// Anything smaller leaves no room for a chunk body
pub const MIN_CHUNK_SIZE: usize = CHUNK_HEADER_MAX_BYTES + 1;

// Snapshots

/// Size of the trailing CRC-32C over an export
pub const SNAPSHOT_CHECKSUM_BYTES: usize = 4;
