pub mod error;
pub mod export;
pub mod import;

/// CRC-32C over the export body
pub(crate) fn checksum(bytes: &[u8]) -> u32 {
    crc32c::crc32c(bytes)
}
