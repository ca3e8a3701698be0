use std::time::{SystemTime, UNIX_EPOCH};

use crate::small::{write_varint, zigzag_encode};

/// A growable byte buffer that values are appended to.
///
/// Fixed width numbers are little-endian. The `small` family writes a variable
/// length encoding which only spends the bytes a value actually needs, so it
/// should be preferred for values that are usually close to zero.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Rewinds to the start of the buffer, keeping its allocation
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn to_bytes(&self) -> Box<[u8]> {
        self.buffer.clone().into_boxed_slice()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    // Fixed width

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.push(u8::from(value));
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    // Small

    pub fn write_small_u16(&mut self, value: u16) {
        write_varint(&mut self.buffer, u64::from(value));
    }

    pub fn write_small_u32(&mut self, value: u32) {
        write_varint(&mut self.buffer, u64::from(value));
    }

    pub fn write_small_u64(&mut self, value: u64) {
        write_varint(&mut self.buffer, value);
    }

    pub fn write_small_i32(&mut self, value: i32) {
        write_varint(&mut self.buffer, zigzag_encode(i64::from(value)));
    }

    pub fn write_small_i64(&mut self, value: i64) {
        write_varint(&mut self.buffer, zigzag_encode(value));
    }

    /// Round numbers have trailing zero mantissa bits. Swapping the byte order
    /// moves those zeros to the top, where the small encoding drops them.
    pub fn write_small_f32(&mut self, value: f32) {
        self.write_small_u32(value.to_bits().swap_bytes());
    }

    pub fn write_small_f64(&mut self, value: f64) {
        self.write_small_u64(value.to_bits().swap_bytes());
    }

    // Composite

    /// Length-prefixed UTF-8 string
    pub fn write_str(&mut self, value: &str) {
        self.write_small_u32(value.len() as u32);
        self.buffer.extend_from_slice(value.as_bytes());
    }

    /// Raw bytes without any length prefix, the reader must know how many to take
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Milliseconds since the UNIX epoch, negative for earlier times
    pub fn write_timestamp(&mut self, time: SystemTime) {
        let millis = match time.duration_since(UNIX_EPOCH) {
            Ok(since) => i64::try_from(since.as_millis()).unwrap_or(i64::MAX),
            Err(before) => i64::try_from(before.duration().as_millis())
                .map(|millis| -millis)
                .unwrap_or(i64::MIN),
        };
        self.write_i64(millis);
    }
}
