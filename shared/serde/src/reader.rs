use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::{
    error::SerdeErr,
    small::{zigzag_decode, CONTINUE_BIT, MAX_SMALL_BYTES, VALUE_MASK},
};

/// A read cursor over an immutable byte slice.
///
/// Values must be read back with the same types and in the same order they
/// were written by [`ByteWriter`](crate::ByteWriter). Reading past the end is a
/// contract violation and is reported as [`SerdeErr::UnexpectedEnd`].
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], SerdeErr> {
        let remaining = self.remaining();
        if count > remaining {
            return Err(SerdeErr::UnexpectedEnd {
                position: self.position,
                needed: count,
                remaining,
            });
        }
        let start = self.position;
        self.position += count;
        Ok(&self.bytes[start..self.position])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], SerdeErr> {
        let mut output = [0u8; N];
        output.copy_from_slice(self.take(N)?);
        Ok(output)
    }

    fn read_varint(&mut self, bits: u32) -> Result<u64, SerdeErr> {
        let start = self.position;
        let mut output: u64 = 0;
        let mut shift: u32 = 0;

        for _ in 0..MAX_SMALL_BYTES {
            let byte = self.read_u8()?;
            let value = u64::from(byte & VALUE_MASK);

            let overflows = if shift >= bits {
                value != 0
            } else {
                bits - shift < 7 && (value >> (bits - shift)) != 0
            };
            if overflows {
                return Err(SerdeErr::VarintOverflow {
                    position: start,
                    bits,
                });
            }

            if shift < 64 {
                output |= value << shift;
            }
            if byte & CONTINUE_BIT == 0 {
                return Ok(output);
            }
            shift += 7;
        }

        Err(SerdeErr::VarintOverflow {
            position: start,
            bits,
        })
    }

    // Fixed width

    pub fn read_u8(&mut self) -> Result<u8, SerdeErr> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, SerdeErr> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SerdeErr::InvalidValue {
                kind: "bool",
                value: i128::from(other),
            }),
        }
    }

    pub fn read_u16(&mut self) -> Result<u16, SerdeErr> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, SerdeErr> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, SerdeErr> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    pub fn read_i8(&mut self) -> Result<i8, SerdeErr> {
        Ok(i8::from_le_bytes(self.take_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, SerdeErr> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, SerdeErr> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, SerdeErr> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, SerdeErr> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, SerdeErr> {
        Ok(f64::from_le_bytes(self.take_array()?))
    }

    // Small

    pub fn read_small_u16(&mut self) -> Result<u16, SerdeErr> {
        Ok(self.read_varint(16)? as u16)
    }

    pub fn read_small_u32(&mut self) -> Result<u32, SerdeErr> {
        Ok(self.read_varint(32)? as u32)
    }

    pub fn read_small_u64(&mut self) -> Result<u64, SerdeErr> {
        self.read_varint(64)
    }

    pub fn read_small_i32(&mut self) -> Result<i32, SerdeErr> {
        let position = self.position;
        let value = zigzag_decode(self.read_varint(33)?);
        i32::try_from(value).map_err(|_| SerdeErr::VarintOverflow { position, bits: 32 })
    }

    pub fn read_small_i64(&mut self) -> Result<i64, SerdeErr> {
        Ok(zigzag_decode(self.read_varint(64)?))
    }

    pub fn read_small_f32(&mut self) -> Result<f32, SerdeErr> {
        Ok(f32::from_bits(self.read_small_u32()?.swap_bytes()))
    }

    pub fn read_small_f64(&mut self) -> Result<f64, SerdeErr> {
        Ok(f64::from_bits(self.read_small_u64()?.swap_bytes()))
    }

    // Composite

    pub fn read_str(&mut self) -> Result<String, SerdeErr> {
        let length = self.read_small_u32()? as usize;
        let position = self.position;
        let bytes = self.take(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SerdeErr::InvalidUtf8 { position, length })
    }

    /// Borrows the next `count` bytes straight out of the underlying slice
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], SerdeErr> {
        self.take(count)
    }

    /// Borrows everything that has not been read yet
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let start = self.position;
        self.position = self.bytes.len();
        &self.bytes[start..]
    }

    pub fn read_timestamp(&mut self) -> Result<SystemTime, SerdeErr> {
        let millis = self.read_i64()?;
        let offset = Duration::from_millis(millis.unsigned_abs());
        let time = if millis >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        };
        time.ok_or(SerdeErr::InvalidValue {
            kind: "timestamp",
            value: i128::from(millis),
        })
    }
}
