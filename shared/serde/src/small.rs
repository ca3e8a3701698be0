// "Small" numbers are LEB128: 7 value bits per byte, high bit set while more bytes follow.

pub(crate) const CONTINUE_BIT: u8 = 0x80;
pub(crate) const VALUE_MASK: u8 = 0x7F;

/// Longest possible encoding of a 64 bit value
pub(crate) const MAX_SMALL_BYTES: usize = 10;

pub(crate) fn write_varint(buffer: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value as u8) & VALUE_MASK;
        value >>= 7;
        if value == 0 {
            buffer.push(byte);
            return;
        }
        buffer.push(byte | CONTINUE_BIT);
    }
}

pub(crate) fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub(crate) fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Number of bytes `write_small_u64` will use for the given value
pub fn small_u64_len(mut value: u64) -> usize {
    let mut length = 1;
    while value >= 0x80 {
        value >>= 7;
        length += 1;
    }
    length
}

/// Number of bytes `write_small_u32` will use for the given value
pub fn small_u32_len(value: u32) -> usize {
    small_u64_len(u64::from(value))
}
