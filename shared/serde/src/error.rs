use thiserror::Error;

/// Errors that can occur while reading from a byte stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// A read asked for more bytes than the stream has left
    #[error("Unexpected end of stream: needed {needed} bytes at position {position}, but only {remaining} remain. Reads must mirror the writes that produced the stream")]
    UnexpectedEnd {
        position: usize,
        needed: usize,
        remaining: usize,
    },

    /// A small (variable length) integer does not fit in the requested width
    #[error("Small integer at position {position} does not fit in {bits} bits")]
    VarintOverflow { position: usize, bits: u32 },

    /// A length-prefixed string is not valid UTF-8
    #[error("String of {length} bytes at position {position} is not valid UTF-8")]
    InvalidUtf8 { position: usize, length: usize },

    /// A value was read successfully but is outside the range allowed for its type
    #[error("Invalid value {value} read for {kind}")]
    InvalidValue { kind: &'static str, value: i128 },
}
