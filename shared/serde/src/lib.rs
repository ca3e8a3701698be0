//! # Lockstep Serde
//! A byte-aligned stream codec. Every value is written and read in the exact
//! same order on both ends; the stream carries no type information.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod error;
mod reader;
mod small;
mod writer;

pub use error::SerdeErr;
pub use reader::ByteReader;
pub use small::{small_u32_len, small_u64_len};
pub use writer::ByteWriter;
