use lockstep_serde::{ByteReader, ByteWriter};

use crate::{
    channels::error::ChannelError,
    constants::{CHUNK_HEADER_MAX_BYTES, MIN_CHUNK_SIZE},
    types::{ActionKind, PeerId, UniqueId},
};

// [flags][unique id: u64, only when FINAL][body]
pub const CHUNK_FIRST: u8 = 0b01;
pub const CHUNK_FINAL: u8 = 0b10;

/// One parsed chunk, borrowing its body from the received bytes
pub struct Chunk<'a> {
    pub is_first: bool,
    pub unique_id: Option<UniqueId>,
    pub body: &'a [u8],
}

impl<'a> Chunk<'a> {
    pub fn read(sender: PeerId, bytes: &'a [u8]) -> Result<Self, ChannelError> {
        let mut reader = ByteReader::new(bytes);
        let flags = reader.read_u8().map_err(|_| ChannelError::MalformedChunk {
            sender,
            reason: "empty chunk",
        })?;
        if flags & !(CHUNK_FIRST | CHUNK_FINAL) != 0 {
            return Err(ChannelError::MalformedChunk {
                sender,
                reason: "unknown flag bits",
            });
        }
        let unique_id = if flags & CHUNK_FINAL != 0 {
            let raw = reader.read_u64().map_err(|_| ChannelError::MalformedChunk {
                sender,
                reason: "final chunk is missing its unique id",
            })?;
            Some(UniqueId::from_u64(raw))
        } else {
            None
        };
        Ok(Self {
            is_first: flags & CHUNK_FIRST != 0,
            unique_id,
            body: reader.read_remaining(),
        })
    }
}

/// Splits `[kind][payload]` into chunks of at most `max_chunk_size` bytes.
/// Only the last chunk carries the unique id.
pub fn split_into_chunks(
    unique_id: UniqueId,
    kind: ActionKind,
    payload: &[u8],
    max_chunk_size: usize,
) -> Result<Vec<Box<[u8]>>, ChannelError> {
    if max_chunk_size < MIN_CHUNK_SIZE {
        return Err(ChannelError::ChunkSizeTooSmall {
            max_chunk_size,
            minimum: MIN_CHUNK_SIZE,
        });
    }

    let mut body_writer = ByteWriter::with_capacity(payload.len() + 5);
    body_writer.write_small_u32(kind);
    body_writer.write_bytes(payload);
    let body = body_writer.as_slice();

    let final_capacity = max_chunk_size - CHUNK_HEADER_MAX_BYTES;
    let continuation_capacity = max_chunk_size - 1;

    let mut chunks = Vec::with_capacity(body.len() / continuation_capacity + 1);
    let mut offset = 0;
    let mut chunk_writer = ByteWriter::with_capacity(max_chunk_size);
    loop {
        let remaining = body.len() - offset;
        let mut flags = if offset == 0 { CHUNK_FIRST } else { 0 };
        chunk_writer.reset();

        if remaining <= final_capacity {
            flags |= CHUNK_FINAL;
            chunk_writer.write_u8(flags);
            chunk_writer.write_u64(unique_id.to_u64());
            chunk_writer.write_bytes(&body[offset..]);
            chunks.push(chunk_writer.to_bytes());
            return Ok(chunks);
        }

        chunk_writer.write_u8(flags);
        chunk_writer.write_bytes(&body[offset..offset + continuation_capacity]);
        chunks.push(chunk_writer.to_bytes());
        offset += continuation_capacity;
    }
}
