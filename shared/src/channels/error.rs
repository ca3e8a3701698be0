use thiserror::Error;

use lockstep_serde::SerdeErr;

use crate::types::PeerId;

/// Errors that can occur while sending or reassembling channel payloads
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The sender has no local peer yet, so no unique id can be allocated
    #[error("Action channel has no owner yet. Payloads can only be submitted after the local peer has joined")]
    NoOwner,

    /// The configured chunk size cannot fit a header plus any body
    #[error("Chunk size of {max_chunk_size} bytes is too small. At least {minimum} bytes are needed for the chunk header and body")]
    ChunkSizeTooSmall { max_chunk_size: usize, minimum: usize },

    /// The per peer sequence ran out of values
    #[error("Action sequence of peer {peer} is exhausted. No further unique ids can be allocated")]
    SequenceExhausted { peer: PeerId },

    /// A continuation chunk arrived without the first chunk of its payload
    #[error("Received a chunk from peer {sender} without a preceding first chunk. The chunk was dropped")]
    MissingFirstChunk { sender: PeerId },

    /// The chunk header itself could not be read
    #[error("Malformed chunk from peer {sender}: {reason}")]
    MalformedChunk { sender: PeerId, reason: &'static str },

    /// The unique id inside a final chunk names a different peer than the one that wrote it
    #[error("Peer {sender} sent a payload carrying a unique id of peer {claimed}. Payloads may only carry their sender's ids")]
    SenderMismatch { sender: PeerId, claimed: PeerId },

    /// A reassembled payload could not be decoded
    #[error("Failed to decode channel payload: {0}")]
    Decode(#[from] SerdeErr),
}
