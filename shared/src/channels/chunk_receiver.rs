use std::collections::HashMap;

use log::debug;

use lockstep_serde::ByteReader;

use crate::{
    channels::{chunk::Chunk, error::ChannelError},
    types::{ActionKind, PeerId, UniqueId},
};

/// A fully reassembled payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedAction {
    pub unique_id: UniqueId,
    pub kind: ActionKind,
    pub payload: Box<[u8]>,
}

/// Receiving half of the action channels. Keeps one reassembly buffer per
/// sending peer; chunks from one sender arrive in order.
#[derive(Default)]
pub struct ChunkReceiver {
    buffers: HashMap<PeerId, Vec<u8>>,
}

impl ChunkReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns Ok(None) while more chunks are needed, Ok(Some(...)) once the final
    /// chunk of a payload arrived
    pub fn try_receive(
        &mut self,
        sender: PeerId,
        bytes: &[u8],
    ) -> Result<Option<ReceivedAction>, ChannelError> {
        let chunk = Chunk::read(sender, bytes)?;

        if chunk.is_first {
            let buffer = self.buffers.entry(sender).or_default();
            if !buffer.is_empty() {
                debug!(
                    "Dropping {} bytes of an unfinished payload from peer {}",
                    buffer.len(),
                    sender
                );
            }
            buffer.clear();
            buffer.extend_from_slice(chunk.body);
        } else {
            self.buffers
                .get_mut(&sender)
                .ok_or(ChannelError::MissingFirstChunk { sender })?
                .extend_from_slice(chunk.body);
        }

        let Some(unique_id) = chunk.unique_id else {
            return Ok(None);
        };

        let body = self
            .buffers
            .remove(&sender)
            .ok_or(ChannelError::MissingFirstChunk { sender })?;
        if unique_id.peer() != sender {
            return Err(ChannelError::SenderMismatch {
                sender,
                claimed: unique_id.peer(),
            });
        }

        let mut reader = ByteReader::new(&body);
        let kind = reader.read_small_u32()?;
        let payload = reader.read_remaining().into();
        Ok(Some(ReceivedAction {
            unique_id,
            kind,
            payload,
        }))
    }

    /// Discards a partially received payload of a departed peer
    pub fn forget(&mut self, sender: PeerId) {
        if let Some(buffer) = self.buffers.remove(&sender) {
            debug!(
                "Discarding {} bytes of a partial payload from departed peer {}",
                buffer.len(),
                sender
            );
        }
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }

    pub fn has_partial(&self, sender: PeerId) -> bool {
        self.buffers.contains_key(&sender)
    }
}
