use std::collections::VecDeque;

use crate::{
    channels::{chunk::split_into_chunks, error::ChannelError},
    constants::MIN_CHUNK_SIZE,
    types::{ActionKind, PeerId, UniqueId},
};

/// Sending half of a peer owned action channel.
///
/// Payloads are split into chunks up front and queued. The owner drains one
/// chunk per frame: [`ActionSender::front`] to look at it,
/// [`ActionSender::on_sent`] once the transport accepted or refused it. A
/// refused chunk stays at the front and is offered again.
pub struct ActionSender {
    local_peer: PeerId,
    next_sequence: u32,
    max_chunk_size: usize,
    queue: VecDeque<Box<[u8]>>,
}

impl ActionSender {
    pub fn new(max_chunk_size: usize) -> Self {
        Self {
            local_peer: 0,
            next_sequence: 1,
            max_chunk_size,
            queue: VecDeque::new(),
        }
    }

    pub fn local_peer(&self) -> PeerId {
        self.local_peer
    }

    pub fn set_local_peer(&mut self, peer: PeerId) {
        self.local_peer = peer;
    }

    /// Hands out the next unique id without queueing anything
    pub fn allocate_id(&mut self) -> Result<UniqueId, ChannelError> {
        if self.local_peer == 0 {
            return Err(ChannelError::NoOwner);
        }
        let sequence = self.next_sequence;
        self.next_sequence = sequence
            .checked_add(1)
            .ok_or(ChannelError::SequenceExhausted {
                peer: self.local_peer,
            })?;
        Ok(UniqueId::new(self.local_peer, sequence))
    }

    /// Queues a payload and returns the unique id it will arrive with
    pub fn submit(&mut self, kind: ActionKind, payload: &[u8]) -> Result<UniqueId, ChannelError> {
        if self.max_chunk_size < MIN_CHUNK_SIZE {
            return Err(ChannelError::ChunkSizeTooSmall {
                max_chunk_size: self.max_chunk_size,
                minimum: MIN_CHUNK_SIZE,
            });
        }
        let unique_id = self.allocate_id()?;
        let chunks = split_into_chunks(unique_id, kind, payload, self.max_chunk_size)?;
        self.queue.extend(chunks);
        Ok(unique_id)
    }

    /// The chunk that should be written next
    pub fn front(&self) -> Option<&[u8]> {
        self.queue.front().map(|chunk| chunk.as_ref())
    }

    pub fn on_sent(&mut self, success: bool) {
        if success {
            self.queue.pop_front();
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn pending_chunks(&self) -> usize {
        self.queue.len()
    }

    /// Drops every queued chunk. Ids already handed out stay used.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
