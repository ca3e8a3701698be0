//! # Lockstep Shared
//! Common functionality used by every lockstep peer: identifiers, the client
//! table, the game state contract, the chunked action channel, the tick
//! channel, the snapshot codec and the transport contract.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use lockstep_serde::{ByteReader, ByteWriter, SerdeErr};

mod channels;
mod client;
mod constants;
mod game_state;
mod snapshot;
mod time_queue;
mod transport;
mod types;

pub use channels::{
    action_sender::ActionSender,
    chunk::{split_into_chunks, Chunk, CHUNK_FINAL, CHUNK_FIRST},
    chunk_receiver::{ChunkReceiver, ReceivedAction},
    error::ChannelError,
    tick_sync::{TickSync, TickUpdate},
};
pub use client::{ClientRecord, ClientState, ClientTable};
pub use constants::{
    CHUNK_HEADER_MAX_BYTES, DEFAULT_MAX_CHUNK_SIZE, MIN_CHUNK_SIZE, SNAPSHOT_CHECKSUM_BYTES,
};
pub use game_state::{GameState, GameStateError, GameStates};
pub use snapshot::{
    error::SnapshotError,
    export::export_at,
    import::{preprocess, ImportStatus, ImportedGameState, StagedImport},
};
pub use time_queue::TimeQueue;
pub use transport::{error::TransportError, ChannelKind, Transport};
pub use types::{ActionKind, PeerId, SingletonId, Tick, UniqueId};
