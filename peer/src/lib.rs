//! # Lockstep Peer
//! A lockstep engine for sessions without a server: every peer runs the same
//! input actions, in the same order, on the same tick. One peer, the master,
//! decides which tick each action runs in; the others follow. Late joiners
//! receive the full state from the master and replay from there, and when
//! the master leaves the next primary peer takes over.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use lockstep_shared::{
        ByteReader, ByteWriter, ChannelKind, ClientRecord, ClientState, ClientTable, GameState,
        GameStateError, GameStates, ImportStatus, ImportedGameState, PeerId, SerdeErr,
        SnapshotError, StagedImport, Tick, Transport, TransportError, UniqueId,
    };
}

mod config;
mod context;
mod error;
mod events;
mod internal_action;
mod lockstep;
mod protocol;

pub use config::LockstepConfig;
pub use context::LockstepContext;
pub use error::{LockstepError, ProtocolError};
pub use events::{Events, LockstepEvent};
pub use internal_action::FIRST_USER_ACTION_KIND;
pub use lockstep::Lockstep;
pub use protocol::{ActionHandler, Listener, Protocol};
