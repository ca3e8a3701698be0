use thiserror::Error;

use lockstep_shared::{ActionKind, ChannelError, SnapshotError};

/// Errors returned by the fallible Lockstep operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockstepError {
    /// Import, export and similar calls need a synchronized game state
    #[error("Lockstep is not initialized yet. Wait for the Init or ClientBeginCatchUp event before calling this")]
    NotInitialized,

    /// No handler was registered for the action kind
    #[error("No action handler is registered for kind {kind}")]
    UnknownActionKind { kind: ActionKind },

    /// Kinds below the first user kind are used by the engine itself
    #[error("Action kind {kind} is reserved for internal actions. User action kinds start at {first_user_kind}")]
    ReservedActionKind {
        kind: ActionKind,
        first_user_kind: ActionKind,
    },

    /// Only one import may run at a time
    #[error("An import is already in progress")]
    ImportInProgress,

    /// Entries with an error status must not be imported
    #[error("Import contains {count} game states that cannot be imported")]
    ImportHasErrors { count: usize },

    /// Nothing would be imported
    #[error("Import request contains no game states")]
    EmptyImport,

    #[error("Action channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Errors that can occur while building a Protocol
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Protocol is locked and cannot be modified
    #[error("Protocol is already locked and cannot be modified. Protocol.lock() has been called and no further changes are allowed")]
    AlreadyLocked,

    /// Two handlers were registered for the same kind
    #[error("An action handler is already registered for kind {kind}")]
    DuplicateActionKind { kind: ActionKind },

    /// Kinds below the first user kind are used by the engine itself
    #[error("Action kind {kind} is reserved for internal actions. User action kinds start at {first_user_kind}")]
    ReservedActionKind {
        kind: ActionKind,
        first_user_kind: ActionKind,
    },

    /// Two game states share an internal name
    #[error("A game state with internal name {name:?} is already registered. Internal names must be unique")]
    DuplicateGameState { name: String },
}
