use thiserror::Error;

use crate::transport::ChannelKind;

/// Errors a transport reports when it could not put a payload on the wire.
/// The engine always retries the same payload on a later frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The transport declined the write, e.g. because its send window is full
    #[error("Transport rejected a {length} byte payload on the {channel:?} channel")]
    SendRejected { channel: ChannelKind, length: usize },

    /// The local peer does not currently own the channel
    #[error("Local peer does not own the {channel:?} channel")]
    NotOwner { channel: ChannelKind },
}
