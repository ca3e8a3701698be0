pub mod error;

use crate::types::PeerId;

/// The replicated byte channels the engine writes to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// One per peer, owned by that peer, carries its input actions
    Action,
    /// Owned by the master, carries late joiner state transfers
    LateJoiner,
    /// Owned by the master, carries the current tick and tick assignments
    Tick,
}

/// What the engine needs from the networking layer underneath it.
///
/// Payloads written on a channel are delivered, in order, to every other peer
/// present at the time of the write, through
/// `Lockstep::receive` on the receiving peers. Delivery of
/// a payload that failed to send is the engine's job: it resubmits the same
/// payload on a later frame.
pub trait Transport {
    /// Id of the local peer, never 0
    fn local_peer(&self) -> PeerId;

    /// Name shown for the local peer in the client table
    fn local_display_name(&self) -> String;

    /// Whether the membership authority currently designates the local peer
    /// as primary (the oldest, network authoritative peer)
    fn is_primary(&self) -> bool;

    /// Whether the given peer is currently connected
    fn is_present(&self, peer: PeerId) -> bool;

    /// Makes the local peer the owner of a master owned channel
    fn take_ownership(&mut self, channel: ChannelKind);

    /// Writes one payload to every other peer
    fn send(&mut self, channel: ChannelKind, payload: &[u8]) -> Result<(), error::TransportError>;
}
