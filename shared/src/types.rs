use std::fmt;

/// Discrete simulation step
pub type Tick = u32;
/// Transport level identity of a peer, 0 is never a valid peer
pub type PeerId = u32;
/// Numeric id of a registered input action handler
pub type ActionKind = u32;
/// Id of a singleton action ticket
pub type SingletonId = u32;

/// Globally unique identifier of one submitted input action.
///
/// The sending peer lives in the high 32 bits and that peer's own
/// monotonically increasing sequence number in the low 32 bits. It is the
/// join key between "payload arrived" and "tick assigned", which can happen
/// in either order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct UniqueId(u64);

impl UniqueId {
    /// Reserved, never assigned to an action
    pub const INVALID: UniqueId = UniqueId(0);

    pub fn new(peer: PeerId, sequence: u32) -> Self {
        Self((u64::from(peer) << 32) | u64::from(sequence))
    }

    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }

    pub fn to_u64(self) -> u64 {
        self.0
    }

    pub fn peer(self) -> PeerId {
        (self.0 >> 32) as PeerId
    }

    pub fn sequence(self) -> u32 {
        self.0 as u32
    }

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UniqueId({}:{})", self.peer(), self.sequence())
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.peer(), self.sequence())
    }
}
