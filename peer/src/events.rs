use std::vec::IntoIter;

use lockstep_shared::{PeerId, Tick};

/// Something that happened inside the lockstep simulation. Apart from `Tick`
/// every event is raised on every peer in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockstepEvent {
    /// The very first peer started the session
    Init,
    ClientJoined(PeerId),
    /// A late joiner received its state and starts replaying ticks. Raised
    /// locally on the joiner itself before any game state is deserialized.
    ClientBeginCatchUp(PeerId),
    ClientCaughtUp(PeerId),
    ClientLeft(PeerId),
    MasterChanged {
        old: Option<PeerId>,
        new: PeerId,
    },
    /// One tick finished executing. Only delivered to listeners.
    Tick(Tick),
    ImportStart,
    ImportedOneModule {
        index: usize,
        error: Option<String>,
    },
    ImportFinished,
}

/// Events queued for consumers outside the simulation, in the order they were raised
#[derive(Default)]
pub struct Events {
    events: Vec<LockstepEvent>,
}

impl Events {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LockstepEvent> {
        self.events.iter()
    }

    pub(crate) fn push(&mut self, event: LockstepEvent) {
        self.events.push(event);
    }
}

impl IntoIterator for Events {
    type Item = LockstepEvent;
    type IntoIter = IntoIter<LockstepEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
