use lockstep_shared::{
    ActionKind, ClientState, ClientTable, GameState, GameStates, PeerId, Tick, UniqueId,
};

/// A send requested from inside the simulation, carried out once the handler returns
pub(crate) enum Outgoing {
    Action {
        kind: ActionKind,
        payload: Vec<u8>,
    },
    Singleton {
        responsible: PeerId,
        kind: ActionKind,
        payload: Vec<u8>,
    },
}

/// What action handlers and listeners get to see and touch.
///
/// Everything reachable from here is identical on every peer at the same
/// point of the simulation, except `local_peer`.
pub struct LockstepContext<'a> {
    tick: Tick,
    unique_id: UniqueId,
    local_peer: PeerId,
    clients: &'a ClientTable,
    game_states: &'a mut GameStates,
    outbox: &'a mut Vec<Outgoing>,
}

impl<'a> LockstepContext<'a> {
    pub(crate) fn new(
        tick: Tick,
        unique_id: UniqueId,
        local_peer: PeerId,
        clients: &'a ClientTable,
        game_states: &'a mut GameStates,
        outbox: &'a mut Vec<Outgoing>,
    ) -> Self {
        Self {
            tick,
            unique_id,
            local_peer,
            clients,
            game_states,
            outbox,
        }
    }

    /// Tick currently executing
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Unique id of the action being run, `UniqueId::INVALID` for events
    pub fn unique_id(&self) -> UniqueId {
        self.unique_id
    }

    /// Peer that sent the action being run
    pub fn sender(&self) -> PeerId {
        self.unique_id.peer()
    }

    pub fn local_peer(&self) -> PeerId {
        self.local_peer
    }

    pub fn is_local_sender(&self) -> bool {
        self.unique_id.is_valid() && self.unique_id.peer() == self.local_peer
    }

    pub fn clients(&self) -> &ClientTable {
        self.clients
    }

    pub fn client_state(&self, peer: PeerId) -> Option<ClientState> {
        self.clients.state(peer)
    }

    pub fn game_states(&self) -> &GameStates {
        self.game_states
    }

    pub fn game_state<T: GameState>(&self) -> Option<&T> {
        self.game_states.find::<T>()
    }

    pub fn game_state_mut<T: GameState>(&mut self) -> Option<&mut T> {
        self.game_states.find_mut::<T>()
    }

    /// Sends an action from the local peer. Only call this for the local
    /// peer's own input, e.g. when `is_local_sender()`, or every peer sends it.
    pub fn send_action(&mut self, kind: ActionKind, payload: Vec<u8>) {
        self.outbox.push(Outgoing::Action { kind, payload });
    }

    /// Sends an action exactly once across all peers.
    ///
    /// Must be called on every peer at the same point of the simulation. Only
    /// `responsible` actually sends it; if that peer leaves before it did, the
    /// master sends it instead.
    pub fn send_singleton_action(
        &mut self,
        responsible: PeerId,
        kind: ActionKind,
        payload: Vec<u8>,
    ) {
        self.outbox.push(Outgoing::Singleton {
            responsible,
            kind,
            payload,
        });
    }
}
