use std::collections::BTreeMap;

use lockstep_shared::{ActionKind, ByteReader, GameState, GameStates, SerdeErr};

use crate::{
    context::LockstepContext, error::ProtocolError, events::LockstepEvent,
    internal_action::FIRST_USER_ACTION_KIND,
};

pub type ActionHandler =
    Box<dyn FnMut(&mut LockstepContext<'_>, &mut ByteReader<'_>) -> Result<(), SerdeErr>>;
pub type Listener = Box<dyn FnMut(&LockstepEvent, &mut LockstepContext<'_>)>;

/// The registration table every peer of a session builds identically at
/// startup: action handlers by kind, game states in order, and listeners.
#[derive(Default)]
pub struct Protocol {
    handlers: BTreeMap<ActionKind, ActionHandler>,
    game_states: GameStates,
    listeners: Vec<Listener>,
    locked: bool,
}

impl Protocol {
    pub fn builder() -> Self {
        Self::default()
    }

    /// Registers the handler for one action kind. Kinds must be at least
    /// [`FIRST_USER_ACTION_KIND`].
    pub fn add_action<F>(&mut self, kind: ActionKind, handler: F) -> &mut Self
    where
        F: FnMut(&mut LockstepContext<'_>, &mut ByteReader<'_>) -> Result<(), SerdeErr> + 'static,
    {
        if let Err(error) = self.try_add_action(kind, handler) {
            panic!("{}", error);
        }
        self
    }

    /// Registers a game state. Registration order is part of the wire format.
    pub fn add_game_state<G: GameState>(&mut self, game_state: G) -> &mut Self {
        if let Err(error) = self.try_add_game_state(game_state) {
            panic!("{}", error);
        }
        self
    }

    /// Registers a listener that sees every event inside the simulation
    pub fn add_listener<F>(&mut self, listener: F) -> &mut Self
    where
        F: FnMut(&LockstepEvent, &mut LockstepContext<'_>) + 'static,
    {
        if let Err(error) = self.try_add_listener(listener) {
            panic!("{}", error);
        }
        self
    }

    // Non-panicking builder methods

    pub fn try_add_action<F>(
        &mut self,
        kind: ActionKind,
        handler: F,
    ) -> Result<&mut Self, ProtocolError>
    where
        F: FnMut(&mut LockstepContext<'_>, &mut ByteReader<'_>) -> Result<(), SerdeErr> + 'static,
    {
        self.try_check_lock()?;
        if kind < FIRST_USER_ACTION_KIND {
            return Err(ProtocolError::ReservedActionKind {
                kind,
                first_user_kind: FIRST_USER_ACTION_KIND,
            });
        }
        if self.handlers.contains_key(&kind) {
            return Err(ProtocolError::DuplicateActionKind { kind });
        }
        self.handlers.insert(kind, Box::new(handler));
        Ok(self)
    }

    pub fn try_add_game_state<G: GameState>(
        &mut self,
        game_state: G,
    ) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        if self.game_states.index_of(game_state.internal_name()).is_some() {
            return Err(ProtocolError::DuplicateGameState {
                name: game_state.internal_name().to_string(),
            });
        }
        self.game_states.add(Box::new(game_state));
        Ok(self)
    }

    pub fn try_add_listener<F>(&mut self, listener: F) -> Result<&mut Self, ProtocolError>
    where
        F: FnMut(&LockstepEvent, &mut LockstepContext<'_>) + 'static,
    {
        self.try_check_lock()?;
        self.listeners.push(Box::new(listener));
        Ok(self)
    }

    pub fn has_action(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn try_lock(&mut self) -> Result<(), ProtocolError> {
        self.try_check_lock()?;
        self.locked = true;
        Ok(())
    }

    pub fn lock(&mut self) {
        self.check_lock();
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Checks if protocol is locked without panicking
    pub fn try_check_lock(&self) -> Result<(), ProtocolError> {
        if self.locked {
            Err(ProtocolError::AlreadyLocked)
        } else {
            Ok(())
        }
    }

    /// Checks if protocol is locked, panics if it is
    pub fn check_lock(&self) {
        if self.locked {
            panic!("Protocol already locked!");
        }
    }

    pub fn build(&mut self) -> Self {
        std::mem::take(self)
    }

    pub(crate) fn into_parts(
        self,
    ) -> (BTreeMap<ActionKind, ActionHandler>, GameStates, Vec<Listener>) {
        (self.handlers, self.game_states, self.listeners)
    }
}
