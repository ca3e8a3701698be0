use std::any::Any;

use thiserror::Error;

use lockstep_serde::{ByteReader, ByteWriter, SerdeErr};

/// Errors a game state can report while taking in serialized data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameStateError {
    /// The data ended early or contained invalid values
    #[error("Game state data is malformed: {0}")]
    Malformed(#[from] SerdeErr),

    /// The game state understood the data but refused it
    #[error("{0}")]
    Rejected(String),
}

/// A pluggable unit of replicated, serializable state.
///
/// Game states are owned by the engine, serialized whole when a late joiner
/// needs them and, for those that opt in, exported into and imported from
/// snapshots. `internal_name` is the stable key used in exports and must
/// never change once released.
pub trait GameState: Any {
    fn internal_name(&self) -> &str;

    fn display_name(&self) -> &str;

    fn supports_import_export(&self) -> bool;

    /// Version of the data `serialize` writes right now
    fn data_version(&self) -> u32;

    /// Oldest data version `deserialize` can still read
    fn lowest_supported_data_version(&self) -> u32;

    /// `is_export` is false for late joiner transfers, which always carry the
    /// current `data_version`
    fn serialize(&self, writer: &mut ByteWriter, is_export: bool);

    fn deserialize(
        &mut self,
        reader: &mut ByteReader,
        is_import: bool,
        data_version: u32,
    ) -> Result<(), GameStateError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Game states in registration order. The index of a game state is part of the
/// wire format, so every peer must register the same game states in the same
/// order.
#[derive(Default)]
pub struct GameStates {
    states: Vec<Box<dyn GameState>>,
}

impl GameStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, state: Box<dyn GameState>) -> usize {
        self.states.push(state);
        self.states.len() - 1
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn GameState> {
        self.states.get(index).map(|state| state.as_ref())
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut (dyn GameState + 'static)> {
        self.states.get_mut(index).map(|state| state.as_mut())
    }

    pub fn index_of(&self, internal_name: &str) -> Option<usize> {
        self.states
            .iter()
            .position(|state| state.internal_name() == internal_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn GameState> {
        self.states.iter().map(|state| state.as_ref())
    }

    /// First registered game state of the concrete type `T`
    pub fn find<T: GameState>(&self) -> Option<&T> {
        self.states
            .iter()
            .find_map(|state| state.as_any().downcast_ref::<T>())
    }

    pub fn find_mut<T: GameState>(&mut self) -> Option<&mut T> {
        self.states
            .iter_mut()
            .find_map(|state| state.as_any_mut().downcast_mut::<T>())
    }
}
