use std::collections::{btree_map, BTreeMap};

use lockstep_serde::{ByteReader, ByteWriter, SerdeErr};

use crate::types::PeerId;

/// Where a client stands in the lockstep lifecycle, as agreed on by every peer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientState {
    Master,
    WaitingForLateJoinerSync,
    CatchingUp,
    Normal,
}

impl ClientState {
    pub fn to_u8(self) -> u8 {
        match self {
            ClientState::Master => 0,
            ClientState::WaitingForLateJoinerSync => 1,
            ClientState::CatchingUp => 2,
            ClientState::Normal => 3,
        }
    }

    pub fn from_u8(value: u8) -> Result<Self, SerdeErr> {
        match value {
            0 => Ok(ClientState::Master),
            1 => Ok(ClientState::WaitingForLateJoinerSync),
            2 => Ok(ClientState::CatchingUp),
            3 => Ok(ClientState::Normal),
            other => Err(SerdeErr::InvalidValue {
                kind: "ClientState",
                value: i128::from(other),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientRecord {
    pub state: ClientState,
    pub display_name: String,
}

/// The replicated table of every client taking part in the simulation.
///
/// Ordered by peer id so that iteration and serialization are identical on
/// every peer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientTable {
    clients: BTreeMap<PeerId, ClientRecord>,
}

impl ClientTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn contains(&self, peer: PeerId) -> bool {
        self.clients.contains_key(&peer)
    }

    pub fn get(&self, peer: PeerId) -> Option<&ClientRecord> {
        self.clients.get(&peer)
    }

    pub fn state(&self, peer: PeerId) -> Option<ClientState> {
        self.clients.get(&peer).map(|record| record.state)
    }

    pub fn display_name(&self, peer: PeerId) -> Option<&str> {
        self.clients
            .get(&peer)
            .map(|record| record.display_name.as_str())
    }

    pub fn insert(&mut self, peer: PeerId, state: ClientState, display_name: String) {
        self.clients.insert(
            peer,
            ClientRecord {
                state,
                display_name,
            },
        );
    }

    /// Returns false if there is no such client
    pub fn set_state(&mut self, peer: PeerId, state: ClientState) -> bool {
        match self.clients.get_mut(&peer) {
            Some(record) => {
                record.state = state;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, peer: PeerId) -> Option<ClientRecord> {
        self.clients.remove(&peer)
    }

    pub fn clear(&mut self) {
        self.clients.clear();
    }

    pub fn peers(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.clients.keys().copied()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, PeerId, ClientRecord> {
        self.clients.iter()
    }

    /// The client currently recorded as `Master`, if any
    pub fn master(&self) -> Option<PeerId> {
        self.clients
            .iter()
            .find(|(_, record)| record.state == ClientState::Master)
            .map(|(peer, _)| *peer)
    }

    pub fn any_waiting_for_late_joiner_sync(&self) -> bool {
        self.clients
            .values()
            .any(|record| record.state == ClientState::WaitingForLateJoinerSync)
    }

    pub fn write(&self, writer: &mut ByteWriter) {
        writer.write_small_u32(self.clients.len() as u32);
        for (peer, record) in &self.clients {
            writer.write_small_u32(*peer);
            writer.write_u8(record.state.to_u8());
            writer.write_str(&record.display_name);
        }
    }

    pub fn read(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let count = reader.read_small_u32()?;
        let mut clients = BTreeMap::new();
        for _ in 0..count {
            let peer = reader.read_small_u32()?;
            let state = ClientState::from_u8(reader.read_u8()?)?;
            let display_name = reader.read_str()?;
            clients.insert(
                peer,
                ClientRecord {
                    state,
                    display_name,
                },
            );
        }
        Ok(Self { clients })
    }
}
