use std::collections::BTreeMap;

use log::{debug, warn};

use lockstep_shared::{
    ActionKind, ByteReader, ByteWriter, PeerId, SerdeErr, SingletonId, Transport, UniqueId,
};

use crate::{
    internal_action::{InternalAction, FIRST_USER_ACTION_KIND},
    lockstep::Lockstep,
};

/// An action that must be sent exactly once, by whichever peer ends up responsible
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct SingletonTicket {
    responsible: PeerId,
    kind: ActionKind,
    payload: Vec<u8>,
}

/// Outstanding singleton tickets. Part of the replicated state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(super) struct Singletons {
    next_id: SingletonId,
    tickets: BTreeMap<SingletonId, SingletonTicket>,
}

impl Singletons {
    pub(super) fn len(&self) -> usize {
        self.tickets.len()
    }

    pub(super) fn write(&self, writer: &mut ByteWriter) {
        writer.write_small_u32(self.next_id);
        writer.write_small_u32(self.tickets.len() as u32);
        for (id, ticket) in &self.tickets {
            writer.write_small_u32(*id);
            writer.write_small_u32(ticket.responsible);
            writer.write_small_u32(ticket.kind);
            writer.write_small_u32(ticket.payload.len() as u32);
            writer.write_bytes(&ticket.payload);
        }
    }

    pub(super) fn read(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let next_id = reader.read_small_u32()?;
        let count = reader.read_small_u32()?;
        let mut tickets = BTreeMap::new();
        for _ in 0..count {
            let id = reader.read_small_u32()?;
            let responsible = reader.read_small_u32()?;
            let kind = reader.read_small_u32()?;
            let length = reader.read_small_u32()? as usize;
            let payload = reader.read_bytes(length)?.to_vec();
            tickets.insert(
                id,
                SingletonTicket {
                    responsible,
                    kind,
                    payload,
                },
            );
        }
        Ok(Self { next_id, tickets })
    }
}

impl<T: Transport> Lockstep<T> {
    /// Runs on every peer at the same point of the simulation
    pub(super) fn request_singleton(
        &mut self,
        responsible: PeerId,
        kind: ActionKind,
        payload: Vec<u8>,
    ) {
        if kind < FIRST_USER_ACTION_KIND || !self.handlers.contains_key(&kind) {
            warn!("Ignoring singleton action of unknown kind {}", kind);
            return;
        }
        let responsible = if self.clients.contains(responsible) {
            responsible
        } else {
            self.clients.master().unwrap_or(responsible)
        };

        let id = self.singletons.next_id;
        self.singletons.next_id = id.wrapping_add(1);
        self.singletons.tickets.insert(
            id,
            SingletonTicket {
                responsible,
                kind,
                payload,
            },
        );

        if responsible == self.local_peer {
            self.send_singleton(id);
        }
    }

    fn send_singleton(&mut self, id: SingletonId) {
        let Some(ticket) = self.singletons.tickets.get(&id) else {
            return;
        };
        let action = InternalAction::Singleton {
            id,
            kind: ticket.kind,
            payload: ticket.payload.clone(),
        };
        self.send_internal(action);
    }

    /// Only the first copy of a singleton action runs
    pub(super) fn run_singleton(
        &mut self,
        unique_id: UniqueId,
        id: SingletonId,
        kind: ActionKind,
        payload: Vec<u8>,
    ) {
        if self.singletons.tickets.remove(&id).is_none() {
            debug!("Singleton action {} already ran", id);
            return;
        }
        self.run_user_action(unique_id, kind, &payload);
    }

    /// Hands the tickets of a departed peer to the master, who sends them
    pub(super) fn reassign_singletons(&mut self, departed: PeerId) {
        let Some(master) = self.clients.master() else {
            return;
        };
        let mut reassigned = Vec::new();
        for (id, ticket) in self.singletons.tickets.iter_mut() {
            if ticket.responsible == departed {
                ticket.responsible = master;
                reassigned.push(*id);
            }
        }
        if master == self.local_peer {
            for id in reassigned {
                self.send_singleton(id);
            }
        }
    }
}
