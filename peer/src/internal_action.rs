use lockstep_shared::{ActionKind, ByteReader, ByteWriter, PeerId, SerdeErr, SingletonId};

// Kinds below FIRST_USER_ACTION_KIND are run by the engine itself
pub(crate) const CLIENT_JOINED: ActionKind = 0;
pub(crate) const CLIENT_BEGIN_CATCH_UP: ActionKind = 1;
pub(crate) const CLIENT_CAUGHT_UP: ActionKind = 2;
pub(crate) const CLIENT_LEFT: ActionKind = 3;
pub(crate) const MASTER_CHANGED: ActionKind = 4;
pub(crate) const SINGLETON: ActionKind = 5;
pub(crate) const IMPORT_START: ActionKind = 6;
pub(crate) const IMPORT_GAME_STATE: ActionKind = 7;

/// Lowest action kind available to user handlers
pub const FIRST_USER_ACTION_KIND: ActionKind = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InternalAction {
    ClientJoined { display_name: String },
    ClientBeginCatchUp,
    ClientCaughtUp,
    ClientLeft { peer: PeerId },
    MasterChanged { old: Option<PeerId> },
    Singleton {
        id: SingletonId,
        kind: ActionKind,
        payload: Vec<u8>,
    },
    ImportStart { indices: Vec<usize> },
    ImportGameState {
        index: usize,
        data_version: u32,
        data: Vec<u8>,
    },
}

impl InternalAction {
    pub(crate) fn kind(&self) -> ActionKind {
        match self {
            InternalAction::ClientJoined { .. } => CLIENT_JOINED,
            InternalAction::ClientBeginCatchUp => CLIENT_BEGIN_CATCH_UP,
            InternalAction::ClientCaughtUp => CLIENT_CAUGHT_UP,
            InternalAction::ClientLeft { .. } => CLIENT_LEFT,
            InternalAction::MasterChanged { .. } => MASTER_CHANGED,
            InternalAction::Singleton { .. } => SINGLETON,
            InternalAction::ImportStart { .. } => IMPORT_START,
            InternalAction::ImportGameState { .. } => IMPORT_GAME_STATE,
        }
    }

    pub(crate) fn to_payload(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        match self {
            InternalAction::ClientJoined { display_name } => writer.write_str(display_name),
            InternalAction::ClientBeginCatchUp | InternalAction::ClientCaughtUp => {}
            InternalAction::ClientLeft { peer } => writer.write_small_u32(*peer),
            // 0 is never a peer
            InternalAction::MasterChanged { old } => writer.write_small_u32(old.unwrap_or(0)),
            InternalAction::Singleton { id, kind, payload } => {
                writer.write_small_u32(*id);
                writer.write_small_u32(*kind);
                writer.write_bytes(payload);
            }
            InternalAction::ImportStart { indices } => {
                writer.write_small_u32(indices.len() as u32);
                for index in indices {
                    writer.write_small_u32(*index as u32);
                }
            }
            InternalAction::ImportGameState {
                index,
                data_version,
                data,
            } => {
                writer.write_small_u32(*index as u32);
                writer.write_small_u32(*data_version);
                writer.write_bytes(data);
            }
        }
        writer.into_bytes()
    }

    pub(crate) fn read(kind: ActionKind, reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let action = match kind {
            CLIENT_JOINED => InternalAction::ClientJoined {
                display_name: reader.read_str()?,
            },
            CLIENT_BEGIN_CATCH_UP => InternalAction::ClientBeginCatchUp,
            CLIENT_CAUGHT_UP => InternalAction::ClientCaughtUp,
            CLIENT_LEFT => InternalAction::ClientLeft {
                peer: reader.read_small_u32()?,
            },
            MASTER_CHANGED => {
                let old = reader.read_small_u32()?;
                InternalAction::MasterChanged {
                    old: (old != 0).then_some(old),
                }
            }
            SINGLETON => InternalAction::Singleton {
                id: reader.read_small_u32()?,
                kind: reader.read_small_u32()?,
                payload: reader.read_remaining().to_vec(),
            },
            IMPORT_START => {
                let count = reader.read_small_u32()?;
                let mut indices = Vec::with_capacity((count as usize).min(reader.remaining()));
                for _ in 0..count {
                    indices.push(reader.read_small_u32()? as usize);
                }
                InternalAction::ImportStart { indices }
            }
            IMPORT_GAME_STATE => InternalAction::ImportGameState {
                index: reader.read_small_u32()? as usize,
                data_version: reader.read_small_u32()?,
                data: reader.read_remaining().to_vec(),
            },
            other => {
                return Err(SerdeErr::InvalidValue {
                    kind: "internal action kind",
                    value: i128::from(other),
                })
            }
        };
        Ok(action)
    }
}
