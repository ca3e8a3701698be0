use std::time::SystemTime;

use lockstep_serde::ByteReader;

use crate::{
    constants::SNAPSHOT_CHECKSUM_BYTES,
    game_state::GameStates,
    snapshot::{checksum, error::SnapshotError},
};

/// Whether one game state entry of a snapshot can be applied to this world
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportStatus {
    Ready,
    NotPresent,
    NoLongerSupportsImport,
    VersionTooNew,
    VersionTooOld,
}

impl ImportStatus {
    pub fn is_ready(self) -> bool {
        self == ImportStatus::Ready
    }

    pub fn error_message(self) -> Option<&'static str> {
        match self {
            ImportStatus::Ready => None,
            ImportStatus::NotPresent => Some("This game state does not exist in this world."),
            ImportStatus::NoLongerSupportsImport => {
                Some("This game state no longer supports being imported.")
            }
            ImportStatus::VersionTooNew => Some(
                "The exported data is newer than this world understands. Update and try again.",
            ),
            ImportStatus::VersionTooOld => {
                Some("The exported data is too old to be imported by this world.")
            }
        }
    }
}

/// One decoded, not yet applied, game state entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportedGameState {
    pub internal_name: String,
    pub display_name: String,
    pub data_version: u32,
    pub data: Box<[u8]>,
    /// Index of the matching local game state, if there is one
    pub index: Option<usize>,
    pub status: ImportStatus,
}

/// A verified and parsed snapshot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedImport {
    pub exported_at: SystemTime,
    pub name: Option<String>,
    pub game_states: Vec<ImportedGameState>,
}

impl StagedImport {
    pub fn has_errors(&self) -> bool {
        self.game_states.iter().any(|entry| !entry.status.is_ready())
    }

    pub fn ready(&self) -> impl Iterator<Item = &ImportedGameState> {
        self.game_states.iter().filter(|entry| entry.status.is_ready())
    }
}

/// Decodes and verifies a snapshot text, and checks every entry against the
/// local game states. Nothing is applied.
pub fn preprocess(text: &str, game_states: &GameStates) -> Result<StagedImport, SnapshotError> {
    let bytes = base64::decode(text).map_err(|error| SnapshotError::InvalidEncoding {
        reason: error.to_string(),
    })?;

    if bytes.len() < SNAPSHOT_CHECKSUM_BYTES {
        return Err(SnapshotError::TooShort {
            length: bytes.len(),
            minimum: SNAPSHOT_CHECKSUM_BYTES,
        });
    }
    let (body, trailer) = bytes.split_at(bytes.len() - SNAPSHOT_CHECKSUM_BYTES);
    let expected = ByteReader::new(trailer).read_u32()?;
    let actual = checksum(body);
    if expected != actual {
        return Err(SnapshotError::ChecksumMismatch { expected, actual });
    }

    let mut reader = ByteReader::new(body);
    let exported_at = reader.read_timestamp()?;
    let name = if reader.read_bool()? {
        Some(reader.read_str()?)
    } else {
        None
    };

    let count = reader.read_small_u32()?;
    let mut entries = Vec::new();
    for _ in 0..count {
        let internal_name = reader.read_str()?;
        let display_name = reader.read_str()?;
        let data_version = reader.read_small_u32()?;
        let length = reader.read_small_u32()? as usize;
        let data: Box<[u8]> = reader.read_bytes(length)?.into();

        let index = game_states.index_of(&internal_name);
        let status = match index.and_then(|index| game_states.get(index)) {
            None => ImportStatus::NotPresent,
            Some(state) if !state.supports_import_export() => {
                ImportStatus::NoLongerSupportsImport
            }
            Some(state) if data_version > state.data_version() => ImportStatus::VersionTooNew,
            Some(state) if data_version < state.lowest_supported_data_version() => {
                ImportStatus::VersionTooOld
            }
            Some(_) => ImportStatus::Ready,
        };

        entries.push(ImportedGameState {
            internal_name,
            display_name,
            data_version,
            data,
            index,
            status,
        });
    }

    if !reader.is_empty() {
        return Err(SnapshotError::TrailingBytes {
            count: reader.remaining(),
        });
    }

    Ok(StagedImport {
        exported_at,
        name,
        game_states: entries,
    })
}
