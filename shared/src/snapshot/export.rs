use std::time::SystemTime;

use lockstep_serde::ByteWriter;

use crate::{
    game_state::GameStates,
    snapshot::{checksum, error::SnapshotError},
};

/// Serializes the given game states into a portable, checksummed text.
///
/// Indices are written in the requested order; duplicates and game states
/// that do not support export are skipped.
pub fn export_at(
    game_states: &GameStates,
    indices: &[usize],
    name: Option<&str>,
    timestamp: SystemTime,
) -> Result<String, SnapshotError> {
    if let Some(name) = name {
        if name.contains(['\n', '\r']) {
            return Err(SnapshotError::InvalidName {
                name: name.to_string(),
            });
        }
    }

    let mut selected: Vec<usize> = Vec::with_capacity(indices.len());
    for index in indices {
        let state = game_states
            .get(*index)
            .ok_or(SnapshotError::UnknownGameState { index: *index })?;
        if state.supports_import_export() && !selected.contains(index) {
            selected.push(*index);
        }
    }
    if selected.is_empty() {
        return Err(SnapshotError::NothingExportable);
    }

    let mut writer = ByteWriter::new();
    writer.write_timestamp(timestamp);
    writer.write_bool(name.is_some());
    if let Some(name) = name {
        writer.write_str(name);
    }
    writer.write_small_u32(selected.len() as u32);

    let mut module_writer = ByteWriter::new();
    for index in selected {
        let Some(state) = game_states.get(index) else {
            continue;
        };
        module_writer.reset();
        state.serialize(&mut module_writer, true);

        writer.write_str(state.internal_name());
        writer.write_str(state.display_name());
        writer.write_small_u32(state.data_version());
        writer.write_small_u32(module_writer.len() as u32);
        writer.write_bytes(module_writer.as_slice());
    }

    let crc = checksum(writer.as_slice());
    writer.write_u32(crc);

    Ok(base64::encode(writer.as_slice()))
}
