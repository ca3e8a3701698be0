use std::{collections::BTreeSet, time::SystemTime};

use log::{info, warn};

use lockstep_shared::{export_at, preprocess, ByteReader, StagedImport, Transport};

use crate::{
    error::LockstepError, events::LockstepEvent, internal_action::InternalAction,
    lockstep::Lockstep,
};

impl<T: Transport> Lockstep<T> {
    /// Exports the given game states, named `name`, stamped with the current time
    pub fn try_export(
        &self,
        indices: &[usize],
        name: Option<&str>,
    ) -> Result<String, LockstepError> {
        if !self.is_initialized {
            return Err(LockstepError::NotInitialized);
        }
        Ok(export_at(&self.game_states, indices, name, SystemTime::now())?)
    }

    pub fn export(&self, indices: &[usize], name: Option<&str>) -> Option<String> {
        match self.try_export(indices, name) {
            Ok(text) => Some(text),
            Err(error) => {
                warn!("Export failed: {}", error);
                None
            }
        }
    }

    /// Decodes and checks a snapshot without applying anything
    pub fn try_import_preprocess(&self, text: &str) -> Result<StagedImport, LockstepError> {
        if !self.is_initialized {
            return Err(LockstepError::NotInitialized);
        }
        Ok(preprocess(text, &self.game_states)?)
    }

    pub fn import_preprocess(&self, text: &str) -> Option<StagedImport> {
        match self.try_import_preprocess(text) {
            Ok(staged) => Some(staged),
            Err(error) => {
                warn!("Import rejected: {}", error);
                None
            }
        }
    }

    /// Sends a checked snapshot to every peer. Every entry must be ready.
    pub fn try_start_import(&mut self, staged: &StagedImport) -> Result<(), LockstepError> {
        if !self.is_initialized {
            return Err(LockstepError::NotInitialized);
        }
        if self.import_remaining.is_some() {
            return Err(LockstepError::ImportInProgress);
        }
        let errors = staged
            .game_states
            .iter()
            .filter(|entry| !entry.status.is_ready())
            .count();
        if errors > 0 {
            return Err(LockstepError::ImportHasErrors { count: errors });
        }
        let entries: Vec<_> = staged
            .ready()
            .filter_map(|entry| entry.index.map(|index| (index, entry)))
            .collect();
        if entries.is_empty() {
            return Err(LockstepError::EmptyImport);
        }

        let indices = entries.iter().map(|(index, _)| *index).collect();
        let start = InternalAction::ImportStart { indices };
        self.send_raw(start.kind(), &start.to_payload())?;
        for (index, entry) in entries {
            let action = InternalAction::ImportGameState {
                index,
                data_version: entry.data_version,
                data: entry.data.to_vec(),
            };
            self.send_raw(action.kind(), &action.to_payload())?;
        }
        Ok(())
    }

    pub fn start_import(&mut self, staged: &StagedImport) -> bool {
        match self.try_start_import(staged) {
            Ok(()) => true,
            Err(error) => {
                warn!("Import not started: {}", error);
                false
            }
        }
    }

    pub(super) fn run_import_start(&mut self, indices: Vec<usize>) {
        info!("Importing {} game states", indices.len());
        self.import_remaining = Some(indices.into_iter().collect::<BTreeSet<_>>());
        self.raise_event(LockstepEvent::ImportStart);
    }

    pub(super) fn run_import_game_state(&mut self, index: usize, data_version: u32, data: Vec<u8>) {
        let error = match self.game_states.get_mut(index) {
            Some(game_state) => {
                let mut reader = ByteReader::new(&data);
                game_state
                    .deserialize(&mut reader, true, data_version)
                    .err()
                    .map(|error| error.to_string())
            }
            None => Some(format!("No game state is registered at index {}", index)),
        };
        if let Some(error) = &error {
            warn!("Game state {} failed to import: {}", index, error);
        }
        self.raise_event(LockstepEvent::ImportedOneModule { index, error });

        let finished = match self.import_remaining.as_mut() {
            Some(remaining) => {
                remaining.remove(&index);
                remaining.is_empty()
            }
            None => false,
        };
        if finished {
            self.import_remaining = None;
            info!("Import finished");
            self.raise_event(LockstepEvent::ImportFinished);
        }
    }
}
