/// Test protocol shared by every peer of a test session: a counter game state
/// recording which action ran on which tick, a note board that never leaves
/// the session, and a trace of what each peer observed in which order

use std::any::Any;
use std::sync::{Arc, Mutex};

use lockstep_peer::{
    shared::{ByteReader, ByteWriter, GameState, GameStateError, PeerId, SerdeErr, Tick, UniqueId},
    LockstepContext, LockstepEvent, Protocol, FIRST_USER_ACTION_KIND,
};

pub const ADD: u32 = FIRST_USER_ACTION_KIND;
pub const ADD_ONCE: u32 = FIRST_USER_ACTION_KIND + 1;
pub const NOTE: u32 = FIRST_USER_ACTION_KIND + 2;

pub const COUNTER_INDEX: usize = 0;
pub const NOTES_INDEX: usize = 1;

/// What one peer observed, in order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Observation {
    Event(LockstepEvent),
    Deserialize { name: String, is_import: bool },
}

#[derive(Clone, Default)]
pub struct Trace {
    observations: Arc<Mutex<Vec<Observation>>>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, observation: Observation) {
        self.observations.lock().unwrap().push(observation);
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.observations.lock().unwrap().clone()
    }

    pub fn position(&self, predicate: impl Fn(&Observation) -> bool) -> Option<usize> {
        self.observations.lock().unwrap().iter().position(predicate)
    }

    pub fn count(&self, predicate: impl Fn(&Observation) -> bool) -> usize {
        self.observations
            .lock()
            .unwrap()
            .iter()
            .filter(|observation| predicate(observation))
            .count()
    }
}

/// One executed `ADD`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    pub tick: Tick,
    pub unique_id: UniqueId,
    pub amount: i64,
}

pub struct Counter {
    pub total: i64,
    pub entries: Vec<Entry>,
    pub data_version: u32,
    trace: Trace,
}

impl Counter {
    pub fn new(trace: Trace) -> Self {
        Self {
            total: 0,
            entries: Vec::new(),
            data_version: 2,
            trace,
        }
    }

    pub fn amounts(&self) -> Vec<i64> {
        self.entries.iter().map(|entry| entry.amount).collect()
    }
}

impl GameState for Counter {
    fn internal_name(&self) -> &str {
        "counter"
    }

    fn display_name(&self) -> &str {
        "Counter"
    }

    fn supports_import_export(&self) -> bool {
        true
    }

    fn data_version(&self) -> u32 {
        self.data_version
    }

    fn lowest_supported_data_version(&self) -> u32 {
        1
    }

    fn serialize(&self, writer: &mut ByteWriter, _is_export: bool) {
        writer.write_small_i64(self.total);
        writer.write_small_u32(self.entries.len() as u32);
        for entry in &self.entries {
            writer.write_small_u32(entry.tick);
            writer.write_u64(entry.unique_id.to_u64());
            writer.write_small_i64(entry.amount);
        }
    }

    fn deserialize(
        &mut self,
        reader: &mut ByteReader,
        is_import: bool,
        data_version: u32,
    ) -> Result<(), GameStateError> {
        self.trace.push(Observation::Deserialize {
            name: self.internal_name().to_string(),
            is_import,
        });
        let total = reader.read_small_i64()?;
        let mut entries = Vec::new();
        // version 1 only carried the total
        if data_version >= 2 {
            let count = reader.read_small_u32()?;
            for _ in 0..count {
                entries.push(Entry {
                    tick: reader.read_small_u32()?,
                    unique_id: UniqueId::from_u64(reader.read_u64()?),
                    amount: reader.read_small_i64()?,
                });
            }
        }
        if !reader.is_empty() {
            return Err(GameStateError::Rejected(format!(
                "{} unexpected bytes after the counter",
                reader.remaining()
            )));
        }
        self.total = total;
        self.entries = entries;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Replicated to late joiners but never exported
#[derive(Default)]
pub struct Notes {
    pub notes: Vec<String>,
}

impl GameState for Notes {
    fn internal_name(&self) -> &str {
        "notes"
    }

    fn display_name(&self) -> &str {
        "Notes"
    }

    fn supports_import_export(&self) -> bool {
        false
    }

    fn data_version(&self) -> u32 {
        1
    }

    fn lowest_supported_data_version(&self) -> u32 {
        1
    }

    fn serialize(&self, writer: &mut ByteWriter, _is_export: bool) {
        writer.write_small_u32(self.notes.len() as u32);
        for note in &self.notes {
            writer.write_str(note);
        }
    }

    fn deserialize(
        &mut self,
        reader: &mut ByteReader,
        _is_import: bool,
        _data_version: u32,
    ) -> Result<(), GameStateError> {
        let count = reader.read_small_u32()?;
        let mut notes = Vec::new();
        for _ in 0..count {
            notes.push(reader.read_str()?);
        }
        self.notes = notes;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub fn add_payload(amount: i64) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_small_i64(amount);
    writer.into_bytes()
}

pub fn add_once_payload(responsible: PeerId, amount: i64) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_small_u32(responsible);
    writer.write_small_i64(amount);
    writer.into_bytes()
}

pub fn note_payload(note: &str) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_str(note);
    writer.into_bytes()
}

fn run_add(context: &mut LockstepContext<'_>, reader: &mut ByteReader<'_>) -> Result<(), SerdeErr> {
    let amount = reader.read_small_i64()?;
    let tick = context.tick();
    let unique_id = context.unique_id();
    if let Some(counter) = context.game_state_mut::<Counter>() {
        counter.total += amount;
        counter.entries.push(Entry {
            tick,
            unique_id,
            amount,
        });
    }
    Ok(())
}

/// Asks for an `ADD` that runs exactly once, sent by `responsible`
fn run_add_once(
    context: &mut LockstepContext<'_>,
    reader: &mut ByteReader<'_>,
) -> Result<(), SerdeErr> {
    let responsible = reader.read_small_u32()?;
    let amount = reader.read_small_i64()?;
    context.send_singleton_action(responsible, ADD, add_payload(amount));
    Ok(())
}

fn run_note(
    context: &mut LockstepContext<'_>,
    reader: &mut ByteReader<'_>,
) -> Result<(), SerdeErr> {
    let note = reader.read_str()?;
    if let Some(notes) = context.game_state_mut::<Notes>() {
        notes.notes.push(note);
    }
    Ok(())
}

/// Builds the protocol every test peer uses, recording into `trace`
pub fn protocol(trace: Trace) -> Protocol {
    let listener_trace = trace.clone();
    let mut protocol = Protocol::builder();
    protocol
        .add_action(ADD, run_add)
        .add_action(ADD_ONCE, run_add_once)
        .add_action(NOTE, run_note)
        .add_game_state(Counter::new(trace))
        .add_game_state(Notes::default())
        .add_listener(move |event, _context| {
            if !matches!(event, LockstepEvent::Tick(_)) {
                listener_trace.push(Observation::Event(event.clone()));
            }
        });
    protocol.build()
}
