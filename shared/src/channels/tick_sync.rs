use std::time::Duration;

use lockstep_serde::{ByteReader, ByteWriter, SerdeErr};

use crate::types::{Tick, UniqueId};

/// Tick channel payload: the master's current tick and the tick assignments
/// made since the previous broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickUpdate {
    pub current_tick: Tick,
    pub associations: Vec<(Tick, UniqueId)>,
}

impl TickUpdate {
    pub fn write(&self, writer: &mut ByteWriter) {
        writer.write_small_u32(self.current_tick);
        writer.write_small_u32(self.associations.len() as u32);
        for (tick, unique_id) in &self.associations {
            writer.write_small_u32(*tick);
            writer.write_small_u32(unique_id.peer());
            writer.write_small_u32(unique_id.sequence());
        }
    }

    pub fn read(bytes: &[u8]) -> Result<Self, SerdeErr> {
        let mut reader = ByteReader::new(bytes);
        let current_tick = reader.read_small_u32()?;
        let count = reader.read_small_u32()?;
        // every association takes at least three bytes
        let mut associations = Vec::with_capacity((count as usize).min(reader.remaining() / 3));
        for _ in 0..count {
            let tick = reader.read_small_u32()?;
            let peer = reader.read_small_u32()?;
            let sequence = reader.read_small_u32()?;
            associations.push((tick, UniqueId::new(peer, sequence)));
        }
        Ok(Self {
            current_tick,
            associations,
        })
    }
}

/// Master side of the tick channel.
///
/// Collects tick assignments and decides when the next broadcast is due. The
/// broadcast interval adapts: sending the same tick twice in a row means the
/// channel is chattier than needed, skipping ticks means receivers learn about
/// progress too late.
pub struct TickSync {
    associations: Vec<(Tick, UniqueId)>,
    interval: Duration,
    min_interval: Duration,
    max_interval: Duration,
    initial_interval: Duration,
    next_send_at: Duration,
    last_sent_tick: Option<Tick>,
}

impl TickSync {
    pub fn new(initial_interval: Duration, min_interval: Duration, max_interval: Duration) -> Self {
        let initial_interval = initial_interval.clamp(min_interval, max_interval.max(min_interval));
        Self {
            associations: Vec::new(),
            interval: initial_interval,
            min_interval,
            max_interval,
            initial_interval,
            next_send_at: Duration::ZERO,
            last_sent_tick: None,
        }
    }

    pub fn add_association(&mut self, tick: Tick, unique_id: UniqueId) {
        self.associations.push((tick, unique_id));
    }

    pub fn pending_associations(&self) -> &[(Tick, UniqueId)] {
        &self.associations
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn should_send(&self, now: Duration) -> bool {
        now >= self.next_send_at
    }

    pub fn build(&self, current_tick: Tick) -> Box<[u8]> {
        let update = TickUpdate {
            current_tick,
            associations: self.associations.clone(),
        };
        let mut writer = ByteWriter::with_capacity(8 + self.associations.len() * 6);
        update.write(&mut writer);
        writer.to_bytes()
    }

    /// Reports the outcome of writing the payload from [`TickSync::build`].
    /// Unsent associations are kept and the next attempt is due right away.
    pub fn on_sent(&mut self, success: bool, current_tick: Tick, now: Duration) {
        if !success {
            self.next_send_at = now;
            return;
        }

        if let Some(last_tick) = self.last_sent_tick {
            if last_tick == current_tick {
                self.interval = (self.interval * 3 / 2).min(self.max_interval);
            } else if current_tick > last_tick.saturating_add(1) {
                self.interval = (self.interval * 2 / 3).max(self.min_interval);
            }
        }
        self.last_sent_tick = Some(current_tick);
        self.associations.clear();
        self.next_send_at = now + self.interval;
    }

    pub fn reset(&mut self) {
        self.associations.clear();
        self.interval = self.initial_interval;
        self.next_send_at = Duration::ZERO;
        self.last_sent_tick = None;
    }
}
