use std::{collections::VecDeque, mem, time::Duration};

use log::{debug, info, warn};

use lockstep_shared::{
    ActionKind, ByteReader, ByteWriter, ClientState, ClientTable, PeerId, ReceivedAction, SerdeErr,
    Tick, Transport, UniqueId,
};

use crate::{
    events::LockstepEvent,
    internal_action::InternalAction,
    lockstep::{singleton::Singletons, CatchUpReason, Lockstep, Timer},
};

// Piece kinds on the late joiner channel, sent in this order
const CLIENTS_PIECE: ActionKind = 0;
const SINGLETONS_PIECE: ActionKind = 1;
const GAME_STATE_PIECE: ActionKind = 2;
const CURRENT_TICK_PIECE: ActionKind = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum ExpectedPiece {
    #[default]
    Clients,
    Singletons,
    GameState(usize),
    CurrentTick,
}

#[derive(Default)]
pub(super) struct LateJoinerState {
    // joining side
    waiting: bool,
    expected: ExpectedPiece,
    staged_clients: Option<ClientTable>,
    staged_singletons: Option<Singletons>,
    staged_game_states: Vec<(usize, Box<[u8]>)>,
    /// Received game states still to be deserialized, one per interval
    applying: Option<VecDeque<(usize, Box<[u8]>)>>,
    last_data_at: Duration,

    // master side
    send_generation: u32,
    recent_joins: VecDeque<Duration>,
}

impl LateJoinerState {
    pub(super) fn is_syncing(&self) -> bool {
        self.waiting || self.applying.is_some()
    }

    fn restart_staging(&mut self) {
        self.expected = ExpectedPiece::Clients;
        self.staged_clients = None;
        self.staged_singletons = None;
        self.staged_game_states.clear();
    }
}

impl<T: Transport> Lockstep<T> {
    // Joining side

    pub(super) fn start_late_joining(&mut self) {
        info!(
            "Peer {} joins a running session, requesting its state",
            self.local_peer
        );
        self.late_joiner.waiting = true;
        self.late_joiner.restart_staging();
        self.late_joiner.last_data_at = self.now;
        self.request_late_joiner_data();
    }

    fn request_late_joiner_data(&mut self) {
        let display_name = self.transport.local_display_name();
        self.send_internal(InternalAction::ClientJoined { display_name });
        // spread out retries of peers that joined together
        let jitter = Duration::from_millis(fastrand::u64(0..=500));
        self.timers.add_item(
            self.now + self.config.late_joiner_retry_interval + jitter,
            Timer::LateJoinerRetry,
        );
    }

    pub(super) fn retry_late_joining(&mut self) {
        if !self.late_joiner.waiting {
            return;
        }
        let retry_interval = self.config.late_joiner_retry_interval;
        let quiet_for = self.now.saturating_sub(self.late_joiner.last_data_at);
        if quiet_for < retry_interval {
            self.timers.add_item(
                self.late_joiner.last_data_at + retry_interval,
                Timer::LateJoinerRetry,
            );
            return;
        }
        warn!(
            "Peer {} received no late joiner data for {:?}, asking again",
            self.local_peer, quiet_for
        );
        self.request_late_joiner_data();
    }

    pub(super) fn on_late_joiner_piece(&mut self, received: ReceivedAction) {
        if !self.late_joiner.waiting {
            debug!("Ignoring late joiner data, peer {} is not waiting", self.local_peer);
            return;
        }
        self.late_joiner.last_data_at = self.now;
        if let Err(error) = self.read_late_joiner_piece(received.kind, &received.payload) {
            warn!("Discarding malformed late joiner data: {}", error);
            self.late_joiner.restart_staging();
        }
    }

    fn read_late_joiner_piece(&mut self, kind: ActionKind, payload: &[u8]) -> Result<(), SerdeErr> {
        let mut reader = ByteReader::new(payload);
        let game_state_count = self.game_states.len();

        match (kind, self.late_joiner.expected) {
            // a client table always starts a new transfer
            (CLIENTS_PIECE, _) => {
                let clients = ClientTable::read(&mut reader)?;
                self.late_joiner.restart_staging();
                self.late_joiner.staged_clients = Some(clients);
                self.late_joiner.expected = ExpectedPiece::Singletons;
            }
            (SINGLETONS_PIECE, ExpectedPiece::Singletons) => {
                self.late_joiner.staged_singletons = Some(Singletons::read(&mut reader)?);
                self.late_joiner.expected = if game_state_count == 0 {
                    ExpectedPiece::CurrentTick
                } else {
                    ExpectedPiece::GameState(0)
                };
            }
            (GAME_STATE_PIECE, ExpectedPiece::GameState(expected_index)) => {
                let index = reader.read_small_u32()? as usize;
                if index != expected_index {
                    warn!(
                        "Expected game state {} but received {}, waiting for a new transfer",
                        expected_index, index
                    );
                    self.late_joiner.restart_staging();
                    return Ok(());
                }
                self.late_joiner
                    .staged_game_states
                    .push((index, reader.read_remaining().into()));
                self.late_joiner.expected = if index + 1 < game_state_count {
                    ExpectedPiece::GameState(index + 1)
                } else {
                    ExpectedPiece::CurrentTick
                };
            }
            (CURRENT_TICK_PIECE, ExpectedPiece::CurrentTick) => {
                let tick = reader.read_small_u32()?;
                let count = reader.read_small_u32()?;
                let mut retired = Vec::new();
                for _ in 0..count {
                    let peer = reader.read_small_u32()?;
                    let sequence = reader.read_small_u32()?;
                    retired.push((peer, sequence));
                }
                self.begin_applying_late_joiner_data(tick, retired);
            }
            (kind, expected) => {
                debug!(
                    "Ignoring late joiner piece {} while expecting {:?}",
                    kind, expected
                );
                self.late_joiner.restart_staging();
            }
        }
        Ok(())
    }

    fn begin_applying_late_joiner_data(&mut self, tick: Tick, retired: Vec<(PeerId, u32)>) {
        let (Some(clients), Some(singletons)) = (
            self.late_joiner.staged_clients.take(),
            self.late_joiner.staged_singletons.take(),
        ) else {
            self.late_joiner.restart_staging();
            return;
        };
        info!(
            "Peer {} received late joiner data for tick {}",
            self.local_peer, tick
        );

        self.clients = clients;
        self.singletons = singletons;
        self.late_joiner.waiting = false;
        self.late_joiner.expected = ExpectedPiece::Clients;
        let staged = mem::take(&mut self.late_joiner.staged_game_states);
        self.late_joiner.applying = Some(staged.into());

        self.current_tick = tick;
        self.wait_tick = self.wait_tick.max(tick);
        for (peer, sequence) in retired {
            self.retire(UniqueId::new(peer, sequence));
        }
        self.purge_through(tick);
        self.drop_retired_payloads();

        self.raise_event(LockstepEvent::ClientBeginCatchUp(self.local_peer));
        self.timers.add_item(self.now, Timer::ApplyStagedGameState);
    }

    /// Deserializes one received game state, then schedules the next
    pub(super) fn apply_staged_game_state(&mut self) {
        let Some(applying) = self.late_joiner.applying.as_mut() else {
            return;
        };

        if let Some((index, data)) = applying.pop_front() {
            if let Some(game_state) = self.game_states.get_mut(index) {
                let data_version = game_state.data_version();
                let mut reader = ByteReader::new(&data);
                if let Err(error) = game_state.deserialize(&mut reader, false, data_version) {
                    warn!(
                        "Game state {} rejected late joiner data: {}",
                        game_state.internal_name(),
                        error
                    );
                }
            }
            if !applying.is_empty() {
                self.timers.add_item(
                    self.now + self.config.late_joiner_game_state_interval,
                    Timer::ApplyStagedGameState,
                );
                return;
            }
        }

        self.late_joiner.applying = None;
        self.is_initialized = true;
        self.send_internal(InternalAction::ClientBeginCatchUp);
        self.enter_catch_up(CatchUpReason::LateJoiner);
    }

    // Master side

    /// Runs on every peer when a join request executes
    pub(super) fn run_client_joined(&mut self, peer: PeerId, display_name: String) {
        match self.clients.state(peer) {
            // asked again, the data is sent again below
            Some(ClientState::WaitingForLateJoinerSync) => {}
            Some(_) => {
                debug!("Ignoring repeated join of peer {}", peer);
                return;
            }
            None => {
                self.clients
                    .insert(peer, ClientState::WaitingForLateJoinerSync, display_name);
                self.raise_event(LockstepEvent::ClientJoined(peer));
            }
        }
        if self.is_master {
            if self.transport.is_present(peer) {
                self.schedule_late_joiner_send();
            } else {
                info!("Peer {} left before its join ran", peer);
                self.send_internal(InternalAction::ClientLeft { peer });
            }
        }
        self.update_single_peer_mode();
    }

    /// Debounces late joiner data sends, waiting longer the more peers joined recently
    pub(super) fn schedule_late_joiner_send(&mut self) {
        let now = self.now;
        let window = self.config.late_joiner_burst_window;
        let recent_joins = &mut self.late_joiner.recent_joins;
        while recent_joins
            .front()
            .map_or(false, |at| now.saturating_sub(*at) > window)
        {
            recent_joins.pop_front();
        }
        recent_joins.push_back(now);

        let extra = self.config.late_joiner_send_delay_step * (recent_joins.len() as u32 - 1);
        let delay = (self.config.late_joiner_send_base_delay + extra)
            .min(self.config.late_joiner_send_max_delay);

        self.late_joiner.send_generation = self.late_joiner.send_generation.wrapping_add(1);
        self.timers.add_item(
            now + delay,
            Timer::LateJoinerSend {
                generation: self.late_joiner.send_generation,
            },
        );
    }

    pub(super) fn send_late_joiner_data(&mut self, generation: u32) {
        if generation != self.late_joiner.send_generation || !self.is_master {
            return;
        }
        if !self.clients.any_waiting_for_late_joiner_sync() {
            debug!("Nobody is waiting for late joiner data anymore");
            return;
        }
        if self.is_catching_up() {
            self.timers.add_item(
                self.now + self.config.late_joiner_send_base_delay,
                Timer::LateJoinerSend { generation },
            );
            return;
        }

        // a newer transfer replaces whatever was still queued
        self.late_joiner_sender.clear();

        let mut writer = ByteWriter::new();
        self.clients.write(&mut writer);
        self.submit_late_joiner_piece(CLIENTS_PIECE, writer.as_slice());

        writer.reset();
        self.singletons.write(&mut writer);
        self.submit_late_joiner_piece(SINGLETONS_PIECE, writer.as_slice());

        for index in 0..self.game_states.len() {
            writer.reset();
            writer.write_small_u32(index as u32);
            if let Some(game_state) = self.game_states.get(index) {
                game_state.serialize(&mut writer, false);
            }
            self.submit_late_joiner_piece(GAME_STATE_PIECE, writer.as_slice());
        }

        writer.reset();
        writer.write_small_u32(self.current_tick);
        let mut retired: Vec<_> = self.retired_sequences.iter().collect();
        retired.sort();
        writer.write_small_u32(retired.len() as u32);
        for (peer, sequence) in retired {
            writer.write_small_u32(*peer);
            writer.write_small_u32(*sequence);
        }
        self.submit_late_joiner_piece(CURRENT_TICK_PIECE, writer.as_slice());

        info!(
            "Master {} queued late joiner data for tick {}",
            self.local_peer, self.current_tick
        );
    }

    fn submit_late_joiner_piece(&mut self, kind: ActionKind, payload: &[u8]) {
        if let Err(error) = self.late_joiner_sender.submit(kind, payload) {
            warn!("Failed to queue late joiner piece {}: {}", kind, error);
        }
    }
}
