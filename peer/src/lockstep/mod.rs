use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    mem,
    time::Duration,
};

use log::{debug, info, warn};

use lockstep_shared::{
    ActionKind, ActionSender, ByteReader, ChannelKind, ChunkReceiver, ClientState, ClientTable,
    GameState, GameStates, PeerId, ReceivedAction, Tick, TickSync, TickUpdate, TimeQueue,
    Transport, UniqueId,
};

use crate::{
    config::LockstepConfig,
    context::{LockstepContext, Outgoing},
    error::LockstepError,
    events::{Events, LockstepEvent},
    internal_action::{InternalAction, FIRST_USER_ACTION_KIND},
    protocol::{ActionHandler, Listener, Protocol},
};

mod import_export;
mod late_joiner;
mod master;
mod singleton;
mod tick_runner;

use late_joiner::LateJoinerState;
use singleton::Singletons;

/// A payload whose action has not run yet
struct PendingAction {
    kind: ActionKind,
    payload: Box<[u8]>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunState {
    /// No tick may run yet
    Paused,
    /// Ticks advance with the wall clock
    Running,
    /// Ticks run as fast as the frame budget allows
    CatchingUp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CatchUpReason {
    LateJoiner,
    TakeOver { old: Option<PeerId> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Timer {
    InitialMasterCheck,
    MasterCheck,
    MasterCandidateCheck { since: Duration },
    LateJoinerRetry,
    LateJoinerSend { generation: u32 },
    ApplyStagedGameState,
}

/// One peer of a lockstep session.
///
/// Driven entirely from the outside: membership changes, received channel
/// payloads and one [`Lockstep::frame`] call per frame. Time is passed in as a
/// `Duration` since any fixed origin and must never go backwards.
pub struct Lockstep<T: Transport> {
    config: LockstepConfig,
    transport: T,
    local_peer: PeerId,
    joined: bool,

    handlers: BTreeMap<ActionKind, ActionHandler>,
    listeners: Vec<Listener>,
    game_states: GameStates,
    clients: ClientTable,

    action_sender: ActionSender,
    late_joiner_sender: ActionSender,
    action_receiver: ChunkReceiver,
    late_joiner_receiver: ChunkReceiver,
    tick_sync: TickSync,

    // ordering tables
    pending: HashMap<UniqueId, PendingAction>,
    scheduled: HashMap<UniqueId, Tick>,
    ticks: BTreeMap<Tick, Vec<UniqueId>>,
    reported_missing: HashSet<UniqueId>,
    /// Highest sequence per peer whose action already ran or was part of a
    /// received state. A peer's actions are scheduled in sequence order.
    retired_sequences: HashMap<PeerId, u32>,

    run_state: RunState,
    catch_up_reason: Option<CatchUpReason>,
    current_tick: Tick,
    wait_tick: Tick,
    first_mutable_tick: Tick,
    start_tick: Tick,
    start_time: Duration,

    is_initialized: bool,
    is_master: bool,
    no_master: bool,
    single_peer_mode: bool,
    last_tick_sync_at: Option<Duration>,

    late_joiner: LateJoinerState,
    singletons: Singletons,
    import_remaining: Option<BTreeSet<usize>>,

    timers: TimeQueue<Timer>,
    now: Duration,
    outbox: Vec<Outgoing>,
    events: Events,
}

impl<T: Transport> Lockstep<T> {
    pub fn new(config: LockstepConfig, mut protocol: Protocol, transport: T) -> Self {
        if !protocol.is_locked() {
            protocol.lock();
        }
        let (handlers, game_states, listeners) = protocol.into_parts();
        let tick_sync = TickSync::new(
            config.tick_sync_initial_interval,
            config.tick_sync_min_interval,
            config.tick_sync_max_interval,
        );

        Self {
            action_sender: ActionSender::new(config.max_chunk_size),
            late_joiner_sender: ActionSender::new(config.max_chunk_size),
            action_receiver: ChunkReceiver::new(),
            late_joiner_receiver: ChunkReceiver::new(),
            tick_sync,
            config,
            transport,
            local_peer: 0,
            joined: false,

            handlers,
            listeners,
            game_states,
            clients: ClientTable::new(),

            pending: HashMap::new(),
            scheduled: HashMap::new(),
            ticks: BTreeMap::new(),
            reported_missing: HashSet::new(),
            retired_sequences: HashMap::new(),

            run_state: RunState::Paused,
            catch_up_reason: None,
            current_tick: 0,
            wait_tick: 0,
            first_mutable_tick: 0,
            start_tick: 0,
            start_time: Duration::ZERO,

            is_initialized: false,
            is_master: false,
            no_master: false,
            single_peer_mode: false,
            last_tick_sync_at: None,

            late_joiner: LateJoinerState::default(),
            singletons: Singletons::default(),
            import_remaining: None,

            timers: TimeQueue::new(),
            now: Duration::ZERO,
            outbox: Vec::new(),
            events: Events::new(),
        }
    }

    // Membership input

    /// The local peer is connected and owns its action channel
    pub fn on_local_joined(&mut self, now: Duration) {
        self.now = now;
        if self.joined {
            return;
        }
        self.local_peer = self.transport.local_peer();
        self.action_sender.set_local_peer(self.local_peer);
        self.late_joiner_sender.set_local_peer(self.local_peer);
        self.joined = true;
        debug!("Peer {} joined, checking for a master soon", self.local_peer);
        self.timers.add_item(
            now + self.config.initial_master_check_delay,
            Timer::InitialMasterCheck,
        );
    }

    pub fn on_peer_left(&mut self, peer: PeerId, now: Duration) {
        self.now = now;
        self.action_receiver.forget(peer);
        self.late_joiner_receiver.forget(peer);
        if !self.joined || peer == self.local_peer {
            return;
        }

        if self.is_master {
            // also sent for peers whose join has not run yet, it runs after the join
            info!("Peer {} left", peer);
            self.send_internal(InternalAction::ClientLeft { peer });
            return;
        }

        let master_left = self.clients.master() == Some(peer);
        if master_left {
            info!("Master {} left", peer);
            self.no_master = true;
        }
        if master_left || !self.is_initialized {
            self.timers.add_item(
                now + self.config.master_change_check_delay,
                Timer::MasterCheck,
            );
        }
    }

    /// The membership authority now ranks the local peer as primary
    pub fn on_became_primary(&mut self, now: Duration) {
        self.now = now;
        if !self.joined || self.is_master {
            return;
        }
        self.timers.add_item(
            now + self.config.master_change_check_delay,
            Timer::MasterCheck,
        );
    }

    // Network input

    pub fn receive(&mut self, channel: ChannelKind, sender: PeerId, bytes: &[u8]) {
        match channel {
            ChannelKind::Action => match self.action_receiver.try_receive(sender, bytes) {
                Ok(Some(received)) => self.on_action_payload(received),
                Ok(None) => {}
                Err(error) => warn!("Dropping action chunk: {}", error),
            },
            ChannelKind::LateJoiner => match self.late_joiner_receiver.try_receive(sender, bytes) {
                Ok(Some(received)) => self.on_late_joiner_piece(received),
                Ok(None) => {}
                Err(error) => warn!("Dropping late joiner chunk: {}", error),
            },
            ChannelKind::Tick => match TickUpdate::read(bytes) {
                Ok(update) => self.on_tick_update(sender, update),
                Err(error) => warn!("Dropping tick update from peer {}: {}", sender, error),
            },
        }
    }

    fn on_action_payload(&mut self, received: ReceivedAction) {
        let ReceivedAction {
            unique_id,
            kind,
            payload,
        } = received;
        if self.is_retired(unique_id) || self.pending.contains_key(&unique_id) {
            debug!("Ignoring stale payload of action {}", unique_id);
            return;
        }
        self.pending.insert(unique_id, PendingAction { kind, payload });
        if self.is_master && self.is_initialized {
            self.associate(unique_id);
        }
    }

    fn on_tick_update(&mut self, sender: PeerId, update: TickUpdate) {
        if self.is_master {
            debug!("Ignoring tick update from peer {} while master", sender);
            return;
        }
        self.last_tick_sync_at = Some(self.now);

        for (tick, unique_id) in update.associations {
            if self.is_retired(unique_id) {
                continue;
            }
            if tick <= self.current_tick {
                // part of a state this peer already received as a whole
                self.pending.remove(&unique_id);
                self.retire(unique_id);
                continue;
            }
            if let Some(existing) = self.scheduled.get(&unique_id) {
                if *existing != tick {
                    warn!(
                        "Action {} is already scheduled for tick {}, ignoring tick {}",
                        unique_id, existing, tick
                    );
                }
                continue;
            }
            self.scheduled.insert(unique_id, tick);
            self.ticks.entry(tick).or_default().push(unique_id);
        }

        self.wait_tick = self.wait_tick.max(update.current_tick);
    }

    // Frame

    pub fn frame(&mut self, now: Duration) {
        self.now = now;
        while let Some(timer) = self.timers.pop_due(now) {
            self.handle_timer(timer);
        }
        self.update_single_peer_mode();
        self.run_ticks();
        self.flush_channels();
    }

    fn handle_timer(&mut self, timer: Timer) {
        match timer {
            Timer::InitialMasterCheck => self.initial_master_check(),
            Timer::MasterCheck => self.check_master(),
            Timer::MasterCandidateCheck { since } => self.check_master_candidate(since),
            Timer::LateJoinerRetry => self.retry_late_joining(),
            Timer::LateJoinerSend { generation } => self.send_late_joiner_data(generation),
            Timer::ApplyStagedGameState => self.apply_staged_game_state(),
        }
    }

    /// Writes at most one chunk per channel, plus the tick update when due
    fn flush_channels(&mut self) {
        if let Some(chunk) = self.action_sender.front() {
            let result = self.transport.send(ChannelKind::Action, chunk);
            if let Err(error) = &result {
                debug!("Retrying action chunk later: {}", error);
            }
            self.action_sender.on_sent(result.is_ok());
        }

        if let Some(chunk) = self.late_joiner_sender.front() {
            let result = self.transport.send(ChannelKind::LateJoiner, chunk);
            if let Err(error) = &result {
                debug!("Retrying late joiner chunk later: {}", error);
            }
            self.late_joiner_sender.on_sent(result.is_ok());
        }

        if self.is_master
            && self.is_initialized
            && self.run_state != RunState::Paused
            && self.tick_sync.should_send(self.now)
        {
            let payload = self.tick_sync.build(self.current_tick);
            let result = self.transport.send(ChannelKind::Tick, &payload);
            if let Err(error) = &result {
                debug!("Retrying tick update later: {}", error);
            }
            self.tick_sync
                .on_sent(result.is_ok(), self.current_tick, self.now);
        }
    }

    /// While the master is alone its actions skip the network
    fn update_single_peer_mode(&mut self) {
        let single = self.is_master && self.is_initialized && self.clients.len() == 1;
        if single != self.single_peer_mode {
            debug!(
                "Peer {} {} single peer mode",
                self.local_peer,
                if single { "enters" } else { "leaves" }
            );
            self.single_peer_mode = single;
            self.action_sender.clear();
        }
    }

    // Sending

    /// Sends an input action. Returns the unique id it will run with.
    pub fn try_send_action(
        &mut self,
        kind: ActionKind,
        payload: &[u8],
    ) -> Result<UniqueId, LockstepError> {
        if kind < FIRST_USER_ACTION_KIND {
            return Err(LockstepError::ReservedActionKind {
                kind,
                first_user_kind: FIRST_USER_ACTION_KIND,
            });
        }
        if !self.handlers.contains_key(&kind) {
            return Err(LockstepError::UnknownActionKind { kind });
        }
        self.send_raw(kind, payload)
    }

    /// Like [`Lockstep::try_send_action`], returns `UniqueId::INVALID` on failure
    pub fn send_action(&mut self, kind: ActionKind, payload: &[u8]) -> UniqueId {
        match self.try_send_action(kind, payload) {
            Ok(unique_id) => unique_id,
            Err(error) => {
                warn!("Failed to send action of kind {}: {}", kind, error);
                UniqueId::INVALID
            }
        }
    }

    fn send_raw(&mut self, kind: ActionKind, payload: &[u8]) -> Result<UniqueId, LockstepError> {
        let unique_id = if self.single_peer_mode {
            self.action_sender.allocate_id()?
        } else {
            self.action_sender.submit(kind, payload)?
        };
        // transports do not echo, the sender keeps its own copy
        self.pending.insert(
            unique_id,
            PendingAction {
                kind,
                payload: payload.into(),
            },
        );
        if self.is_master && self.is_initialized {
            self.associate(unique_id);
        }
        Ok(unique_id)
    }

    fn send_internal(&mut self, action: InternalAction) -> UniqueId {
        match self.send_raw(action.kind(), &action.to_payload()) {
            Ok(unique_id) => unique_id,
            Err(error) => {
                warn!("Failed to send internal action {:?}: {}", action, error);
                UniqueId::INVALID
            }
        }
    }

    /// Master only: schedules an action for the earliest tick it may still run in
    fn associate(&mut self, unique_id: UniqueId) {
        if self.scheduled.contains_key(&unique_id) {
            return;
        }
        let tick = self
            .first_mutable_tick
            .max(self.current_tick.saturating_add(1));
        self.scheduled.insert(unique_id, tick);
        self.ticks.entry(tick).or_default().push(unique_id);
        self.tick_sync.add_association(tick, unique_id);
    }

    /// Schedules every known payload that has no tick yet, in unique id order
    fn associate_unscheduled(&mut self) {
        let mut unscheduled: Vec<UniqueId> = self
            .pending
            .keys()
            .filter(|unique_id| !self.scheduled.contains_key(unique_id))
            .copied()
            .collect();
        unscheduled.sort();
        for unique_id in unscheduled {
            self.associate(unique_id);
        }
    }

    pub(super) fn retire(&mut self, unique_id: UniqueId) {
        let retired = self
            .retired_sequences
            .entry(unique_id.peer())
            .or_insert(0);
        *retired = (*retired).max(unique_id.sequence());
    }

    /// Drops payloads whose tick went by before this peer learned about it
    pub(super) fn drop_retired_payloads(&mut self) {
        let retired = &self.retired_sequences;
        self.pending.retain(|unique_id, _| {
            retired
                .get(&unique_id.peer())
                .map_or(true, |sequence| unique_id.sequence() > *sequence)
        });
    }

    fn is_retired(&self, unique_id: UniqueId) -> bool {
        self.retired_sequences
            .get(&unique_id.peer())
            .map_or(false, |retired| unique_id.sequence() <= *retired)
    }

    // Running actions

    fn run_action(&mut self, unique_id: UniqueId, action: PendingAction) {
        if action.kind >= FIRST_USER_ACTION_KIND {
            self.run_user_action(unique_id, action.kind, &action.payload);
            return;
        }
        let mut reader = ByteReader::new(&action.payload);
        match InternalAction::read(action.kind, &mut reader) {
            Ok(internal) => self.run_internal(unique_id, internal),
            Err(error) => warn!("Skipping malformed internal action {}: {}", unique_id, error),
        }
    }

    fn run_user_action(&mut self, unique_id: UniqueId, kind: ActionKind, payload: &[u8]) {
        let Self {
            handlers,
            clients,
            game_states,
            outbox,
            local_peer,
            current_tick,
            ..
        } = self;
        let Some(handler) = handlers.get_mut(&kind) else {
            warn!("No handler for action {} of kind {}", unique_id, kind);
            return;
        };
        let mut context = LockstepContext::new(
            *current_tick,
            unique_id,
            *local_peer,
            clients,
            game_states,
            outbox,
        );
        let mut reader = ByteReader::new(payload);
        if let Err(error) = handler(&mut context, &mut reader) {
            warn!(
                "Action {} of kind {} could not read its payload: {}",
                unique_id, kind, error
            );
        }
        self.flush_outbox();
    }

    fn run_internal(&mut self, unique_id: UniqueId, action: InternalAction) {
        let sender = unique_id.peer();
        match action {
            InternalAction::ClientJoined { display_name } => {
                self.run_client_joined(sender, display_name)
            }
            InternalAction::ClientBeginCatchUp => {
                if self.clients.set_state(sender, ClientState::CatchingUp)
                    && sender != self.local_peer
                {
                    self.raise_event(LockstepEvent::ClientBeginCatchUp(sender));
                }
            }
            InternalAction::ClientCaughtUp => {
                if self.clients.state(sender) != Some(ClientState::Master) {
                    self.clients.set_state(sender, ClientState::Normal);
                }
                if self.clients.contains(sender) {
                    self.raise_event(LockstepEvent::ClientCaughtUp(sender));
                }
            }
            InternalAction::ClientLeft { peer } => {
                if self.clients.remove(peer).is_some() {
                    self.reassign_singletons(peer);
                    self.raise_event(LockstepEvent::ClientLeft(peer));
                }
                self.update_single_peer_mode();
            }
            InternalAction::MasterChanged { old } => {
                self.no_master = false;
                if let Some(old) = old {
                    if self.clients.state(old) == Some(ClientState::Master) {
                        self.clients.set_state(old, ClientState::Normal);
                    }
                }
                if !self.clients.set_state(sender, ClientState::Master) {
                    warn!("New master {} is not in the client table", sender);
                }
                self.raise_event(LockstepEvent::MasterChanged {
                    old,
                    new: sender,
                });
            }
            InternalAction::Singleton { id, kind, payload } => {
                self.run_singleton(unique_id, id, kind, payload)
            }
            InternalAction::ImportStart { indices } => self.run_import_start(indices),
            InternalAction::ImportGameState {
                index,
                data_version,
                data,
            } => self.run_import_game_state(index, data_version, data),
        }
    }

    /// Hands an event to every listener, then queues it for `take_events`
    fn raise_event(&mut self, event: LockstepEvent) {
        let Self {
            listeners,
            clients,
            game_states,
            outbox,
            local_peer,
            current_tick,
            ..
        } = self;
        let mut context = LockstepContext::new(
            *current_tick,
            UniqueId::INVALID,
            *local_peer,
            clients,
            game_states,
            outbox,
        );
        for listener in listeners.iter_mut() {
            listener(&event, &mut context);
        }
        if !matches!(event, LockstepEvent::Tick(_)) {
            self.events.push(event);
        }
        self.flush_outbox();
    }

    fn flush_outbox(&mut self) {
        for outgoing in mem::take(&mut self.outbox) {
            match outgoing {
                Outgoing::Action { kind, payload } => {
                    if let Err(error) = self.try_send_action(kind, &payload) {
                        warn!("Failed to send action of kind {}: {}", kind, error);
                    }
                }
                Outgoing::Singleton {
                    responsible,
                    kind,
                    payload,
                } => self.request_singleton(responsible, kind, payload),
            }
        }
    }

    // Queries

    pub fn local_peer(&self) -> PeerId {
        self.local_peer
    }

    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    pub fn is_master(&self) -> bool {
        self.is_master
    }

    pub fn master_peer(&self) -> Option<PeerId> {
        self.clients.master()
    }

    /// Set between the recorded master leaving and someone taking over
    pub fn has_no_master(&self) -> bool {
        self.no_master
    }

    pub fn is_single_peer_mode(&self) -> bool {
        self.single_peer_mode
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn wait_tick(&self) -> Tick {
        self.wait_tick
    }

    pub fn first_mutable_tick(&self) -> Tick {
        self.first_mutable_tick
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn is_catching_up(&self) -> bool {
        self.run_state == RunState::CatchingUp
    }

    pub fn is_waiting_for_late_joiner_sync(&self) -> bool {
        self.late_joiner.is_syncing()
    }

    pub fn is_importing(&self) -> bool {
        self.import_remaining.is_some()
    }

    pub fn clients(&self) -> &ClientTable {
        &self.clients
    }

    pub fn client_state(&self, peer: PeerId) -> Option<ClientState> {
        self.clients.state(peer)
    }

    pub fn client_name(&self, peer: PeerId) -> Option<&str> {
        self.clients.display_name(peer)
    }

    pub fn client_peers(&self) -> Vec<PeerId> {
        self.clients.peers().collect()
    }

    pub fn pending_action_count(&self) -> usize {
        self.pending.len()
    }

    pub fn singleton_ticket_count(&self) -> usize {
        self.singletons.len()
    }

    pub fn game_states(&self) -> &GameStates {
        &self.game_states
    }

    pub fn game_state<G: GameState>(&self) -> Option<&G> {
        self.game_states.find::<G>()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Everything raised since the previous call, in order
    pub fn take_events(&mut self) -> Events {
        mem::take(&mut self.events)
    }
}
