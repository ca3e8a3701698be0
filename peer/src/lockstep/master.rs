use std::time::Duration;

use log::{debug, info, warn};

use lockstep_shared::{ChannelKind, ClientState, PeerId, Tick, Transport};

use crate::{
    events::LockstepEvent,
    internal_action::InternalAction,
    lockstep::{
        late_joiner::LateJoinerState, singleton::Singletons, CatchUpReason, Lockstep, RunState,
        Timer,
    },
};

impl<T: Transport> Lockstep<T> {
    /// Runs once, a while after joining: either start the session or ask the
    /// running session for its state
    pub(super) fn initial_master_check(&mut self) {
        if self.is_initialized || self.late_joiner.is_syncing() {
            return;
        }
        if self.transport.is_primary() && self.last_tick_sync_at.is_none() {
            self.bootstrap();
        } else {
            self.start_late_joining();
        }
    }

    /// Starts the session with the local peer as its only client and master
    pub(super) fn bootstrap(&mut self) {
        info!(
            "Peer {} starts the lockstep session as master",
            self.local_peer
        );
        self.clients.clear();
        self.clients.insert(
            self.local_peer,
            ClientState::Master,
            self.transport.local_display_name(),
        );

        self.is_master = true;
        self.no_master = false;
        self.is_initialized = true;
        self.current_tick = 1;
        self.wait_tick = Tick::MAX;
        self.first_mutable_tick = 0;
        self.start_tick = self.current_tick;
        self.start_time = self.now;
        self.run_state = RunState::Running;
        self.catch_up_reason = None;

        self.take_master_channels();
        self.associate_unscheduled();
        self.update_single_peer_mode();
        self.raise_event(LockstepEvent::Init);
    }

    fn take_master_channels(&mut self) {
        self.transport.take_ownership(ChannelKind::Tick);
        self.transport.take_ownership(ChannelKind::LateJoiner);
        self.tick_sync.reset();
        self.late_joiner_sender.clear();
    }

    pub(super) fn check_master(&mut self) {
        if self.is_master || !self.joined || !self.transport.is_primary() {
            return;
        }

        if !self.is_initialized {
            debug!(
                "Peer {} is primary but still syncing, waiting for other candidates",
                self.local_peer
            );
            self.timers.add_item(
                self.now + self.config.master_candidate_wait,
                Timer::MasterCandidateCheck { since: self.now },
            );
            return;
        }

        match self.clients.master() {
            Some(master) if self.transport.is_present(master) => {
                debug!("Master {} is still present", master);
            }
            _ => self.take_over(),
        }
    }

    /// A primary peer that never finished syncing lost its master.
    ///
    /// There is no negotiation with other candidates: unless a master started
    /// broadcasting in the meantime, the session restarts from this peer as if
    /// it was the very first one.
    pub(super) fn check_master_candidate(&mut self, since: Duration) {
        if self.is_master || self.is_initialized || !self.transport.is_primary() {
            return;
        }
        if self.last_tick_sync_at.map_or(false, |at| at > since) {
            debug!("A master is broadcasting again, not resetting");
            return;
        }
        warn!(
            "Master left before peer {} finished syncing, restarting the session",
            self.local_peer
        );
        self.factory_reset();
        self.bootstrap();
    }

    fn factory_reset(&mut self) {
        self.pending.clear();
        self.scheduled.clear();
        self.ticks.clear();
        self.reported_missing.clear();
        self.clients.clear();
        self.singletons = Singletons::default();
        self.late_joiner = LateJoinerState::default();
        self.import_remaining = None;
        self.action_sender.clear();
        self.late_joiner_sender.clear();
        self.late_joiner_receiver.clear();
        self.tick_sync.reset();
        // anything left of the sync that never finished
        self.timers.retain(|timer| {
            !matches!(
                timer,
                Timer::LateJoinerRetry | Timer::LateJoinerSend { .. } | Timer::ApplyStagedGameState
            )
        });

        self.current_tick = 0;
        self.wait_tick = 0;
        self.first_mutable_tick = 0;
        self.run_state = RunState::Paused;
        self.catch_up_reason = None;
        self.is_initialized = false;
        self.is_master = false;
    }

    /// Ordinary failover: replay what the old master released, then continue as master
    fn take_over(&mut self) {
        let old = self.clients.master();
        info!(
            "Peer {} takes over as master from {:?} at tick {}",
            self.local_peer, old, self.current_tick
        );
        self.is_master = true;
        self.no_master = false;
        // never reorder anything the old master may have handed out
        self.first_mutable_tick = self
            .wait_tick
            .saturating_add(1)
            .max(self.current_tick.saturating_add(1));
        self.take_master_channels();
        self.associate_unscheduled();
        self.enter_catch_up(CatchUpReason::TakeOver { old });
    }

    pub(super) fn finish_take_over(&mut self, old: Option<PeerId>) {
        self.wait_tick = Tick::MAX;
        info!(
            "Peer {} is master from tick {}",
            self.local_peer, self.current_tick
        );

        self.send_internal(InternalAction::MasterChanged { old });
        self.send_internal(InternalAction::ClientCaughtUp);
        let departed: Vec<PeerId> = self
            .clients
            .peers()
            .filter(|peer| *peer != self.local_peer && !self.transport.is_present(*peer))
            .collect();
        for peer in departed {
            self.send_internal(InternalAction::ClientLeft { peer });
        }

        if self.clients.any_waiting_for_late_joiner_sync() {
            self.schedule_late_joiner_send();
        }
    }
}
