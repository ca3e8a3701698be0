use std::{mem, time::Instant};

use log::{debug, info, warn};

use lockstep_shared::{Tick, Transport};

use crate::{
    events::LockstepEvent,
    internal_action::InternalAction,
    lockstep::{CatchUpReason, Lockstep, RunState},
};

impl<T: Transport> Lockstep<T> {
    pub(super) fn run_ticks(&mut self) {
        match self.run_state {
            RunState::Paused => {}
            RunState::Running => self.run_paced(),
            RunState::CatchingUp => self.run_catch_up(),
        }
    }

    fn run_paced(&mut self) {
        let elapsed = self.now.saturating_sub(self.start_time);
        let elapsed_ticks = elapsed.as_millis() * u128::from(self.config.tick_rate) / 1000;
        let paced = u128::from(self.start_tick) + elapsed_ticks;
        let run_until = paced.min(u128::from(self.wait_tick)) as Tick;

        while self.current_tick < run_until && self.run_state == RunState::Running {
            if !self.try_run_tick() {
                break;
            }
        }
    }

    fn run_catch_up(&mut self) {
        // the budget limits real time spent per frame, not simulated time
        let started = Instant::now();
        loop {
            if self.catch_up_target_reached() {
                self.finish_catch_up();
                return;
            }
            if started.elapsed() >= self.config.catch_up_frame_budget {
                return;
            }
            if !self.try_run_tick() {
                return;
            }
        }
    }

    /// The master must replay everything the old master released, others
    /// keep receiving tick updates and only need to get close
    fn catch_up_target_reached(&self) -> bool {
        if self.is_master {
            self.current_tick >= self.wait_tick
        } else {
            self.current_tick.saturating_add(1) >= self.wait_tick
        }
    }

    /// Runs the next tick if the payload of every action scheduled for it is
    /// known. Returns false, without skipping anything, when one is missing.
    pub(super) fn try_run_tick(&mut self) -> bool {
        let Some(tick) = self.current_tick.checked_add(1) else {
            return false;
        };

        if let Some(unique_ids) = self.ticks.get(&tick) {
            for unique_id in unique_ids {
                if !self.pending.contains_key(unique_id) {
                    if self.reported_missing.insert(*unique_id) {
                        warn!(
                            "Tick {} is stalled waiting for the payload of action {}",
                            tick, unique_id
                        );
                    }
                    return false;
                }
            }
        }

        let unique_ids = self.ticks.remove(&tick).unwrap_or_default();
        self.current_tick = tick;
        for unique_id in unique_ids {
            self.scheduled.remove(&unique_id);
            self.reported_missing.remove(&unique_id);
            self.retire(unique_id);
            if let Some(action) = self.pending.remove(&unique_id) {
                self.run_action(unique_id, action);
            }
        }

        let interval = self.config.first_mutable_tick_interval;
        if interval > 0 && tick % interval == 0 {
            self.first_mutable_tick = self.first_mutable_tick.saturating_add(1);
        }

        self.raise_event(LockstepEvent::Tick(tick));
        true
    }

    pub(super) fn enter_catch_up(&mut self, reason: CatchUpReason) {
        debug!(
            "Peer {} catching up from tick {} to {} ({:?})",
            self.local_peer, self.current_tick, self.wait_tick, reason
        );
        self.run_state = RunState::CatchingUp;
        self.catch_up_reason = Some(reason);
    }

    fn finish_catch_up(&mut self) {
        self.purge_through(self.current_tick);
        self.drop_retired_payloads();
        self.run_state = RunState::Running;
        self.start_tick = self.current_tick;
        self.start_time = self.now;

        match self.catch_up_reason.take() {
            Some(CatchUpReason::LateJoiner) => {
                info!(
                    "Peer {} caught up at tick {}",
                    self.local_peer, self.current_tick
                );
                self.send_internal(InternalAction::ClientCaughtUp);
            }
            Some(CatchUpReason::TakeOver { old }) => self.finish_take_over(old),
            None => {}
        }
    }

    /// Drops every association at or before `tick` along with its payload
    pub(super) fn purge_through(&mut self, tick: Tick) {
        let purged = match tick.checked_add(1) {
            Some(next) => {
                let remaining = self.ticks.split_off(&next);
                mem::replace(&mut self.ticks, remaining)
            }
            None => mem::take(&mut self.ticks),
        };
        for unique_id in purged.into_values().flatten() {
            self.scheduled.remove(&unique_id);
            self.pending.remove(&unique_id);
            self.reported_missing.remove(&unique_id);
            self.retire(unique_id);
        }
    }
}
