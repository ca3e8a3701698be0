use std::{default::Default, time::Duration};

use lockstep_shared::DEFAULT_MAX_CHUNK_SIZE;

/// Contains Config properties which will be used by a Lockstep engine.
/// Every peer of one session must use the same `tick_rate` and
/// `first_mutable_tick_interval`.
#[derive(Clone, Debug)]
pub struct LockstepConfig {
    /// Ticks executed per second while running
    pub tick_rate: u32,
    /// Upper bound for one chunk written to an action channel, header included
    pub max_chunk_size: usize,
    /// How long after joining a peer waits before deciding whether it is the
    /// very first peer
    pub initial_master_check_delay: Duration,
    /// Delay between noticing the master left and checking who takes over
    pub master_change_check_delay: Duration,
    /// How long a primary peer that is itself still syncing waits for the
    /// situation to resolve before resetting the session
    pub master_candidate_wait: Duration,
    /// A syncing peer asks again for state if none arrived for this long
    pub late_joiner_retry_interval: Duration,
    /// Received game state snapshots are applied one per interval
    pub late_joiner_game_state_interval: Duration,
    /// Debounce before the master sends late joiner data
    pub late_joiner_send_base_delay: Duration,
    /// Added to the debounce for every other join in the burst window
    pub late_joiner_send_delay_step: Duration,
    pub late_joiner_send_max_delay: Duration,
    pub late_joiner_burst_window: Duration,
    /// Wall clock time spent replaying ticks per frame while catching up
    pub catch_up_frame_budget: Duration,
    /// The first mutable tick advances by one every this many ticks
    pub first_mutable_tick_interval: u32,
    pub tick_sync_min_interval: Duration,
    pub tick_sync_max_interval: Duration,
    pub tick_sync_initial_interval: Duration,
}

impl Default for LockstepConfig {
    fn default() -> Self {
        Self {
            tick_rate: 10,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            initial_master_check_delay: Duration::from_secs(2),
            master_change_check_delay: Duration::from_millis(250),
            master_candidate_wait: Duration::from_secs(3),
            late_joiner_retry_interval: Duration::from_millis(2500),
            late_joiner_game_state_interval: Duration::from_millis(50),
            late_joiner_send_base_delay: Duration::from_millis(250),
            late_joiner_send_delay_step: Duration::from_millis(250),
            late_joiner_send_max_delay: Duration::from_secs(2),
            late_joiner_burst_window: Duration::from_secs(5),
            catch_up_frame_budget: Duration::from_millis(10),
            first_mutable_tick_interval: 10,
            tick_sync_min_interval: Duration::from_millis(50),
            tick_sync_max_interval: Duration::from_secs(1),
            tick_sync_initial_interval: Duration::from_millis(100),
        }
    }
}
