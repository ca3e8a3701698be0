use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use log::{Level, LevelFilter, Log, Metadata, Record};

use lockstep_shared::{ActionSender, ByteWriter, ChannelKind, TickUpdate, DEFAULT_MAX_CHUNK_SIZE};
use lockstep_test::{
    test_protocol::{add_payload, ADD},
    TestNetwork,
};

// never joins the session, only its payload is handed to the follower
const OUTSIDER: u32 = 9;

static STALL_WARNINGS: AtomicUsize = AtomicUsize::new(0);
static LOGGER: StallCounter = StallCounter;

/// Counts the stall warnings of the tick runner
struct StallCounter;

impl Log for StallCounter {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record) {
        if record.level() == Level::Warn && record.args().to_string().contains("is stalled") {
            STALL_WARNINGS.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn flush(&self) {}
}

#[test]
fn tick_waits_for_a_missing_payload() {
    log::set_logger(&LOGGER).ok();
    log::set_max_level(LevelFilter::Warn);

    let mut network = TestNetwork::with_peers(2);
    network.settle();
    let total_before = network.peer(2).counter().total;

    let mut outsider = ActionSender::new(DEFAULT_MAX_CHUNK_SIZE);
    outsider.set_local_peer(OUTSIDER);
    let unique_id = outsider.submit(ADD, &add_payload(7)).expect("owned sender");
    let chunk = outsider.front().expect("one chunk").to_vec();

    // the follower learns the tick of an action it has no payload for
    let stalled_tick = network.peer(2).engine.current_tick() + 3;
    let update = TickUpdate {
        current_tick: stalled_tick + 20,
        associations: vec![(stalled_tick, unique_id)],
    };
    let mut writer = ByteWriter::new();
    update.write(&mut writer);
    network.engine_mut(2).receive(ChannelKind::Tick, 1, writer.as_slice());

    network.run_for(Duration::from_secs(1));
    assert_eq!(network.peer(2).engine.current_tick(), stalled_tick - 1);
    assert_eq!(network.peer(2).counter().total, total_before);
    network.run_for(Duration::from_secs(1));
    assert_eq!(network.peer(2).engine.current_tick(), stalled_tick - 1);
    assert_eq!(STALL_WARNINGS.load(Ordering::SeqCst), 1);

    network.engine_mut(2).receive(ChannelKind::Action, OUTSIDER, &chunk);
    network.run_for(Duration::from_millis(500));

    let peer = network.peer(2);
    assert!(peer.engine.current_tick() > stalled_tick);
    assert_eq!(peer.counter().total, total_before + 7);
    let entry = peer
        .counter()
        .entries
        .iter()
        .find(|entry| entry.unique_id == unique_id)
        .expect("the stalled action ran");
    assert_eq!(entry.tick, stalled_tick);
    assert_eq!(peer.engine.pending_action_count(), 0);
    assert_eq!(STALL_WARNINGS.load(Ordering::SeqCst), 1);
}
