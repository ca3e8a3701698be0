use crate::helpers::TestNetwork;

pub fn init_logger() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init()
        .ok();
}

/// Every peer ran the same actions, on the same ticks, in the same order
pub fn assert_converged(network: &TestNetwork) {
    let mut peers = network.peers();
    let Some(first) = peers.next() else {
        return;
    };
    let expected = first.counter();
    for peer in peers {
        let counter = peer.counter();
        assert_eq!(
            counter.entries,
            expected.entries,
            "peer {} ran different actions than peer {}",
            peer.engine.local_peer(),
            first.engine.local_peer()
        );
        assert_eq!(counter.total, expected.total);
        assert_eq!(peer.notes().notes, first.notes().notes);
    }
}
