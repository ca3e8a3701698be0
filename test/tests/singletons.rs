use std::time::Duration;

use lockstep_test::{
    helpers::{assert_converged, init_logger},
    test_protocol::{add_once_payload, ADD_ONCE},
    Entry, TestNetwork,
};

fn runs_of(network: &TestNetwork, peer: u32, amount: i64) -> Vec<Entry> {
    network
        .peer(peer)
        .counter()
        .entries
        .iter()
        .filter(|entry| entry.amount == amount)
        .copied()
        .collect()
}

#[test]
fn singleton_is_sent_by_the_responsible_peer_only() {
    init_logger();
    let mut network = TestNetwork::with_peers(3);
    network
        .engine_mut(1)
        .send_action(ADD_ONCE, &add_once_payload(2, 7));
    network.settle();

    assert_converged(&network);
    for peer in network.peer_ids() {
        let runs = runs_of(&network, peer, 7);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].unique_id.peer(), 2);
        assert_eq!(network.peer(peer).engine.singleton_ticket_count(), 0);
    }
}

#[test]
fn singleton_survives_its_sender_leaving() {
    init_logger();
    let mut network = TestNetwork::with_peers(3);
    // peer 3 can no longer write anything
    network.network.reject_sends(3, usize::MAX);
    network
        .engine_mut(1)
        .send_action(ADD_ONCE, &add_once_payload(3, 11));
    assert!(network.run_until(Duration::from_secs(5), |network| {
        network.peer(1).engine.singleton_ticket_count() == 1
            && network.peer(2).engine.singleton_ticket_count() == 1
    }));

    network.remove_peer(3);
    network.settle();

    assert_converged(&network);
    for peer in network.peer_ids() {
        let runs = runs_of(&network, peer, 11);
        assert_eq!(runs.len(), 1, "peer {} ran the singleton {} times", peer, runs.len());
        // the master sent it in place of the departed peer
        assert_eq!(runs[0].unique_id.peer(), 1);
        assert_eq!(network.peer(peer).engine.singleton_ticket_count(), 0);
    }
}

#[test]
fn singleton_for_an_unknown_peer_falls_to_the_master() {
    let mut network = TestNetwork::with_peers(2);
    network
        .engine_mut(2)
        .send_action(ADD_ONCE, &add_once_payload(99, 13));
    network.settle();

    assert_converged(&network);
    let runs = runs_of(&network, 2, 13);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].unique_id.peer(), 1);
}

#[test]
fn singleton_in_single_peer_mode_runs_once() {
    let mut network = TestNetwork::with_peers(1);
    network
        .engine_mut(1)
        .send_action(ADD_ONCE, &add_once_payload(1, 5));
    network.run_for(Duration::from_secs(1));

    assert_eq!(runs_of(&network, 1, 5).len(), 1);
    assert_eq!(network.peer(1).engine.singleton_ticket_count(), 0);
}
