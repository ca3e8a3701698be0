use lockstep_peer::LockstepConfig;
use lockstep_test::{
    helpers::{assert_converged, init_logger},
    test_protocol::{add_payload, note_payload, ADD, NOTE},
    TestNetwork,
};

fn small_chunks() -> LockstepConfig {
    LockstepConfig {
        max_chunk_size: 32,
        ..LockstepConfig::default()
    }
}

#[test]
fn large_actions_arrive_whole() {
    init_logger();
    let mut network = TestNetwork::start(small_chunks(), 3);
    let long_note = "lockstep ".repeat(60);
    network.engine_mut(2).send_action(NOTE, &note_payload(&long_note));
    network.engine_mut(3).send_action(ADD, &add_payload(1));
    network.engine_mut(1).send_action(NOTE, &note_payload("short"));
    network.settle();

    assert_converged(&network);
    let notes = &network.peer(3).notes().notes;
    assert_eq!(notes.len(), 2);
    assert!(notes.contains(&long_note));
}

#[test]
fn late_joiner_data_spans_many_chunks() {
    let mut network = TestNetwork::start(small_chunks(), 1);
    for amount in 0..40 {
        network.engine_mut(1).send_action(ADD, &add_payload(amount));
    }
    network.engine_mut(1).send_action(NOTE, &note_payload(&"x".repeat(200)));
    network.settle();

    let joiner = network.add_peer();
    network.settle();

    assert_converged(&network);
    assert_eq!(network.peer(joiner).counter().entries.len(), 40);
}

#[test]
fn rejected_chunks_are_sent_again() {
    let mut network = TestNetwork::start(small_chunks(), 2);
    network.network.reject_sends(2, 25);
    network.engine_mut(2).send_action(NOTE, &note_payload(&"retry ".repeat(20)));
    network.engine_mut(2).send_action(ADD, &add_payload(12));
    network.settle();

    assert_converged(&network);
    assert_eq!(network.peer(1).counter().amounts(), vec![12]);
    assert_eq!(network.peer(1).notes().notes.len(), 1);
}
