use proptest::prelude::*;

use lockstep_test::{
    helpers::{assert_converged, init_logger},
    test_protocol::{add_payload, note_payload, ADD, NOTE},
    TestNetwork,
};

#[test]
fn interleaved_actions_run_in_the_same_order_everywhere() {
    init_logger();
    let mut network = TestNetwork::with_peers(3);
    let peers = network.peer_ids();

    for round in 0..20i64 {
        for peer in &peers {
            let amount = round * 10 + i64::from(*peer);
            network.engine_mut(*peer).send_action(ADD, &add_payload(amount));
        }
        // uneven gaps so actions land on different ticks
        for _ in 0..(round % 4) {
            network.step();
        }
    }
    network.settle();

    assert_converged(&network);
    let counter = network.peer(1).counter();
    assert_eq!(counter.entries.len(), 60);
    // ticks never go backwards
    assert!(counter
        .entries
        .windows(2)
        .all(|pair| pair[0].tick <= pair[1].tick));
}

#[test]
fn actions_of_one_peer_keep_their_order() {
    let mut network = TestNetwork::with_peers(2);
    for amount in 0..30 {
        network.engine_mut(2).send_action(ADD, &add_payload(amount));
    }
    network.settle();

    assert_converged(&network);
    assert_eq!(network.peer(1).counter().amounts(), (0..30).collect::<Vec<_>>());
}

#[test]
fn master_and_followers_agree_on_ticks() {
    let mut network = TestNetwork::with_peers(2);
    network.engine_mut(1).send_action(NOTE, &note_payload("from the master"));
    network.engine_mut(2).send_action(NOTE, &note_payload("from a follower"));
    network.engine_mut(2).send_action(ADD, &add_payload(1));
    network.settle();

    assert_converged(&network);
    assert_eq!(network.peer(2).notes().notes.len(), 2);
    let master_tick = network.peer(1).engine.current_tick();
    let follower_tick = network.peer(2).engine.current_tick();
    assert!(follower_tick <= master_tick);
    assert!(master_tick - follower_tick <= 15);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// Whatever peers send and whenever they send it, every peer runs the
    /// same list
    #[test]
    fn any_send_pattern_converges(
        sends in proptest::collection::vec((0usize..3, -100i64..100, 0usize..5), 1..40)
    ) {
        let mut network = TestNetwork::with_peers(3);
        let peers = network.peer_ids();
        for (sender, amount, gap) in &sends {
            network.engine_mut(peers[*sender]).send_action(ADD, &add_payload(*amount));
            for _ in 0..*gap {
                network.step();
            }
        }
        network.settle();

        assert_converged(&network);
        prop_assert_eq!(network.peer(peers[0]).counter().entries.len(), sends.len());
    }
}
