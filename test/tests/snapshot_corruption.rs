/// PROPERTY-BASED TESTS: snapshot integrity
///
/// Any single bit flipped in an exported snapshot, whether in its text or in
/// the decoded bytes, must make the import fail as a whole.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use proptest::prelude::*;

use lockstep_shared::{export_at, preprocess, GameStates, SnapshotError, UniqueId};
use lockstep_test::{Counter, Entry, Trace};

fn game_states(total: i64, entries: &[(u32, i64)]) -> GameStates {
    let mut counter = Counter::new(Trace::new());
    counter.total = total;
    counter.entries = entries
        .iter()
        .enumerate()
        .map(|(sequence, (tick, amount))| Entry {
            tick: *tick,
            unique_id: UniqueId::new(1, sequence as u32 + 1),
            amount: *amount,
        })
        .collect();
    let mut game_states = GameStates::new();
    game_states.add(Box::new(counter));
    game_states
}

fn export(total: i64, entries: &[(u32, i64)], name: Option<&str>) -> String {
    let timestamp = UNIX_EPOCH + Duration::from_millis(1_700_000_000_000);
    export_at(&game_states(total, entries), &[0], name, timestamp).expect("counter is exportable")
}

#[test]
fn untouched_snapshot_is_accepted() {
    let text = export(5, &[(1, 2), (3, 3)], Some("save"));
    let staged = preprocess(&text, &game_states(0, &[])).expect("valid snapshot");
    assert_eq!(staged.name.as_deref(), Some("save"));
    assert_eq!(
        staged.exported_at,
        UNIX_EPOCH + Duration::from_millis(1_700_000_000_000)
    );
    assert!(!staged.has_errors());
}

#[test]
fn truncated_snapshot_is_rejected() {
    let text = export(5, &[(1, 2)], None);
    let truncated = &text[..text.len() - 4];
    assert!(preprocess(truncated, &game_states(0, &[])).is_err());
}

#[test]
fn export_is_reproducible_at_a_fixed_time() {
    assert_eq!(export(1, &[(4, 1)], None), export(1, &[(4, 1)], None));
    assert_ne!(
        export(1, &[(4, 1)], None),
        export(2, &[(4, 1)], None)
    );
    assert!(export_at(&game_states(1, &[]), &[0], None, SystemTime::now()).is_ok());
}

proptest! {
    #[test]
    fn flipped_text_bit_is_detected(
        total in any::<i64>(),
        entries in proptest::collection::vec((0u32..10_000, any::<i64>()), 0..20),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let text = export(total, &entries, Some("corruption"));
        let mut bytes = text.into_bytes();
        let position = position.index(bytes.len());
        bytes[position] ^= 1 << bit;

        // flips that break UTF-8 cannot even be handed over as text
        if let Ok(corrupted) = String::from_utf8(bytes) {
            prop_assert!(preprocess(&corrupted, &game_states(0, &[])).is_err());
        }
    }

    #[test]
    fn flipped_data_bit_is_detected(
        total in any::<i64>(),
        entries in proptest::collection::vec((0u32..10_000, any::<i64>()), 0..20),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let text = export(total, &entries, None);
        let mut bytes = base64::decode(&text).expect("export is base64");
        let position = position.index(bytes.len());
        bytes[position] ^= 1 << bit;
        let corrupted = base64::encode(&bytes);

        let result = preprocess(&corrupted, &game_states(0, &[]));
        prop_assert!(
            matches!(result, Err(SnapshotError::ChecksumMismatch { .. })),
            "unexpected result {:?}",
            result
        );
    }
}
