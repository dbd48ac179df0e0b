use flappy_verifier_core::constants::{LAYOUT_LEN, MAX_REPLAY_TICKS_DEFAULT};
use flappy_verifier_core::layout::generate_layout;
use flappy_verifier_core::sim::replay_with_checkpoints;
use flappy_verifier_core::{
    is_plausible, verify_and_score, verify_session, verify_trace, SessionTimes, VerifyError,
    VerifyPolicy,
};
use proptest::prelude::*;

const CANONICAL_KEY: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ123456";

// Recorded from a real run on the canonical key.
const CANONICAL_TRACE: [i32; 29] = [
    736, 1440, 2816, 4928, 6464, 8032, 10432, 11552, 13088, 14880, 15904, 17952, 19392, 20864,
    21792, 23200, 24608, 26624, 27968, 29824, 31616, 32896, 34912, 36480, 37664, 39072, 40192,
    41824, 43936,
];

fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(32);
    ProptestConfig {
        cases,
        ..ProptestConfig::default()
    }
}

#[test]
fn canonical_run_scores_nine() {
    assert_eq!(verify_and_score(&CANONICAL_TRACE, CANONICAL_KEY), Ok(9));
}

#[test]
fn canonical_run_consumes_every_jump() {
    let result = verify_trace(&CANONICAL_TRACE, CANONICAL_KEY).expect("canonical run must replay");
    assert_eq!(result.jumps_consumed, CANONICAL_TRACE.len() as u32);
    assert_eq!(result.ticks, 1389);
    assert_eq!(result.final_state.x16, 44_448);
    assert_eq!(result.final_state.y16, 3_468);
    assert_eq!(result.final_state.vy16, -28);
}

#[test]
fn canonical_run_passes_timing_when_played_live() {
    let policy = VerifyPolicy::default();
    let start = 1_731_686_400_000;
    let live = SessionTimes {
        started_at_ms: start,
        finished_at_ms: start + 30_000,
    };
    let verified = verify_session(&CANONICAL_TRACE, CANONICAL_KEY, live, &policy).unwrap();
    assert_eq!(verified.score, 9);

    let offline = SessionTimes {
        started_at_ms: start,
        finished_at_ms: start + 2_000,
    };
    assert_eq!(
        verify_session(&CANONICAL_TRACE, CANONICAL_KEY, offline, &policy),
        Err(VerifyError::ImplausibleTiming {
            elapsed_ms: 2_000,
            min_ms: 23_150,
            max_ms: 50_566,
        })
    );
}

#[test]
fn truncated_trace_scores_less() {
    let score = verify_and_score(&CANONICAL_TRACE[..10], CANONICAL_KEY).unwrap();
    assert!(score < 9);
}

#[test]
fn trace_on_another_key_does_not_transfer() {
    let score = verify_and_score(&CANONICAL_TRACE, "01HZY3S5Q4V9W8X7Y6Z5A4B3C2").unwrap();
    assert!(score < 9);
}

#[test]
fn empty_trace_terminates_within_budget() {
    for key in [CANONICAL_KEY, "a", "01HZY3S5Q4V9W8X7Y6Z5A4B3C2", "ゲーム"] {
        let result = verify_trace(&[], key).expect("empty trace must collide");
        assert!(result.ticks < MAX_REPLAY_TICKS_DEFAULT);
        assert_eq!(result.score, 0);
    }
}

#[test]
fn timing_boundaries_for_canonical_run() {
    let start = 1_000_000;
    // 1389 ticks = 23.15 s; upper bound 2 * (1389 + 128) / 60 s = 50.566.. s
    assert!(is_plausible(44_448, start, start + 23_150));
    assert!(!is_plausible(44_448, start, start + 22_918)); // 0.99 x 23.15 s
    assert!(is_plausible(44_448, start, start + 50_566));
    assert!(!is_plausible(44_448, start, start + 50_576)); // bound + 0.01 s
}

fn jump_trace() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(1i32..3_000, 0..60).prop_map(|mut ticks| {
        ticks.sort_unstable();
        ticks.dedup();
        ticks.into_iter().map(|tick| tick * 32).collect()
    })
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn layout_is_deterministic(key in "[A-Za-z0-9]{1,48}") {
        prop_assert_eq!(generate_layout(&key).unwrap(), generate_layout(&key).unwrap());
    }

    #[test]
    fn layout_lookup_is_cyclic(key in "[A-Z0-9]{26}", index in 0usize..LAYOUT_LEN, laps in 0usize..16) {
        let layout = generate_layout(&key).unwrap();
        prop_assert_eq!(layout.gap_at(index), layout.gap_at(index + LAYOUT_LEN * laps));
    }

    #[test]
    fn score_never_decreases_during_replay(trace in jump_trace()) {
        let layout = generate_layout(CANONICAL_KEY).unwrap();
        let checkpoints =
            replay_with_checkpoints(&layout, &trace, MAX_REPLAY_TICKS_DEFAULT, 1).unwrap();
        for pair in checkpoints.windows(2) {
            prop_assert!(pair[1].state.x16 > pair[0].state.x16);
            prop_assert!(pair[1].score >= pair[0].score);
        }
    }

    #[test]
    fn replay_is_deterministic(trace in jump_trace(), key in "[A-Za-z0-9]{1,32}") {
        prop_assert_eq!(verify_trace(&trace, &key), verify_trace(&trace, &key));
    }
}
