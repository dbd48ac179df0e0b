use serde::{Deserialize, Serialize};

use crate::constants::MAX_REPLAY_TICKS_DEFAULT;
use crate::error::VerifyError;
use crate::layout::generate_layout;
use crate::sim::{replay, ReplayResult};
use crate::timing::TimingPolicy;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPolicy {
    pub max_ticks: u32,
    pub timing: TimingPolicy,
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self {
            max_ticks: MAX_REPLAY_TICKS_DEFAULT,
            timing: TimingPolicy::default(),
        }
    }
}

/// Wall-clock bounds of a session, unix milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTimes {
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
}

/// Outcome of a replay that also passed the timing check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedScore {
    pub score: u32,
    pub ticks: u32,
    pub final_x16: i32,
    pub jumps_consumed: u32,
}

pub fn verify_trace(trace: &[i32], seed_key: &str) -> Result<ReplayResult, VerifyError> {
    verify_trace_with_budget(trace, seed_key, MAX_REPLAY_TICKS_DEFAULT)
}

pub fn verify_trace_with_budget(
    trace: &[i32],
    seed_key: &str,
    max_ticks: u32,
) -> Result<ReplayResult, VerifyError> {
    let layout = generate_layout(seed_key)?;
    replay(&layout, trace, max_ticks)
}

pub fn verify_and_score(trace: &[i32], seed_key: &str) -> Result<u32, VerifyError> {
    verify_trace(trace, seed_key).map(|result| result.score)
}

/// Replay the trace, then check it against the session's wall-clock length.
/// Nothing is returned unless both pass.
pub fn verify_session(
    trace: &[i32],
    seed_key: &str,
    times: SessionTimes,
    policy: &VerifyPolicy,
) -> Result<VerifiedScore, VerifyError> {
    verify_session_with_replay(trace, seed_key, times, policy, verify_trace_with_budget)
}

fn verify_session_with_replay<F>(
    trace: &[i32],
    seed_key: &str,
    times: SessionTimes,
    policy: &VerifyPolicy,
    replay_fn: F,
) -> Result<VerifiedScore, VerifyError>
where
    F: FnOnce(&[i32], &str, u32) -> Result<ReplayResult, VerifyError>,
{
    let result = replay_fn(trace, seed_key, policy.max_ticks)?;
    let final_x16 = result.final_state.x16;

    if !policy
        .timing
        .is_plausible(final_x16, times.started_at_ms, times.finished_at_ms)
    {
        let (min_ms, max_ms) = policy.timing.tolerance_band_ms(final_x16);
        return Err(VerifyError::ImplausibleTiming {
            elapsed_ms: times.finished_at_ms.saturating_sub(times.started_at_ms),
            min_ms,
            max_ms,
        });
    }

    Ok(VerifiedScore {
        score: result.score,
        ticks: result.ticks,
        final_x16,
        jumps_consumed: result.jumps_consumed,
    })
}
