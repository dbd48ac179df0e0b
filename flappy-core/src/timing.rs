//! Wall-clock plausibility of a replayed session.
//!
//! A replay proves which inputs produce a score, not that someone played
//! them live. The session's real duration must land between the simulated
//! duration at full frame rate and `slack_multiplier` times the simulated
//! duration plus one pipe interval.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DELTA_X16, TICKS_PER_PIPE_INTERVAL, TICKS_PER_SECOND, TIMING_SLACK_MULTIPLIER_DEFAULT,
};

const MS_PER_SECOND: u128 = 1_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingPolicy {
    pub ticks_per_second: u32,
    pub slack_multiplier: u32,
    pub interval_tolerance_ticks: u32,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            ticks_per_second: TICKS_PER_SECOND,
            slack_multiplier: TIMING_SLACK_MULTIPLIER_DEFAULT,
            interval_tolerance_ticks: TICKS_PER_PIPE_INTERVAL as u32,
        }
    }
}

impl TimingPolicy {
    pub fn simulated_ticks(final_x16: i32) -> u64 {
        (final_x16.max(0) / DELTA_X16) as u64
    }

    /// Accepted session length in milliseconds, `(min, max)` inclusive.
    pub fn tolerance_band_ms(&self, final_x16: i32) -> (u64, u64) {
        let tps = u128::from(self.ticks_per_second.max(1));
        let ticks = u128::from(Self::simulated_ticks(final_x16));
        let upper_ticks = u128::from(self.slack_multiplier)
            * (ticks + u128::from(self.interval_tolerance_ticks));
        let min_ms = (ticks * MS_PER_SECOND).div_ceil(tps);
        let max_ms = upper_ticks * MS_PER_SECOND / tps;
        (saturate(min_ms), saturate(max_ms))
    }

    pub fn is_plausible(&self, final_x16: i32, started_at_ms: u64, finished_at_ms: u64) -> bool {
        let Some(elapsed_ms) = finished_at_ms.checked_sub(started_at_ms) else {
            return false;
        };

        // elapsed_s * tps compared against tick counts, scaled by 1000 to stay integral.
        let scaled_elapsed = u128::from(elapsed_ms) * u128::from(self.ticks_per_second);
        let ticks = u128::from(Self::simulated_ticks(final_x16));
        let min_scaled = ticks * MS_PER_SECOND;
        let max_scaled = u128::from(self.slack_multiplier)
            * (ticks + u128::from(self.interval_tolerance_ticks))
            * MS_PER_SECOND;

        min_scaled <= scaled_elapsed && scaled_elapsed <= max_scaled
    }
}

fn saturate(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Plausibility under the default policy.
pub fn is_plausible(final_x16: i32, started_at_ms: u64, finished_at_ms: u64) -> bool {
    TimingPolicy::default().is_plausible(final_x16, started_at_ms, finished_at_ms)
}
