use std::{env, sync::Arc};

use flappy_verifier_core::constants::{MAX_REPLAY_TICKS_DEFAULT, TIMING_SLACK_MULTIPLIER_DEFAULT};
use flappy_verifier_core::{TimingPolicy, VerifyPolicy};

use crate::ScoreStore;

pub(crate) const DEFAULT_DATA_DIR: &str = "./data";
pub(crate) const DEFAULT_MAX_TRACE_LEN: usize = 4_096;
pub(crate) const DEFAULT_MAX_DISPLAY_NAME_CHARS: usize = 32;
pub(crate) const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
pub(crate) const DEFAULT_LEADERBOARD_MAX_LIMIT: usize = 100;
// Sessions that never produced a score are dropped after this long.
pub(crate) const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
pub(crate) const DEFAULT_SESSION_SWEEP_SECS: u64 = 60;
pub(crate) const DEFAULT_JSON_LIMIT_BYTES: usize = 256 * 1024;
pub(crate) const DEFAULT_HTTP_MAX_CONNECTIONS: usize = 25_000;
pub(crate) const DEFAULT_HTTP_KEEP_ALIVE_SECS: u64 = 75;

#[derive(Debug, Clone, Copy)]
pub(crate) struct ServerPolicy {
    pub(crate) max_trace_len: usize,
    pub(crate) max_display_name_chars: usize,
    pub(crate) leaderboard_default_limit: usize,
    pub(crate) leaderboard_max_limit: usize,
    pub(crate) verify: VerifyPolicy,
}

impl Default for ServerPolicy {
    fn default() -> Self {
        Self {
            max_trace_len: DEFAULT_MAX_TRACE_LEN,
            max_display_name_chars: DEFAULT_MAX_DISPLAY_NAME_CHARS,
            leaderboard_default_limit: DEFAULT_LEADERBOARD_LIMIT,
            leaderboard_max_limit: DEFAULT_LEADERBOARD_MAX_LIMIT,
            verify: VerifyPolicy::default(),
        }
    }
}

impl ServerPolicy {
    pub(crate) fn from_env() -> Self {
        let mut leaderboard_default_limit =
            read_env_usize("LEADERBOARD_DEFAULT_LIMIT", DEFAULT_LEADERBOARD_LIMIT);
        let mut leaderboard_max_limit =
            read_env_usize("LEADERBOARD_MAX_LIMIT", DEFAULT_LEADERBOARD_MAX_LIMIT);

        if leaderboard_default_limit > leaderboard_max_limit {
            tracing::warn!(
                "LEADERBOARD_DEFAULT_LIMIT ({}) > LEADERBOARD_MAX_LIMIT ({}). Falling back to defaults.",
                leaderboard_default_limit,
                leaderboard_max_limit
            );
            leaderboard_default_limit = DEFAULT_LEADERBOARD_LIMIT;
            leaderboard_max_limit = DEFAULT_LEADERBOARD_MAX_LIMIT;
        }

        let timing = TimingPolicy {
            slack_multiplier: read_env_u32(
                "TIMING_SLACK_MULTIPLIER",
                TIMING_SLACK_MULTIPLIER_DEFAULT,
            ),
            ..TimingPolicy::default()
        };

        Self {
            max_trace_len: read_env_usize("MAX_TRACE_LEN", DEFAULT_MAX_TRACE_LEN),
            max_display_name_chars: DEFAULT_MAX_DISPLAY_NAME_CHARS,
            leaderboard_default_limit,
            leaderboard_max_limit,
            verify: VerifyPolicy {
                max_ticks: read_env_u32("MAX_REPLAY_TICKS", MAX_REPLAY_TICKS_DEFAULT),
                timing,
            },
        }
    }

    /// Returns `(error_message, error_code)` on failure.
    pub(crate) fn leaderboard_limit(
        &self,
        requested: Option<usize>,
    ) -> Result<usize, (String, &'static str)> {
        let limit = requested.unwrap_or(self.leaderboard_default_limit);
        if limit == 0 || limit > self.leaderboard_max_limit {
            return Err((
                format!("limit must be between 1 and {}", self.leaderboard_max_limit),
                "invalid_limit",
            ));
        }
        Ok(limit)
    }
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<ScoreStore>,
    pub(crate) policy: ServerPolicy,
    pub(crate) session_ttl_secs: u64,
    pub(crate) http_workers: Option<usize>,
    pub(crate) http_max_connections: usize,
    pub(crate) http_keep_alive_secs: u64,
}

pub(crate) fn read_env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

pub(crate) fn read_env_optional_usize(name: &str) -> Option<usize> {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
}

pub(crate) fn read_env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

pub(crate) fn read_env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}
