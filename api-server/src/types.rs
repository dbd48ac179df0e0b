use serde::{Deserialize, Serialize};

use flappy_verifier_core::{RankedScore, VerifyPolicy};

#[derive(Debug, Serialize)]
pub(crate) struct SessionCreatedResponse {
    pub(crate) token: String,
    #[serde(rename = "pipeKey")]
    pub(crate) pipe_key: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionFinishedResponse {
    pub(crate) success: bool,
    pub(crate) finished_at_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitScoreRequest {
    pub(crate) display_name: String,
    #[serde(default)]
    pub(crate) jump_history: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitScoreResponse {
    pub(crate) success: bool,
    pub(crate) score: u32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub(crate) struct LeaderboardQuery {
    #[serde(default)]
    pub(crate) period: Option<String>,
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LeaderboardEntry {
    pub(crate) rank: u32,
    pub(crate) display_name: String,
    pub(crate) score: u32,
    /// RFC 3339, UTC.
    pub(crate) created_at: String,
    pub(crate) created_at_unix_s: u64,
}

impl From<RankedScore> for LeaderboardEntry {
    fn from(row: RankedScore) -> Self {
        let created_at = chrono::DateTime::from_timestamp(row.created_at_unix_s as i64, 0)
            .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            .unwrap_or_default();
        Self {
            rank: row.rank,
            display_name: row.display_name,
            score: row.score,
            created_at,
            created_at_unix_s: row.created_at_unix_s,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LeaderboardResponse {
    pub(crate) success: bool,
    pub(crate) period: &'static str,
    pub(crate) since_unix_s: u64,
    pub(crate) scores: Vec<LeaderboardEntry>,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) service: &'static str,
    pub(crate) ruleset: &'static str,
    pub(crate) ruleset_version: u32,
    pub(crate) sessions: usize,
    pub(crate) open_sessions: usize,
    pub(crate) scores: usize,
    pub(crate) max_trace_len: usize,
    pub(crate) leaderboard_default_limit: usize,
    pub(crate) leaderboard_max_limit: usize,
    pub(crate) verify_policy: VerifyPolicy,
    pub(crate) session_ttl_secs: u64,
    pub(crate) http_workers: Option<usize>,
    pub(crate) http_max_connections: usize,
    pub(crate) http_keep_alive_secs: u64,
}
