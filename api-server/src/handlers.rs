use actix_web::{
    http::StatusCode,
    web::{Data, Json, Path, Query},
    HttpResponse, Responder,
};
use flappy_verifier_core::constants::{RULESET_NAME, RULESET_VERSION};
use flappy_verifier_core::rank_rows;

use crate::period::Period;
use crate::response::{json_error_with_code, score_error_response};
use crate::scoring::{finish_session as finish, open_session, submit_score as submit};
use crate::{
    AppState, HealthResponse, LeaderboardEntry, LeaderboardQuery, LeaderboardResponse,
    SessionCreatedResponse, SessionFinishedResponse, SubmitScoreRequest, SubmitScoreResponse,
};

/// Returns the trimmed name, or `(error_message, error_code)`.
pub(crate) fn validate_display_name(
    raw: &str,
    max_chars: usize,
) -> Result<String, (String, &'static str)> {
    let name = raw.trim();
    if name.is_empty() {
        return Err((
            "displayName must not be empty".to_string(),
            "invalid_display_name",
        ));
    }
    if name.chars().count() > max_chars {
        return Err((
            format!("displayName too long (max {max_chars} characters)"),
            "invalid_display_name",
        ));
    }
    if name.chars().any(char::is_control) {
        return Err((
            "displayName contains control characters".to_string(),
            "invalid_display_name",
        ));
    }
    Ok(name.to_string())
}

/// Returns `(error_message, error_code)` on failure.
pub(crate) fn validate_trace_len(len: usize, max_len: usize) -> Result<(), (String, &'static str)> {
    if len > max_len {
        return Err((
            format!("jumpHistory too long: {len} entries (max {max_len})"),
            "trace_too_long",
        ));
    }
    Ok(())
}

pub(crate) async fn health(state: Data<AppState>) -> impl Responder {
    let counts = match state.store.counts() {
        Ok(counts) => counts,
        Err(e) => {
            tracing::error!("health check failed: {e}");
            return json_error_with_code(
                StatusCode::INTERNAL_SERVER_ERROR,
                "score store error",
                Some("internal_error"),
            );
        }
    };

    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        service: "flappy-score-api",
        ruleset: RULESET_NAME,
        ruleset_version: RULESET_VERSION,
        sessions: counts.sessions,
        open_sessions: counts.open_sessions,
        scores: counts.scores,
        max_trace_len: state.policy.max_trace_len,
        leaderboard_default_limit: state.policy.leaderboard_default_limit,
        leaderboard_max_limit: state.policy.leaderboard_max_limit,
        verify_policy: state.policy.verify,
        session_ttl_secs: state.session_ttl_secs,
        http_workers: state.http_workers,
        http_max_connections: state.http_max_connections,
        http_keep_alive_secs: state.http_keep_alive_secs,
    })
}

pub(crate) async fn create_session(state: Data<AppState>) -> impl Responder {
    match open_session(&state) {
        Ok(session) => HttpResponse::Ok().json(SessionCreatedResponse {
            token: session.token,
            pipe_key: session.seed_key,
        }),
        Err(err) => score_error_response(&err),
    }
}

pub(crate) async fn finish_session(state: Data<AppState>, path: Path<String>) -> impl Responder {
    let token = path.into_inner();
    match finish(&state, &token) {
        Ok(finished_at_ms) => HttpResponse::Ok().json(SessionFinishedResponse {
            success: true,
            finished_at_ms,
        }),
        Err(err) => score_error_response(&err),
    }
}

pub(crate) async fn submit_score(
    state: Data<AppState>,
    path: Path<String>,
    req: Json<SubmitScoreRequest>,
) -> impl Responder {
    let token = path.into_inner();
    let SubmitScoreRequest {
        display_name,
        jump_history,
    } = req.into_inner();

    let display_name =
        match validate_display_name(&display_name, state.policy.max_display_name_chars) {
            Ok(name) => name,
            Err((msg, code)) => {
                return json_error_with_code(StatusCode::BAD_REQUEST, msg, Some(code))
            }
        };
    if let Err((msg, code)) = validate_trace_len(jump_history.len(), state.policy.max_trace_len) {
        return json_error_with_code(StatusCode::BAD_REQUEST, msg, Some(code));
    }

    match submit(&state, &token, &display_name, jump_history).await {
        Ok(verified) => HttpResponse::Ok().json(SubmitScoreResponse {
            success: true,
            score: verified.score,
        }),
        Err(err) => score_error_response(&err),
    }
}

pub(crate) async fn list_scores(
    state: Data<AppState>,
    query: Query<LeaderboardQuery>,
) -> impl Responder {
    let limit = match state.policy.leaderboard_limit(query.limit) {
        Ok(limit) => limit,
        Err((msg, code)) => return json_error_with_code(StatusCode::BAD_REQUEST, msg, Some(code)),
    };
    let period = Period::from_tag(query.period.as_deref());
    let since_unix_s = period.window_start_unix_s(chrono::Utc::now());

    match state.store.list_scores(since_unix_s, limit) {
        Ok(rows) => HttpResponse::Ok().json(LeaderboardResponse {
            success: true,
            period: period.as_str(),
            since_unix_s,
            scores: rank_rows(rows)
                .into_iter()
                .map(LeaderboardEntry::from)
                .collect(),
        }),
        Err(e) => {
            tracing::error!(period = period.as_str(), "list_scores failed: {e}");
            json_error_with_code(
                StatusCode::INTERNAL_SERVER_ERROR,
                "score store error",
                Some("internal_error"),
            )
        }
    }
}
