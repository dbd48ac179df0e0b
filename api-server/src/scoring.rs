use std::time::{Duration, SystemTime, UNIX_EPOCH};

use actix_web::http::StatusCode;
use flappy_verifier_core::{verify_session, SessionTimes, VerifiedScore, VerifyError, VerifyPolicy};
use uuid::Uuid;

use crate::{AppState, FinishOutcome, RecordOutcome, SessionRecord};

pub(crate) fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis().min(u128::from(u64::MAX)) as u64)
        .unwrap_or(0)
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ScoreError {
    #[error("session not found")]
    SessionNotFound,
    #[error("session already finished")]
    SessionAlreadyFinished,
    #[error("session already has a recorded score")]
    SessionAlreadyScored,
    #[error("session failed verification and cannot be scored")]
    SessionRejected,
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error("score store error: {0}")]
    Store(String),
    #[error("replay worker failure: {0}")]
    Worker(String),
}

impl ScoreError {
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::SessionAlreadyFinished | Self::SessionAlreadyScored | Self::SessionRejected => {
                StatusCode::CONFLICT
            }
            Self::Verify(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Store(_) | Self::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "session_not_found",
            Self::SessionAlreadyFinished => "session_already_finished",
            Self::SessionAlreadyScored => "session_already_scored",
            Self::SessionRejected => "session_rejected",
            Self::Verify(VerifyError::ImplausibleTiming { .. }) => "invalid_game_session",
            Self::Verify(err) => err.code(),
            Self::Store(_) | Self::Worker(_) => "internal_error",
        }
    }

    /// Message safe to return to clients. Timing bands and internal failures
    /// stay in the logs.
    pub(crate) fn public_message(&self) -> String {
        match self {
            Self::Verify(VerifyError::ImplausibleTiming { .. }) => {
                "invalid game session".to_string()
            }
            Self::Store(_) | Self::Worker(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Create a session with a fresh token and seed key.
pub(crate) fn open_session(state: &AppState) -> Result<SessionRecord, ScoreError> {
    let session = SessionRecord::new(
        Uuid::new_v4().to_string(),
        Uuid::new_v4().simple().to_string(),
        now_unix_ms(),
    );
    state
        .store
        .create_session(&session)
        .map_err(ScoreError::Store)?;
    tracing::info!(token = %session.token, "session opened");
    Ok(session)
}

pub(crate) fn finish_session(state: &AppState, token: &str) -> Result<u64, ScoreError> {
    match state
        .store
        .finish_session(token, now_unix_ms())
        .map_err(ScoreError::Store)?
    {
        FinishOutcome::Finished(finished_at_ms) => {
            tracing::info!(token, finished_at_ms, "session finished");
            Ok(finished_at_ms)
        }
        FinishOutcome::NotFound => Err(ScoreError::SessionNotFound),
        FinishOutcome::AlreadyFinished(_) => Err(ScoreError::SessionAlreadyFinished),
    }
}

async fn run_replay(
    trace: Vec<i32>,
    seed_key: String,
    times: SessionTimes,
    policy: VerifyPolicy,
) -> Result<VerifiedScore, ScoreError> {
    let verified =
        tokio::task::spawn_blocking(move || verify_session(&trace, &seed_key, times, &policy))
            .await
            .map_err(|err| ScoreError::Worker(format!("join failure: {err}")))??;
    Ok(verified)
}

/// Replay a submitted trace against the session's seed and record the score.
///
/// No score is written unless replay and timing both pass. A failed check
/// rejects the session for good. A session that was never explicitly
/// finished is finished now.
pub(crate) async fn submit_score(
    state: &AppState,
    token: &str,
    display_name: &str,
    trace: Vec<i32>,
) -> Result<VerifiedScore, ScoreError> {
    let session = state
        .store
        .get_session(token)
        .map_err(ScoreError::Store)?
        .ok_or(ScoreError::SessionNotFound)?;
    if session.scored_at_ms.is_some() {
        return Err(ScoreError::SessionAlreadyScored);
    }
    if session.rejected_at_ms.is_some() {
        return Err(ScoreError::SessionRejected);
    }

    let finished_at_ms = session.finished_at_ms.unwrap_or_else(now_unix_ms);
    let times = SessionTimes {
        started_at_ms: session.created_at_ms,
        finished_at_ms,
    };
    let trace_len = trace.len();

    let verified = match run_replay(trace, session.seed_key, times, state.policy.verify).await {
        Ok(verified) => verified,
        Err(ScoreError::Verify(err)) => {
            tracing::warn!(token, trace_len, code = err.code(), "submission rejected: {err}");
            state
                .store
                .reject_session(token, now_unix_ms())
                .map_err(ScoreError::Store)?;
            return Err(ScoreError::Verify(err));
        }
        Err(err) => return Err(err),
    };

    match state
        .store
        .record_score(
            token,
            display_name,
            verified.score,
            finished_at_ms,
            now_unix_ms(),
        )
        .map_err(ScoreError::Store)?
    {
        RecordOutcome::Recorded(id) => {
            tracing::info!(
                token,
                score_id = id,
                score = verified.score,
                ticks = verified.ticks,
                "score recorded"
            );
            Ok(verified)
        }
        RecordOutcome::NotFound => Err(ScoreError::SessionNotFound),
        RecordOutcome::AlreadyScored => Err(ScoreError::SessionAlreadyScored),
        RecordOutcome::Rejected => Err(ScoreError::SessionRejected),
        RecordOutcome::FinishMismatch => {
            tracing::warn!(token, finished_at_ms, "session finished during replay");
            Err(ScoreError::SessionAlreadyFinished)
        }
    }
}

pub(crate) fn spawn_session_cleanup_task(state: AppState, sweep_secs: u64) {
    tokio::spawn(async move {
        let sweep = Duration::from_secs(sweep_secs);
        loop {
            tokio::time::sleep(sweep).await;
            match state.store.sweep(state.session_ttl_secs, now_unix_ms()) {
                Ok(0) => {}
                Ok(swept) => tracing::info!(swept, "swept expired sessions"),
                Err(e) => tracing::error!("session sweep failed: {e}"),
            }
        }
    });
}
