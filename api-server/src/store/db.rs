use flappy_verifier_core::ScoreRow;
use rusqlite::{params, Connection, Row};

use super::ScoreStore;

/// One row of the `sessions` table, timestamps in unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token: String,
    pub seed_key: String,
    pub created_at_ms: u64,
    pub finished_at_ms: Option<u64>,
    pub scored_at_ms: Option<u64>,
    pub rejected_at_ms: Option<u64>,
}

impl SessionRecord {
    pub fn new(token: String, seed_key: String, created_at_ms: u64) -> Self {
        Self {
            token,
            seed_key,
            created_at_ms,
            finished_at_ms: None,
            scored_at_ms: None,
            rejected_at_ms: None,
        }
    }
}

impl ScoreStore {
    pub(super) fn insert_session_row(
        conn: &Connection,
        session: &SessionRecord,
    ) -> Result<(), String> {
        conn.execute(
            "INSERT INTO sessions (
                token, seed_key, created_at_ms, finished_at_ms, scored_at_ms, rejected_at_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.token,
                session.seed_key,
                session.created_at_ms as i64,
                session.finished_at_ms.map(|v| v as i64),
                session.scored_at_ms.map(|v| v as i64),
                session.rejected_at_ms.map(|v| v as i64),
            ],
        )
        .map_err(|e| format!("insert session failed: {e}"))?;
        Ok(())
    }
}

/// Raw SQLite row before conversion to `SessionRecord`.
pub(super) struct RawSessionRow {
    token: String,
    seed_key: String,
    created_at_ms: i64,
    finished_at_ms: Option<i64>,
    scored_at_ms: Option<i64>,
    rejected_at_ms: Option<i64>,
}

impl RawSessionRow {
    pub(super) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            token: row.get(0)?,
            seed_key: row.get(1)?,
            created_at_ms: row.get(2)?,
            finished_at_ms: row.get(3)?,
            scored_at_ms: row.get(4)?,
            rejected_at_ms: row.get(5)?,
        })
    }

    pub(super) fn into_record(self) -> SessionRecord {
        SessionRecord {
            token: self.token,
            seed_key: self.seed_key,
            created_at_ms: non_negative(self.created_at_ms),
            finished_at_ms: self.finished_at_ms.map(non_negative),
            scored_at_ms: self.scored_at_ms.map(non_negative),
            rejected_at_ms: self.rejected_at_ms.map(non_negative),
        }
    }
}

pub(super) struct RawScoreRow {
    display_name: String,
    score: i64,
    created_at: i64,
}

impl RawScoreRow {
    pub(super) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            display_name: row.get(0)?,
            score: row.get(1)?,
            created_at: row.get(2)?,
        })
    }

    pub(super) fn into_score_row(self) -> ScoreRow {
        ScoreRow {
            display_name: self.display_name,
            score: u32::try_from(self.score).unwrap_or(0),
            created_at_unix_s: non_negative(self.created_at),
        }
    }
}

fn non_negative(value: i64) -> u64 {
    value.max(0) as u64
}
