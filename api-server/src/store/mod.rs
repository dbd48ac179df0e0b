mod db;

use std::{
    collections::HashSet,
    fs,
    path::Path,
    sync::{Mutex, MutexGuard},
};

use flappy_verifier_core::ScoreRow;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

pub(crate) use db::SessionRecord;
use db::{RawScoreRow, RawSessionRow};

/// Result of marking a session finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    /// `finished_at_ms` was set to the given instant.
    Finished(u64),
    NotFound,
    /// The session already carries a finish time, which is left untouched.
    AlreadyFinished(u64),
}

/// Result of recording a verified score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Score row inserted; carries its row id.
    Recorded(i64),
    /// The session disappeared (swept) between lookup and insert.
    NotFound,
    /// Another submission for the same session won the race.
    AlreadyScored,
    /// An earlier submission for the session failed verification.
    Rejected,
    /// The session was finished at a different instant than the one the
    /// replay was checked against.
    FinishMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    pub sessions: usize,
    pub open_sessions: usize,
    pub scores: usize,
}

/// SQLite-backed session and score store.
///
/// Sessions hold the seed key handed to the client plus wall-clock bounds in
/// unix milliseconds. Scores hold the display name, the verified score and a
/// unix-seconds creation time used by the leaderboard windows.
pub struct ScoreStore {
    conn: Mutex<Connection>,
}

const SESSIONS_SCHEMA_MIGRATIONS: [(&str, &str); 3] = [
    (
        "finished_at_ms",
        "ALTER TABLE sessions ADD COLUMN finished_at_ms INTEGER;",
    ),
    (
        "scored_at_ms",
        "ALTER TABLE sessions ADD COLUMN scored_at_ms INTEGER;",
    ),
    (
        "rejected_at_ms",
        "ALTER TABLE sessions ADD COLUMN rejected_at_ms INTEGER;",
    ),
];

const SCORES_SCHEMA_MIGRATIONS: [(&str, &str); 1] = [(
    "session_token",
    "ALTER TABLE scores ADD COLUMN session_token TEXT;",
)];

impl ScoreStore {
    /// Open (or create) `{data_dir}/scores.db` and bring its schema up to date.
    pub fn open(data_dir: &Path) -> Result<Self, String> {
        fs::create_dir_all(data_dir)
            .map_err(|e| format!("failed to create data dir {}: {e}", data_dir.display()))?;

        let db_path = data_dir.join("scores.db");
        let conn = Connection::open(&db_path)
            .map_err(|e| format!("failed to open SQLite at {}: {e}", db_path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA busy_timeout=5000;
             PRAGMA synchronous=NORMAL;",
        )
        .map_err(|e| format!("failed to set pragmas: {e}"))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                token           TEXT PRIMARY KEY,
                seed_key        TEXT NOT NULL,
                created_at_ms   INTEGER NOT NULL,
                finished_at_ms  INTEGER,
                scored_at_ms    INTEGER,
                rejected_at_ms  INTEGER
             );
             CREATE TABLE IF NOT EXISTS scores (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                display_name    TEXT NOT NULL,
                score           INTEGER NOT NULL,
                created_at      INTEGER NOT NULL,
                session_token   TEXT
             );
             CREATE INDEX IF NOT EXISTS idx_sessions_created_at ON sessions(created_at_ms);
             CREATE INDEX IF NOT EXISTS idx_scores_created_at ON scores(created_at);
             CREATE INDEX IF NOT EXISTS idx_scores_score ON scores(score DESC, id ASC);",
        )
        .map_err(|e| format!("failed to create schema: {e}"))?;

        Self::ensure_schema(&conn, "sessions", &SESSIONS_SCHEMA_MIGRATIONS)?;
        Self::ensure_schema(&conn, "scores", &SCORES_SCHEMA_MIGRATIONS)?;

        // Depends on a migrated column, so it is created after the migrations run.
        conn.execute_batch(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_scores_session_token
                 ON scores(session_token);",
        )
        .map_err(|e| format!("failed to create session_token index: {e}"))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn ensure_schema(
        conn: &Connection,
        table: &str,
        migrations: &[(&str, &str)],
    ) -> Result<(), String> {
        let mut columns = Self::table_columns(conn, table)?;
        for &(column, migration_sql) in migrations {
            if columns.contains(column) {
                continue;
            }

            tracing::warn!(table, column, "applying table migration");
            conn.execute_batch(migration_sql)
                .map_err(|e| format!("failed to add {table}.{column}: {e}"))?;
            columns.insert(column.to_string());
        }
        Ok(())
    }

    fn table_columns(conn: &Connection, table: &str) -> Result<HashSet<String>, String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .map_err(|e| format!("failed to read {table} table info: {e}"))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(|e| format!("failed to iterate {table} columns: {e}"))?;

        let mut columns = HashSet::new();
        for row in rows {
            columns.insert(row.map_err(|e| format!("failed to parse {table} column info: {e}"))?);
        }
        Ok(columns)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, String> {
        self.conn
            .lock()
            .map_err(|_| "score store mutex poisoned".to_string())
    }

    pub fn create_session(&self, session: &SessionRecord) -> Result<(), String> {
        let conn = self.lock()?;
        Self::insert_session_row(&conn, session)
    }

    pub fn get_session(&self, token: &str) -> Result<Option<SessionRecord>, String> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                "SELECT token, seed_key, created_at_ms, finished_at_ms, scored_at_ms,
                        rejected_at_ms
                 FROM sessions WHERE token = ?1",
                params![token],
                RawSessionRow::from_row,
            )
            .optional()
            .map_err(|e| format!("get_session failed: {e}"))?;
        Ok(raw.map(RawSessionRow::into_record))
    }

    /// Set the session's finish time unless one is already recorded.
    pub fn finish_session(&self, token: &str, now_ms: u64) -> Result<FinishOutcome, String> {
        let conn = self.lock()?;
        let updated = conn
            .execute(
                "UPDATE sessions SET finished_at_ms = ?1
                 WHERE token = ?2 AND finished_at_ms IS NULL",
                params![now_ms as i64, token],
            )
            .map_err(|e| format!("finish_session update failed: {e}"))?;
        if updated > 0 {
            return Ok(FinishOutcome::Finished(now_ms));
        }

        let existing: Option<Option<i64>> = conn
            .query_row(
                "SELECT finished_at_ms FROM sessions WHERE token = ?1",
                params![token],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| format!("finish_session lookup failed: {e}"))?;

        Ok(match existing {
            None => FinishOutcome::NotFound,
            Some(finished) => FinishOutcome::AlreadyFinished(finished.unwrap_or(0).max(0) as u64),
        })
    }

    /// Mark a session as failed verification and finish it if it is still
    /// open. It can never be scored afterwards. Returns false if the session is missing, already scored
    /// or already rejected.
    pub fn reject_session(&self, token: &str, now_ms: u64) -> Result<bool, String> {
        let conn = self.lock()?;
        let updated = conn
            .execute(
                "UPDATE sessions
                 SET rejected_at_ms = ?1, finished_at_ms = COALESCE(finished_at_ms, ?1)
                 WHERE token = ?2 AND scored_at_ms IS NULL AND rejected_at_ms IS NULL",
                params![now_ms as i64, token],
            )
            .map_err(|e| format!("reject_session failed: {e}"))?;
        Ok(updated > 0)
    }

    /// Insert a verified score and stamp the session in one transaction.
    ///
    /// `finished_at_ms` is the finish time the replay was checked against.
    /// It fills in a missing finish time and must match one already stored.
    pub fn record_score(
        &self,
        token: &str,
        display_name: &str,
        score: u32,
        finished_at_ms: u64,
        now_ms: u64,
    ) -> Result<RecordOutcome, String> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| format!("record_score begin failed: {e}"))?;

        let stamps: Option<(Option<i64>, Option<i64>, Option<i64>)> = tx
            .query_row(
                "SELECT finished_at_ms, scored_at_ms, rejected_at_ms
                 FROM sessions WHERE token = ?1",
                params![token],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| format!("record_score lookup failed: {e}"))?;

        let Some((finished, scored, rejected)) = stamps else {
            return Ok(RecordOutcome::NotFound);
        };
        if scored.is_some() {
            return Ok(RecordOutcome::AlreadyScored);
        }
        if rejected.is_some() {
            return Ok(RecordOutcome::Rejected);
        }
        if finished.is_some_and(|stored| stored != finished_at_ms as i64) {
            return Ok(RecordOutcome::FinishMismatch);
        }

        tx.execute(
            "UPDATE sessions
             SET finished_at_ms = ?1, scored_at_ms = ?2
             WHERE token = ?3",
            params![finished_at_ms as i64, now_ms as i64, token],
        )
        .map_err(|e| format!("record_score session update failed: {e}"))?;

        tx.execute(
            "INSERT INTO scores (display_name, score, created_at, session_token)
             VALUES (?1, ?2, ?3, ?4)",
            params![display_name, score as i64, (now_ms / 1_000) as i64, token],
        )
        .map_err(|e| format!("record_score insert failed: {e}"))?;
        let id = tx.last_insert_rowid();

        tx.commit()
            .map_err(|e| format!("record_score commit failed: {e}"))?;
        Ok(RecordOutcome::Recorded(id))
    }

    /// Scores created at or after `since_unix_s`, best first, ties in
    /// insertion order.
    pub fn list_scores(&self, since_unix_s: u64, limit: usize) -> Result<Vec<ScoreRow>, String> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT display_name, score, created_at FROM scores
                 WHERE created_at >= ?1
                 ORDER BY score DESC, id ASC
                 LIMIT ?2",
            )
            .map_err(|e| format!("list_scores prepare failed: {e}"))?;
        let rows = stmt
            .query_map(
                params![since_unix_s as i64, limit as i64],
                RawScoreRow::from_row,
            )
            .map_err(|e| format!("list_scores query failed: {e}"))?;

        let mut scores = Vec::new();
        for row in rows {
            let raw = row.map_err(|e| format!("list_scores row failed: {e}"))?;
            scores.push(raw.into_score_row());
        }
        Ok(scores)
    }

    pub fn counts(&self) -> Result<StoreCounts, String> {
        let conn = self.lock()?;
        let (sessions, open_sessions) = conn
            .query_row(
                "SELECT
                     COUNT(*),
                     COUNT(*) FILTER (WHERE scored_at_ms IS NULL AND rejected_at_ms IS NULL)
                 FROM sessions",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .map_err(|e| format!("counts sessions failed: {e}"))?;
        let scores: i64 = conn
            .query_row("SELECT COUNT(*) FROM scores", [], |row| row.get(0))
            .map_err(|e| format!("counts scores failed: {e}"))?;

        Ok(StoreCounts {
            sessions: sessions as usize,
            open_sessions: open_sessions as usize,
            scores: scores as usize,
        })
    }

    /// Delete sessions older than `ttl_secs` that never produced a score,
    /// rejected ones included.
    /// Returns the number of sessions removed.
    pub fn sweep(&self, ttl_secs: u64, now_ms: u64) -> Result<usize, String> {
        let cutoff_ms = now_ms.saturating_sub(ttl_secs.saturating_mul(1_000)) as i64;
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM sessions WHERE scored_at_ms IS NULL AND created_at_ms < ?1",
            params![cutoff_ms],
        )
        .map_err(|e| format!("sweep delete failed: {e}"))
    }
}
