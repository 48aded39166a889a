//! SQLite-backed turn store.
//!
//! One row per conversation turn, keyed by `(session_id, timestamp)`.
//! Turns are append-only and carry an expiry; expired rows are simply
//! filtered out of reads (passive deletion). A session has no record of
//! its own — it exists only as the set of its unexpired turns.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

/// Turn retention: 7 days, in milliseconds.
const TURN_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// One user-input/assistant-response pair. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub session_id: String,
    /// Wall-clock milliseconds; unique and strictly increasing within a session.
    pub timestamp: i64,
    pub user_input: String,
    pub ai_response: String,
    /// Wall-clock milliseconds after which the turn is considered gone.
    pub expires_at: i64,
}

// ---------------------------------------------------------------------------
// TurnStore
// ---------------------------------------------------------------------------

/// Thread-safe SQLite turn store.
///
/// Uses a sync `Mutex<Connection>` because rusqlite's `Connection` is `!Send`.
/// All public methods are synchronous — individual statements are cheap enough
/// to run inline from async callers.
pub struct TurnStore {
    conn: Mutex<Connection>,
}

impl TurnStore {
    /// Open (or create) the database at `db_path` and run migrations.
    pub fn new(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;

        // Performance pragmas.
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run schema migrations (idempotent).
    fn migrate(conn: &Connection) -> anyhow::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS turns (
                 session_id TEXT NOT NULL,
                 timestamp INTEGER NOT NULL,
                 user_input TEXT NOT NULL,
                 ai_response TEXT NOT NULL,
                 expires_at INTEGER NOT NULL,
                 PRIMARY KEY (session_id, timestamp)
             );

             CREATE INDEX IF NOT EXISTS idx_turns_expiry ON turns(expires_at);",
        )?;
        Ok(())
    }

    /// Append a turn to a session.
    ///
    /// Assigns the current millisecond timestamp, bumped past the session's
    /// latest row when the wall clock hasn't advanced, so timestamps within a
    /// session stay unique and increasing in write order. Write failures
    /// propagate — a turn that silently vanished would corrupt later context.
    pub fn append(
        &self,
        session_id: &str,
        user_input: &str,
        ai_response: &str,
    ) -> anyhow::Result<Turn> {
        let conn = self.conn.lock().unwrap();

        let now = Utc::now().timestamp_millis();
        let last: Option<i64> = conn
            .query_row(
                "SELECT MAX(timestamp) FROM turns WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        let timestamp = match last {
            Some(last) if now <= last => last + 1,
            _ => now,
        };

        let turn = Turn {
            session_id: session_id.to_string(),
            timestamp,
            user_input: user_input.to_string(),
            ai_response: ai_response.to_string(),
            expires_at: now + TURN_TTL_MS,
        };

        conn.execute(
            "INSERT INTO turns (session_id, timestamp, user_input, ai_response, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                turn.session_id,
                turn.timestamp,
                turn.user_input,
                turn.ai_response,
                turn.expires_at,
            ],
        )?;

        Ok(turn)
    }

    /// Get the most recent unexpired turns for a session, most-recent-first.
    ///
    /// Lookup failures degrade to an empty history — the pipeline must still
    /// produce a response even with no memory.
    pub fn recent(&self, session_id: &str, limit: usize) -> Vec<Turn> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().timestamp_millis();

        let mut stmt = match conn.prepare(
            "SELECT session_id, timestamp, user_input, ai_response, expires_at
             FROM turns
             WHERE session_id = ?1 AND expires_at > ?2
             ORDER BY timestamp DESC LIMIT ?3",
        ) {
            Ok(s) => s,
            Err(e) => {
                warn!("Turn lookup failed for session {}: {}", session_id, e);
                return Vec::new();
            }
        };

        stmt.query_map(params![session_id, now, limit as i64], |row| {
            Ok(Turn {
                session_id: row.get(0)?,
                timestamp: row.get(1)?,
                user_input: row.get(2)?,
                ai_response: row.get(3)?,
                expires_at: row.get(4)?,
            })
        })
        .map(|rows| rows.filter_map(|r| r.ok()).collect())
        .unwrap_or_else(|e| {
            warn!("Turn lookup failed for session {}: {}", session_id, e);
            Vec::new()
        })
    }
}
