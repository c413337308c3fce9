//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The persistence bridge and the session call store methods —
//! they never execute SQL directly.

use crate::{error::ScoreResult, event::EventLogEntry, state::Checkpoint};
use rusqlite::{params, Connection, OptionalExtension};

mod journal;

/// Durable string key-value storage for the checkpoint.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> ScoreResult<Option<String>>;

    /// Write every pair atomically: either all land or none do.
    fn put_all(&self, entries: &[(&str, String)]) -> ScoreResult<()>;
}

/// Append-only record of applied events, grouped by session.
pub trait EventJournal {
    fn begin_session(&self, session_id: &str, start: &Checkpoint) -> ScoreResult<()>;
    fn record(&self, entry: &EventLogEntry) -> ScoreResult<()>;
}

pub struct ScoreStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl ScoreStore {
    /// Open (or create) the tracker database at `path`.
    pub fn open(path: &str) -> ScoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ScoreResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases this returns a fresh, isolated database.
    pub fn reopen(&self) -> ScoreResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ScoreResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_checkpoint.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_event_log.sql"))?;
        Ok(())
    }

    // ── Key-value ──────────────────────────────────────────────

    pub fn kv_get(&self, key: &str) -> ScoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn kv_put_all(&self, entries: &[(&str, String)]) -> ScoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl KeyValueStore for ScoreStore {
    fn get(&self, key: &str) -> ScoreResult<Option<String>> {
        self.kv_get(key)
    }

    fn put_all(&self, entries: &[(&str, String)]) -> ScoreResult<()> {
        self.kv_put_all(entries)
    }
}

impl EventJournal for ScoreStore {
    fn begin_session(&self, session_id: &str, start: &Checkpoint) -> ScoreResult<()> {
        self.insert_session(session_id, start, env!("CARGO_PKG_VERSION"))
    }

    fn record(&self, entry: &EventLogEntry) -> ScoreResult<()> {
        self.append_event(entry)
    }
}
