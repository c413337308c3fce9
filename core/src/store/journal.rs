use super::ScoreStore;
use crate::{
    error::ScoreResult,
    event::EventLogEntry,
    persistence::decode_score,
    state::Checkpoint,
};
use rusqlite::{params, types::Value, OptionalExtension};

impl ScoreStore {
    // ── Session ───────────────────────────────────────────────────

    /// `start_score` is stored as decimal text so the full `u64` range fits.
    pub fn insert_session(
        &self,
        session_id: &str,
        start: &Checkpoint,
        version: &str,
    ) -> ScoreResult<()> {
        self.conn.execute(
            "INSERT INTO session (session_id, start_score, start_update_time, version)
             VALUES (?1, ?2, ?3, ?4)",
            params![session_id, start.score.to_string(), start.update_time_ms, version],
        )?;
        Ok(())
    }

    /// The checkpoint a session started from, if it was recorded.
    pub fn session_start(&self, session_id: &str) -> ScoreResult<Option<Checkpoint>> {
        let start = self
            .conn
            .query_row(
                "SELECT start_score, start_update_time FROM session WHERE session_id = ?1",
                params![session_id],
                |row| {
                    // Databases created before the TEXT column hold integers.
                    let score = match row.get::<_, Value>(0)? {
                        Value::Text(raw) => decode_score(&raw),
                        Value::Integer(v) => v.max(0) as u64,
                        _ => 0,
                    };
                    Ok(Checkpoint::new(score, row.get::<_, i64>(1)?))
                },
            )
            .optional()?;
        Ok(start)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> ScoreResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (session_id, seq, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.session_id,
                entry.seq as i64,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_session(&self, session_id: &str) -> ScoreResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, seq, event_type, payload
             FROM event_log WHERE session_id = ?1
             ORDER BY seq ASC",
        )?;
        let entries = stmt
            .query_map(params![session_id], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    session_id: row.get(1)?,
                    seq: row.get::<_, i64>(2)? as u64,
                    event_type: row.get(3)?,
                    payload: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
