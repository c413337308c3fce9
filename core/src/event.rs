//! Events consumed by the transition engine.
//!
//! RULE: State changes happen ONLY by applying an event.
//! Variants are added over time — never removed or reordered,
//! so journals written by older builds still decode.

use crate::types::{EpochMs, SessionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    // ── User intents ───────────────────────────────
    ManualIncrement,
    OpenReward,
    ClaimReward { now_ms: EpochMs },
    CloseReward,

    // ── Time ───────────────────────────────────────
    Tick { now_ms: EpochMs },
    Reconcile { now_ms: EpochMs },

    /// Any tag this build does not recognise. Applying it is a no-op.
    #[serde(other)]
    Unknown,
}

impl SessionEvent {
    /// Stable name used for the event_type column in event_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            SessionEvent::ManualIncrement   => "manual_increment",
            SessionEvent::OpenReward        => "open_reward",
            SessionEvent::ClaimReward { .. } => "claim_reward",
            SessionEvent::CloseReward       => "close_reward",
            SessionEvent::Tick { .. }       => "tick",
            SessionEvent::Reconcile { .. }  => "reconcile",
            SessionEvent::Unknown           => "unknown",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub session_id: SessionId,
    pub seq:        u64,
    pub event_type: String,
    pub payload:    String, // JSON-serialized SessionEvent
}

impl EventLogEntry {
    pub fn decode(&self) -> serde_json::Result<SessionEvent> {
        serde_json::from_str(&self.payload)
    }
}
