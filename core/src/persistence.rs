//! Persistence bridge — the checkpoint's only reader and writer.
//!
//! RULES:
//!   - Two keys, decimal-string values: `score` and `updateTimeMs`.
//!   - A missing or malformed value reads as 0. Nothing here is fatal.
//!   - `save` is fire-and-forget. A failed write is logged and dropped;
//!     the cost is at most one checkpoint interval of progress.

use crate::{
    state::{Checkpoint, SessionState},
    store::KeyValueStore,
    types::{EpochMs, Points},
};

/// Persisted key names. Compatible with previously saved progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointKey {
    Score,
    UpdateTimeMs,
}

impl CheckpointKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointKey::Score        => "score",
            CheckpointKey::UpdateTimeMs => "updateTimeMs",
        }
    }
}

pub struct PersistenceBridge<S> {
    store: S,
}

impl<S: KeyValueStore> PersistenceBridge<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the checkpoint. A fresh install yields `{0, 0}`.
    pub fn load(&self) -> Checkpoint {
        let score = self
            .raw(CheckpointKey::Score)
            .map_or(0, |raw| decode_score(&raw));
        let update_time_ms = self
            .raw(CheckpointKey::UpdateTimeMs)
            .map_or(0, |raw| decode_value(CheckpointKey::UpdateTimeMs, &raw));
        Checkpoint::new(score, update_time_ms)
    }

    /// Rebuild the startup session state from the stored checkpoint.
    pub fn restore(&self) -> SessionState {
        SessionState::from_checkpoint(self.load())
    }

    /// Write both keys together. Failures are swallowed.
    pub fn save(&self, checkpoint: &Checkpoint) {
        let entries = [
            (CheckpointKey::Score.as_str(), checkpoint.score.to_string()),
            (CheckpointKey::UpdateTimeMs.as_str(), checkpoint.update_time_ms.to_string()),
        ];
        match self.store.put_all(&entries) {
            Ok(()) => log::debug!(
                "Checkpoint saved: score={} updateTimeMs={}",
                checkpoint.score,
                checkpoint.update_time_ms
            ),
            Err(e) => log::warn!("Checkpoint save failed (ignored): {e}"),
        }
    }

    fn raw(&self, key: CheckpointKey) -> Option<String> {
        match self.store.get(key.as_str()) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Checkpoint read of '{}' failed, using 0: {e}", key.as_str());
                None
            }
        }
    }
}

/// Decode the stored score. The full `u64` range round-trips; anything
/// that is not a plain unsigned integer goes through `decode_value` and
/// is clamped at 0.
pub(crate) fn decode_score(raw: &str) -> Points {
    if let Ok(v) = raw.trim().parse::<u64>() {
        return v;
    }
    decode_value(CheckpointKey::Score, raw).max(0) as Points
}

/// Decode a stored decimal string.
///
/// Integers parse directly. A finite decimal such as `"12.7"` truncates
/// toward zero. Anything else, including the empty string, is 0.
fn decode_value(key: CheckpointKey, raw: &str) -> EpochMs {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0;
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return v;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => v.trunc() as i64,
        _ => {
            log::warn!("Malformed value for '{}': {raw:?}, using 0", key.as_str());
            0
        }
    }
}
