//! Session state and the durable checkpoint it is rebuilt from.
//!
//! RULE: SessionState is only ever replaced by the output of
//! `transition::transition`. Nothing mutates its fields in place.

use crate::types::{EpochMs, Points};
use serde::{Deserialize, Serialize};

/// The durable (score, timestamp) pair that survives process restarts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checkpoint {
    pub score:          Points,
    pub update_time_ms: EpochMs,
}

impl Checkpoint {
    pub fn new(score: Points, update_time_ms: EpochMs) -> Self {
        Self { score, update_time_ms }
    }

    /// True when nothing has ever been saved (or what was saved decoded to zero).
    pub fn is_zero(&self) -> bool {
        self.score == 0 && self.update_time_ms == 0
    }
}

/// In-memory state for one process run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionState {
    // persisted
    pub score:          Points,
    pub update_time_ms: EpochMs,

    // transient
    pub is_reward_open: bool,
    pub idle_time_ms:   u64,
    pub idle_points:    Points,
}

impl SessionState {
    /// Rebuild the startup state. Transient fields always start cleared.
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Self {
        Self {
            score:          checkpoint.score,
            update_time_ms: checkpoint.update_time_ms,
            is_reward_open: false,
            idle_time_ms:   0,
            idle_points:    0,
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(self.score, self.update_time_ms)
    }

    /// Whether moving from `self` to `next` touched a persisted field.
    pub fn checkpoint_changed(&self, next: &SessionState) -> bool {
        self.checkpoint() != next.checkpoint()
    }
}

/// Presentation rule for raising the reward dialog:
/// idle points are waiting and the dialog is not already showing.
pub fn reward_pending(state: &SessionState) -> bool {
    state.idle_points > 0 && !state.is_reward_open
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_checkpoint_clears_transient_fields() {
        let state = SessionState::from_checkpoint(Checkpoint::new(42, 9_000));
        assert_eq!(state.score, 42);
        assert_eq!(state.update_time_ms, 9_000);
        assert!(!state.is_reward_open);
        assert_eq!(state.idle_time_ms, 0);
        assert_eq!(state.idle_points, 0);
    }

    #[test]
    fn checkpoint_changed_ignores_transient_fields() {
        let before = SessionState::from_checkpoint(Checkpoint::new(3, 100));
        let mut after = before.clone();
        after.is_reward_open = true;
        after.idle_points = 7;
        assert!(!before.checkpoint_changed(&after));

        after.score = 4;
        assert!(before.checkpoint_changed(&after));
    }

    #[test]
    fn reward_pending_requires_points_and_closed_dialog() {
        let mut state = SessionState::default();
        assert!(!reward_pending(&state));

        state.idle_points = 5;
        assert!(reward_pending(&state));

        state.is_reward_open = true;
        assert!(!reward_pending(&state));
    }
}
