//! The transition engine — the heart of the tracker.
//!
//! RULES:
//!   - `transition` is pure: no I/O, no clock reads, no logging.
//!   - It is total: every event yields a state, nothing fails.
//!   - Elapsed time is quantized to whole seconds. Remainders are dropped,
//!     never carried to the next event.
//!   - `update_time_ms` never moves backward, even if `now_ms` does.

use crate::{
    event::SessionEvent,
    state::SessionState,
    types::{EpochMs, Points, MS_PER_POINT},
};

/// Whole points earned for `elapsed_ms`. Zero or negative elapsed earns nothing.
pub fn points_for_elapsed(elapsed_ms: i64) -> Points {
    if elapsed_ms <= 0 {
        return 0;
    }
    (elapsed_ms / MS_PER_POINT) as Points
}

/// Apply one event to `state`, returning the next state.
pub fn transition(state: &SessionState, event: &SessionEvent) -> SessionState {
    match *event {
        SessionEvent::ManualIncrement => SessionState {
            score: state.score.saturating_add(1),
            ..state.clone()
        },

        SessionEvent::Tick { now_ms } => {
            let elapsed = elapsed_since(state.update_time_ms, now_ms);
            SessionState {
                score: state.score.saturating_add(points_for_elapsed(elapsed)),
                update_time_ms: advance(state.update_time_ms, now_ms),
                ..state.clone()
            }
        }

        SessionEvent::Reconcile { now_ms } => {
            if state.score == 0 {
                // First-ever run: a zero score is the only cold-start signal,
                // so a resume at exactly zero earns no idle credit.
                return SessionState {
                    score: 0,
                    update_time_ms: advance(state.update_time_ms, now_ms),
                    idle_time_ms: 0,
                    idle_points: 0,
                    ..state.clone()
                };
            }

            let idle_time_ms = elapsed_since(state.update_time_ms, now_ms).max(0);
            SessionState {
                idle_time_ms: idle_time_ms as u64,
                idle_points: points_for_elapsed(idle_time_ms),
                update_time_ms: advance(state.update_time_ms, now_ms),
                ..state.clone()
            }
        }

        SessionEvent::OpenReward => SessionState {
            is_reward_open: true,
            ..state.clone()
        },

        SessionEvent::ClaimReward { now_ms } => SessionState {
            score: state.score.saturating_add(state.idle_points),
            idle_points: 0,
            update_time_ms: advance(state.update_time_ms, now_ms),
            ..state.clone()
        },

        SessionEvent::CloseReward => SessionState {
            is_reward_open: false,
            ..state.clone()
        },

        SessionEvent::Unknown => state.clone(),
    }
}

fn elapsed_since(since: EpochMs, now_ms: EpochMs) -> i64 {
    now_ms.saturating_sub(since)
}

fn advance(current: EpochMs, now_ms: EpochMs) -> EpochMs {
    current.max(now_ms)
}
