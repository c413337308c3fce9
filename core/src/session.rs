//! Session — sole owner of the live SessionState.
//!
//! EXECUTION ORDER per event (fixed):
//!   1. transition()          — pure, computes the next state
//!   2. checkpoint save       — only if score or updateTimeMs changed
//!   3. journal append        — only if journaling is enabled
//!
//! Steps 2 and 3 run inline until `start_writer` moves the store onto a
//! background writer thread; from then on they only enqueue.
//! Persistence and journal failures are logged and never reach the caller.

use crate::{
    error::ScoreResult,
    event::{EventLogEntry, SessionEvent},
    persistence::PersistenceBridge,
    state::{Checkpoint, SessionState},
    store::{EventJournal, KeyValueStore, ScoreStore},
    transition::transition,
    types::SessionId,
    writer::PersistenceWriter,
};

struct JournalCursor {
    session_id: SessionId,
    next_seq:   u64,
}

/// Where post-transition writes go.
enum Sink<S> {
    Inline(PersistenceBridge<S>),
    Writer(PersistenceWriter<S>),
    /// The writer thread died; nothing is persisted any more.
    Lost,
}

pub struct Session<S> {
    sink:    Sink<S>,
    state:   SessionState,
    journal: Option<JournalCursor>,
}

impl<S: KeyValueStore + EventJournal> Session<S> {
    /// Build the session from whatever checkpoint `store` holds.
    pub fn restore(store: S, journal_enabled: bool) -> Self {
        let bridge = PersistenceBridge::new(store);
        let state = bridge.restore();
        log::info!(
            "Session restored: score={} updateTimeMs={}",
            state.score,
            state.update_time_ms
        );

        let journal = if journal_enabled {
            let session_id = uuid::Uuid::new_v4().to_string();
            match bridge.store().begin_session(&session_id, &state.checkpoint()) {
                Ok(()) => Some(JournalCursor { session_id, next_seq: 0 }),
                Err(e) => {
                    log::warn!("Journal unavailable, continuing without it: {e}");
                    None
                }
            }
        } else {
            None
        };

        Self { sink: Sink::Inline(bridge), state, journal }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.state.checkpoint()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.journal.as_ref().map(|j| j.session_id.as_str())
    }

    /// The backing store, unless a writer thread currently owns it.
    pub fn store(&self) -> Option<&S> {
        match &self.sink {
            Sink::Inline(bridge) => Some(bridge.store()),
            _ => None,
        }
    }

    /// Apply one event and run the post-transition persistence steps.
    pub fn apply(&mut self, event: &SessionEvent) -> &SessionState {
        let next = transition(&self.state, event);
        log::debug!("{} -> {:?}", event.type_name(), next);

        if self.state.checkpoint_changed(&next) {
            match &self.sink {
                Sink::Inline(bridge) => bridge.save(&next.checkpoint()),
                Sink::Writer(writer) => writer.save(next.checkpoint()),
                Sink::Lost => {}
            }
        }
        self.state = next;
        self.journal_event(event);
        &self.state
    }

    fn journal_event(&mut self, event: &SessionEvent) {
        let Some(cursor) = self.journal.as_mut() else {
            return;
        };
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Could not encode {} for journal: {e}", event.type_name());
                return;
            }
        };
        let entry = EventLogEntry {
            id:         None,
            session_id: cursor.session_id.clone(),
            seq:        cursor.next_seq,
            event_type: event.type_name().to_string(),
            payload,
        };
        let recorded = match &self.sink {
            Sink::Inline(bridge) => match bridge.store().record(&entry) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Journal write failed, journaling disabled: {e}");
                    false
                }
            },
            Sink::Writer(writer) => {
                let sent = writer.record(entry);
                if !sent {
                    log::warn!("Checkpoint writer gone, journaling disabled");
                }
                sent
            }
            Sink::Lost => false,
        };
        if recorded {
            cursor.next_seq += 1;
        } else {
            // A gap would make the journal unreplayable, so stop writing.
            self.journal = None;
        }
    }
}

impl<S> Session<S>
where
    S: KeyValueStore + EventJournal + Send + 'static,
{
    /// Hand the store to a background writer thread. No-op if one runs.
    pub fn start_writer(&mut self) {
        match std::mem::replace(&mut self.sink, Sink::Lost) {
            Sink::Inline(bridge) => self.sink = Sink::Writer(PersistenceWriter::spawn(bridge)),
            other => self.sink = other,
        }
    }

    /// Drain pending writes and take the store back.
    pub async fn stop_writer(&mut self) {
        if let Sink::Writer(writer) = std::mem::replace(&mut self.sink, Sink::Lost) {
            match writer.finish().await {
                Some(bridge) => self.sink = Sink::Inline(bridge),
                None => log::warn!("Checkpoint writer died; pending writes lost"),
            }
        }
    }

    /// Wait for queued writes to reach the store.
    pub async fn flush(&self) {
        if let Sink::Writer(writer) = &self.sink {
            writer.flush().await;
        }
    }
}

/// Fold `transition` over a recorded event sequence.
pub fn replay<'a>(
    start: Checkpoint,
    events: impl IntoIterator<Item = &'a SessionEvent>,
) -> SessionState {
    events
        .into_iter()
        .fold(SessionState::from_checkpoint(start), |state, event| {
            transition(&state, event)
        })
}

/// Rebuild a past session's final state from its journal.
/// Returns `None` if the session was never recorded.
pub fn replay_journal(store: &ScoreStore, session_id: &str) -> ScoreResult<Option<SessionState>> {
    let Some(start) = store.session_start(session_id)? else {
        return Ok(None);
    };
    let events = store
        .events_for_session(session_id)?
        .iter()
        .map(EventLogEntry::decode)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(replay(start, &events)))
}
