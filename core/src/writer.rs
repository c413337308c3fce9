//! Background persistence writer.
//!
//! RULES:
//!   - While a driver runs, one dedicated OS thread owns the store.
//!     The event loop only enqueues; it never waits on SQLite.
//!   - Checkpoints are latest-wins: a burst of saves queued behind a slow
//!     write collapses into a single write of the newest checkpoint.
//!   - Journal entries are written in order. After the first failed append
//!     the rest are skipped, so a replayable journal never has gaps.
//!   - `finish` drains everything queued and hands the bridge back.

use crate::{
    event::EventLogEntry,
    persistence::PersistenceBridge,
    state::Checkpoint,
    store::{EventJournal, KeyValueStore},
};
use tokio::sync::{mpsc, oneshot};

enum WriteOp {
    Checkpoint(Checkpoint),
    Event(EventLogEntry),
    Flush(oneshot::Sender<()>),
}

pub struct PersistenceWriter<S> {
    tx:   mpsc::UnboundedSender<WriteOp>,
    done: oneshot::Receiver<PersistenceBridge<S>>,
}

impl<S> PersistenceWriter<S>
where
    S: KeyValueStore + EventJournal + Send + 'static,
{
    /// Move `bridge` onto a writer thread.
    pub fn spawn(bridge: PersistenceBridge<S>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (done_tx, done) = oneshot::channel();
        std::thread::spawn(move || {
            let bridge = write_loop(bridge, rx);
            let _ = done_tx.send(bridge);
        });
        log::debug!("Checkpoint writer started");
        Self { tx, done }
    }
}

impl<S> PersistenceWriter<S> {
    /// Queue a checkpoint. Never waits.
    pub fn save(&self, checkpoint: Checkpoint) {
        if self.tx.send(WriteOp::Checkpoint(checkpoint)).is_err() {
            log::warn!("Checkpoint writer gone, save dropped");
        }
    }

    /// Queue a journal entry. False when the writer is gone.
    pub fn record(&self, entry: EventLogEntry) -> bool {
        self.tx.send(WriteOp::Event(entry)).is_ok()
    }

    /// Wait until everything queued so far has reached the store.
    pub async fn flush(&self) {
        let (reply, written) = oneshot::channel();
        if self.tx.send(WriteOp::Flush(reply)).is_ok() {
            let _ = written.await;
        }
    }

    /// Drain the queue, stop the thread and return the bridge.
    /// `None` only if the writer thread died.
    pub async fn finish(self) -> Option<PersistenceBridge<S>> {
        let Self { tx, done } = self;
        drop(tx);
        done.await.ok()
    }
}

fn write_loop<S: KeyValueStore + EventJournal>(
    bridge: PersistenceBridge<S>,
    mut rx: mpsc::UnboundedReceiver<WriteOp>,
) -> PersistenceBridge<S> {
    let mut journal_ok = true;

    while let Some(first) = rx.blocking_recv() {
        let mut latest = None;
        let mut flushed = Vec::new();
        let mut next = Some(first);

        while let Some(op) = next {
            match op {
                WriteOp::Checkpoint(checkpoint) => latest = Some(checkpoint),
                WriteOp::Event(entry) if journal_ok => {
                    if let Err(e) = bridge.store().record(&entry) {
                        log::warn!("Journal write failed, journaling disabled: {e}");
                        journal_ok = false;
                    }
                }
                WriteOp::Event(_) => {}
                WriteOp::Flush(reply) => flushed.push(reply),
            }
            next = rx.try_recv().ok();
        }

        if let Some(checkpoint) = latest {
            bridge.save(&checkpoint);
        }
        for reply in flushed {
            let _ = reply.send(());
        }
    }

    log::debug!("Checkpoint writer stopped");
    bridge
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{event::SessionEvent, store::ScoreStore};

    fn bridge() -> PersistenceBridge<ScoreStore> {
        let store = ScoreStore::in_memory().expect("in-memory store");
        store.migrate().expect("migration");
        PersistenceBridge::new(store)
    }

    fn entry(seq: u64, event: &SessionEvent) -> EventLogEntry {
        EventLogEntry {
            id:         None,
            session_id: "w-1".into(),
            seq,
            event_type: event.type_name().into(),
            payload:    serde_json::to_string(event).unwrap(),
        }
    }

    #[tokio::test]
    async fn newest_checkpoint_wins() {
        let writer = PersistenceWriter::spawn(bridge());
        for score in 1..=50 {
            writer.save(Checkpoint::new(score, score as i64 * 1000));
        }
        let bridge = writer.finish().await.expect("writer thread alive");
        assert_eq!(bridge.load(), Checkpoint::new(50, 50_000));
    }

    #[tokio::test]
    async fn flush_waits_for_queued_writes() {
        let writer = PersistenceWriter::spawn(bridge());
        writer.save(Checkpoint::new(7, 700));
        writer.flush().await;
        writer.save(Checkpoint::new(8, 800));

        let bridge = writer.finish().await.expect("writer thread alive");
        assert_eq!(bridge.load(), Checkpoint::new(8, 800));
    }

    #[tokio::test]
    async fn journal_entries_keep_their_order() {
        let writer = PersistenceWriter::spawn(bridge());
        let events = [
            SessionEvent::ManualIncrement,
            SessionEvent::OpenReward,
            SessionEvent::CloseReward,
        ];
        for (seq, event) in events.iter().enumerate() {
            assert!(writer.record(entry(seq as u64, event)));
        }

        let bridge = writer.finish().await.expect("writer thread alive");
        let types: Vec<_> = bridge
            .store()
            .events_for_session("w-1")
            .expect("events")
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(types, ["manual_increment", "open_reward", "close_reward"]);
    }
}
