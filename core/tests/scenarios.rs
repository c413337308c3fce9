//! End-to-end checkpoint scenarios: fresh install, resume, restart.
//!
//! Each test drives a Session over a real SQLite store so the
//! transition engine and the persistence bridge are exercised together.

use idlescore_core::{
    error::{ScoreError, ScoreResult},
    event::{EventLogEntry, SessionEvent},
    session::Session,
    state::{reward_pending, Checkpoint},
    store::{EventJournal, KeyValueStore, ScoreStore},
};

fn store_with(pairs: &[(&str, &str)]) -> ScoreStore {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = ScoreStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    let entries: Vec<(&str, String)> = pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
    store.kv_put_all(&entries).expect("seed checkpoint");
    store
}

fn stored(session: &Session<ScoreStore>, key: &str) -> Option<String> {
    session
        .store()
        .expect("no writer running")
        .kv_get(key)
        .expect("read key")
}

#[test]
fn fresh_install_grants_no_reward() {
    let mut session = Session::restore(store_with(&[]), false);
    assert_eq!(session.checkpoint(), Checkpoint::new(0, 0));

    let now = 1_700_000_000_000;
    let state = session.apply(&SessionEvent::Reconcile { now_ms: now }).clone();

    assert_eq!(state.score, 0);
    assert_eq!(state.idle_points, 0);
    assert!(!reward_pending(&state), "fresh install must not raise the reward dialog");
    assert_eq!(
        stored(&session, "updateTimeMs").as_deref(),
        Some("1700000000000"),
        "cold start must still checkpoint the new timestamp"
    );
}

#[test]
fn resume_offers_and_awards_idle_points() {
    let store = store_with(&[("score", "10"), ("updateTimeMs", "1000")]);
    let mut session = Session::restore(store, false);

    let state = session.apply(&SessionEvent::Reconcile { now_ms: 6_500 }).clone();
    assert_eq!(state.idle_time_ms, 5_500);
    assert_eq!(state.idle_points, 5);
    assert!(reward_pending(&state));

    session.apply(&SessionEvent::OpenReward);
    session.apply(&SessionEvent::ClaimReward { now_ms: 6_500 });
    let state = session.apply(&SessionEvent::CloseReward).clone();

    assert_eq!(state.score, 15);
    assert_eq!(state.idle_points, 0);
    assert!(!state.is_reward_open);
    assert_eq!(stored(&session, "score").as_deref(), Some("15"));
    assert_eq!(stored(&session, "updateTimeMs").as_deref(), Some("6500"));
}

#[test]
fn long_absence_reconciles_to_whole_seconds() {
    let t: i64 = 1_700_000_000_000;
    let store = store_with(&[("score", "50"), ("updateTimeMs", &t.to_string())]);
    let mut session = Session::restore(store, false);

    let state = session.apply(&SessionEvent::Reconcile { now_ms: t + 125_000 });
    assert_eq!(state.idle_time_ms, 125_000);
    assert_eq!(state.idle_points, 125);
}

#[test]
fn live_ticks_are_checkpointed_each_time() {
    let mut session = Session::restore(store_with(&[("score", "1")]), false);
    session.apply(&SessionEvent::Reconcile { now_ms: 0 });

    for i in 1..=10 {
        session.apply(&SessionEvent::Tick { now_ms: i * 1000 });
        assert_eq!(
            stored(&session, "score"),
            Some((1 + i).to_string()),
            "checkpoint lagged after tick {i}"
        );
    }
    assert_eq!(session.state().score, 11);
}

#[test]
fn unclaimed_points_are_not_persisted_as_score() {
    let store = store_with(&[("score", "10"), ("updateTimeMs", "0")]);
    let mut session = Session::restore(store, false);
    session.apply(&SessionEvent::Reconcile { now_ms: 60_000 });
    session.apply(&SessionEvent::OpenReward);
    session.apply(&SessionEvent::CloseReward);

    assert_eq!(session.state().idle_points, 60);
    assert_eq!(stored(&session, "score").as_deref(), Some("10"));
}

#[test]
fn malformed_checkpoint_starts_from_zero() {
    let store = store_with(&[("score", "abc"), ("updateTimeMs", "")]);
    let session = Session::restore(store, false);
    assert_eq!(session.checkpoint(), Checkpoint::new(0, 0));
}

#[test]
fn progress_survives_restart_on_disk() {
    let path = std::env::temp_dir().join(format!("idlescore-restart-{}.db", uuid::Uuid::new_v4()));
    let path = path.to_str().expect("utf-8 temp path").to_string();

    let first = ScoreStore::open(&path).expect("open");
    first.migrate().expect("migrate");
    let mut session = Session::restore(first, true);
    session.apply(&SessionEvent::Reconcile { now_ms: 1_000 });
    session.apply(&SessionEvent::ManualIncrement);
    session.apply(&SessionEvent::ManualIncrement);
    session.apply(&SessionEvent::Tick { now_ms: 4_000 });
    let final_checkpoint = session.checkpoint();
    assert_eq!(final_checkpoint, Checkpoint::new(5, 4_000));

    let second = session
        .store()
        .expect("no writer running")
        .reopen()
        .expect("reopen");
    drop(session);
    let mut resumed = Session::restore(second, true);
    assert_eq!(resumed.checkpoint(), final_checkpoint);

    let state = resumed.apply(&SessionEvent::Reconcile { now_ms: 34_000 });
    assert_eq!(state.idle_points, 30);

    let _ = std::fs::remove_file(&path);
}

/// A store whose every operation fails.
struct UnavailableStore;

impl KeyValueStore for UnavailableStore {
    fn get(&self, _key: &str) -> ScoreResult<Option<String>> {
        Err(ScoreError::Other(anyhow::anyhow!("storage unavailable")))
    }
    fn put_all(&self, _entries: &[(&str, String)]) -> ScoreResult<()> {
        Err(ScoreError::Other(anyhow::anyhow!("storage unavailable")))
    }
}

impl EventJournal for UnavailableStore {
    fn begin_session(&self, _session_id: &str, _start: &Checkpoint) -> ScoreResult<()> {
        Err(ScoreError::Other(anyhow::anyhow!("storage unavailable")))
    }
    fn record(&self, _entry: &EventLogEntry) -> ScoreResult<()> {
        Err(ScoreError::Other(anyhow::anyhow!("storage unavailable")))
    }
}

#[test]
fn storage_failures_never_reach_the_engine() {
    let mut session = Session::restore(UnavailableStore, true);
    assert!(session.session_id().is_none(), "journal should be disabled");

    session.apply(&SessionEvent::Reconcile { now_ms: 10_000 });
    session.apply(&SessionEvent::ManualIncrement);
    let state = session.apply(&SessionEvent::Tick { now_ms: 13_000 });
    assert_eq!(state.score, 4);
}
