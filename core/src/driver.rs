//! Session driver — the single event queue in front of the Session.
//!
//! RULES:
//!   - One consumer task owns the Session. Messages are applied strictly
//!     one at a time, in arrival order. No locks guard SessionState.
//!   - Activation applies exactly one Reconcile and starts the ticker.
//!     Activating an already active session is ignored.
//!   - Backgrounding stops the ticker. Ticks that were already queued when
//!     the session went inactive are dropped.
//!   - Timestamps on intents are read from the driver's clock, never
//!     supplied by the presentation layer.
//!   - While running, checkpoint and journal writes go through the
//!     session's background writer. The loop never blocks on SQLite.

use crate::{
    clock::Clock,
    config::TrackerConfig,
    error::{ScoreError, ScoreResult},
    event::SessionEvent,
    session::Session,
    state::SessionState,
    store::{EventJournal, KeyValueStore},
    ticker::Ticker,
};
use tokio::sync::{mpsc, oneshot, watch};

/// User intents forwarded by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Increment,
    OpenReward,
    ClaimReward,
    CloseReward,
}

pub enum DriverMsg {
    Activate { reply: oneshot::Sender<SessionState> },
    Background { reply: oneshot::Sender<SessionState> },
    Intent { intent: Intent, reply: oneshot::Sender<SessionState> },
    /// An already-built event, applied verbatim.
    Event { event: SessionEvent, reply: oneshot::Sender<SessionState> },
    TickDue,
    Shutdown,
}

pub struct SessionDriver<S, C> {
    session:  Session<S>,
    clock:    C,
    ticker:   Ticker,
    active:   bool,
    rx:       mpsc::Receiver<DriverMsg>,
    self_tx:  mpsc::WeakSender<DriverMsg>,
    state_tx: watch::Sender<SessionState>,
}

/// Cloneable front door to a running driver.
#[derive(Clone)]
pub struct DriverHandle {
    tx:       mpsc::Sender<DriverMsg>,
    state_rx: watch::Receiver<SessionState>,
}

impl<S, C> SessionDriver<S, C>
where
    S: KeyValueStore + EventJournal + Send + 'static,
    C: Clock,
{
    pub fn new(session: Session<S>, clock: C, config: &TrackerConfig) -> (Self, DriverHandle) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(session.state().clone());
        let driver = Self {
            session,
            clock,
            ticker: Ticker::new(config.tick_interval_ms),
            active: false,
            rx,
            self_tx: tx.downgrade(),
            state_tx,
        };
        (driver, DriverHandle { tx, state_rx })
    }

    /// Consume messages until Shutdown or until every handle is dropped.
    /// Returns the Session so callers can inspect the final state.
    pub async fn run(mut self) -> Session<S> {
        self.session.start_writer();
        while let Some(msg) = self.rx.recv().await {
            match msg {
                DriverMsg::Activate { reply } => {
                    self.activate();
                    let _ = reply.send(self.session.state().clone());
                }
                DriverMsg::Background { reply } => {
                    self.background();
                    let _ = reply.send(self.session.state().clone());
                }
                DriverMsg::Intent { intent, reply } => {
                    let event = self.event_for(intent);
                    self.apply(&event);
                    let _ = reply.send(self.session.state().clone());
                }
                DriverMsg::Event { event, reply } => {
                    self.apply(&event);
                    let _ = reply.send(self.session.state().clone());
                }
                DriverMsg::TickDue => {
                    if self.active {
                        let now_ms = self.clock.now_ms();
                        self.apply(&SessionEvent::Tick { now_ms });
                    } else {
                        log::debug!("Dropping tick queued before backgrounding");
                    }
                }
                DriverMsg::Shutdown => break,
            }
        }
        self.ticker.stop();
        self.active = false;
        self.session.stop_writer().await;
        log::info!("Driver stopped at score={}", self.session.state().score);
        self.session
    }

    fn activate(&mut self) {
        if self.active {
            log::debug!("Activate ignored: session already active");
            return;
        }
        let now_ms = self.clock.now_ms();
        self.apply(&SessionEvent::Reconcile { now_ms });
        self.active = true;
        self.ticker.start(self.self_tx.clone());

        let state = self.session.state();
        if state.idle_points > 0 {
            log::info!(
                "Resumed after {} ms idle: {} idle points pending",
                state.idle_time_ms,
                state.idle_points
            );
        }
    }

    fn background(&mut self) {
        if !self.active {
            return;
        }
        self.ticker.stop();
        self.active = false;
        log::info!("Session backgrounded at score={}", self.session.state().score);
    }

    fn event_for(&self, intent: Intent) -> SessionEvent {
        match intent {
            Intent::Increment   => SessionEvent::ManualIncrement,
            Intent::OpenReward  => SessionEvent::OpenReward,
            Intent::ClaimReward => SessionEvent::ClaimReward { now_ms: self.clock.now_ms() },
            Intent::CloseReward => SessionEvent::CloseReward,
        }
    }

    fn apply(&mut self, event: &SessionEvent) {
        let state = self.session.apply(event).clone();
        if let SessionEvent::ClaimReward { .. } = event {
            log::info!("Idle reward claimed, score now {}", state.score);
        }
        self.state_tx.send_replace(state);
    }
}

impl DriverHandle {
    /// Bring the session to the foreground: Reconcile, then live ticking.
    pub async fn activate(&self) -> ScoreResult<SessionState> {
        self.request(|reply| DriverMsg::Activate { reply }).await
    }

    pub async fn background(&self) -> ScoreResult<SessionState> {
        self.request(|reply| DriverMsg::Background { reply }).await
    }

    pub async fn intent(&self, intent: Intent) -> ScoreResult<SessionState> {
        self.request(|reply| DriverMsg::Intent { intent, reply }).await
    }

    pub async fn dispatch(&self, event: SessionEvent) -> ScoreResult<SessionState> {
        self.request(|reply| DriverMsg::Event { event, reply }).await
    }

    pub async fn shutdown(&self) -> ScoreResult<()> {
        self.tx
            .send(DriverMsg::Shutdown)
            .await
            .map_err(|_| ScoreError::DriverClosed)
    }

    /// Latest published state.
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    /// Receiver that wakes on every applied event.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    async fn request(
        &self,
        build: impl FnOnce(oneshot::Sender<SessionState>) -> DriverMsg,
    ) -> ScoreResult<SessionState> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| ScoreError::DriverClosed)?;
        response.await.map_err(|_| ScoreError::DriverClosed)
    }
}
