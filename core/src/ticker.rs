//! Live ticker — the periodic source of `TickDue` while the session is active.
//!
//! RULE: At most one ticker task exists per driver. `start` cancels the
//! previous task before spawning, and dropping the Ticker cancels it too.
//! A second concurrent ticker would deliver duplicate ticks.

use crate::driver::DriverMsg;
use tokio::{
    sync::mpsc::WeakSender,
    task::JoinHandle,
    time::{self, Duration, Instant, MissedTickBehavior},
};

pub struct Ticker {
    period: Duration,
    task:   Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period: Duration::from_millis(period_ms.max(1)),
            task:   None,
        }
    }

    /// Start ticking into `tx`. Any running ticker is cancelled first.
    /// The first tick arrives one full period after the call.
    pub fn start(&mut self, tx: WeakSender<DriverMsg>) {
        self.stop();

        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            // After a stall, resume the cadence instead of bursting catch-up ticks.
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(tx) = tx.upgrade() else {
                    log::debug!("Ticker stopping: driver gone");
                    break;
                };
                if tx.send(DriverMsg::TickDue).await.is_err() {
                    log::debug!("Ticker stopping: queue closed");
                    break;
                }
            }
        }));
        log::debug!("Ticker started ({} ms)", period.as_millis());
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            log::debug!("Ticker stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
