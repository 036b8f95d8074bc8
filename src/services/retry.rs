//! Fixed-cadence retry timer.
//!
//! One repeating timer at most. `arm` is clear-then-set, so repeated
//! disconnects never stack timers; `cancel` is a no-op when nothing is armed.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::events::ManagerEvent;

pub struct RetryTimer {
    period: Duration,
    events: mpsc::UnboundedSender<ManagerEvent>,
    handle: Option<JoinHandle<()>>,
    armed_total: u64,
}

impl RetryTimer {
    pub fn new(period: Duration, events: mpsc::UnboundedSender<ManagerEvent>) -> Self {
        Self {
            period,
            events,
            handle: None,
            armed_total: 0,
        }
    }

    /// (Re)start the repeating timer. First tick fires one period from now.
    pub fn arm(&mut self) {
        self.cancel();

        let period = self.period;
        let first_tick = Instant::now() + period;
        let events = self.events.clone();
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events.send(ManagerEvent::RetryTick).is_err() {
                    break;
                }
            }
        }));
        self.armed_total += 1;
        debug!("⏱ Retry timer armed ({:?})", period);
    }

    /// Returns true if a timer was actually running.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                debug!("⏱ Retry timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Timers currently scheduled; never more than one.
    pub fn active_timers(&self) -> usize {
        usize::from(self.handle.is_some())
    }

    /// How many times the timer has been (re)armed since creation
    pub fn armed_total(&self) -> u64 {
        self.armed_total
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for RetryTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
