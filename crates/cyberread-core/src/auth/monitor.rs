//! Periodic background check tied to the lifetime of a handle.
//!
//! The session manager starts one of these whenever a session becomes
//! authenticated. Dropping the handle aborts the task, so timers never
//! outlive the session that started them.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// What the monitor should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stop,
}

#[derive(Debug)]
pub struct MonitorHandle {
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Run `tick` every `period`, starting one period from now. Returns
    /// `None` outside a tokio runtime.
    pub fn spawn<F>(period: Duration, mut tick: F) -> Option<Self>
    where
        F: FnMut() -> TickOutcome + Send + 'static,
    {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                debug!("No tokio runtime, activity monitor not started");
                return None;
            }
        };

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                trace!("Activity monitor tick");
                if tick() == TickOutcome::Stop {
                    debug!("Activity monitor stopping");
                    break;
                }
            }
        });

        Some(Self { task })
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn stop(self) {
        // Drop does the work
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
