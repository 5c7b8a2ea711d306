use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

/// Inactivity timer for one streaming round. Every received chunk re-arms
/// it; if the budget elapses with no chunk, [`StallWatchdog::expired`]
/// resolves. A zero budget disables the watchdog.
pub struct StallWatchdog {
    budget: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl StallWatchdog {
    pub fn new(budget: Duration) -> Self {
        let sleep = (!budget.is_zero()).then(|| Box::pin(tokio::time::sleep(budget)));
        Self { budget, sleep }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn is_enabled(&self) -> bool {
        self.sleep.is_some()
    }

    pub fn feed(&mut self) {
        if let Some(sleep) = self.sleep.as_mut() {
            sleep.as_mut().reset(Instant::now() + self.budget);
        }
    }

    /// Resolves once the budget has elapsed since the last feed. Never
    /// resolves when disabled. Safe to use as a `select!` branch in a loop.
    pub async fn expired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().await,
            None => std::future::pending().await,
        }
    }
}
