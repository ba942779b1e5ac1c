//! Time-delayed value propagation.

use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle, time::Instant};
use tracing::debug;

/// A value that only settles once its input has been quiet for `delay`.
///
/// Every [`set`](Self::set) with a new value restarts the window, so in a
/// burst of updates only the last one is ever published. Repeating the pending
/// value keeps the current deadline, and going back to the settled value drops
/// the pending update. The pending timer is a task owned by this value;
/// dropping it aborts the timer without firing.
///
/// # Panics
///
/// [`set`](Self::set) and [`set_delay`](Self::set_delay) spawn the timer task
/// and panic when called outside a tokio runtime.
pub struct Debounced<T: Clone + PartialEq + Send + Sync + 'static> {
    delay: Duration,
    settled: Arc<watch::Sender<T>>,
    pending: Option<PendingUpdate<T>>,
}

struct PendingUpdate<T> {
    value: T,
    timer: JoinHandle<()>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Debounced<T> {
    /// The initial value is settled immediately.
    pub fn new(initial: T, delay: Duration) -> Self {
        let (settled, _) = watch::channel(initial);
        Self {
            delay,
            settled: Arc::new(settled),
            pending: None,
        }
    }

    pub fn get(&self) -> T {
        self.settled.borrow().clone()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Receiver that observes every settled value.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.settled.subscribe()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.timer.is_finished())
    }

    pub fn set(&mut self, value: T) {
        if *self.settled.borrow() == value {
            // Nothing left to publish.
            self.cancel();
            return;
        }
        if self.is_pending() && self.pending.as_ref().is_some_and(|p| p.value == value) {
            return;
        }
        self.schedule(value);
    }

    /// Changes the delay. An in-flight update is rescheduled to fire `delay`
    /// from now; it is not shortened retroactively.
    pub fn set_delay(&mut self, delay: Duration) {
        if delay == self.delay {
            return;
        }
        self.delay = delay;
        if self.is_pending() {
            if let Some(pending) = self.pending.take() {
                pending.timer.abort();
                self.schedule(pending.value);
            }
        }
    }

    /// Drops the pending update, if any, without publishing it.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.timer.abort();
        }
    }

    fn schedule(&mut self, value: T) {
        self.cancel();

        let settled = Arc::clone(&self.settled);
        let delay = self.delay;
        // Measured from the update, not from when the timer task first runs.
        let deadline = Instant::now() + delay;
        let staged = value.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            debug!("debounce: settled after delay_ms={}", delay.as_millis());
            settled.send_replace(staged);
        });

        self.pending = Some(PendingUpdate { value, timer });
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Drop for Debounced<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[path = "tests/debounce_tests.rs"]
mod tests;
