//! Trailing-edge debouncing.
//!
//! [`Debouncer`] holds at most one pending value. Scheduling a new value
//! replaces the old one and restarts the delay; only the last value of a
//! burst is ever delivered.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
struct Pending<T> {
    deadline: Instant,
    value: T,
}

/// A cancellable, restartable timer carrying one value.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `value`, replacing anything pending.
    pub fn schedule(&mut self, value: T) {
        self.schedule_at(Instant::now(), value);
    }

    pub fn schedule_at(&mut self, now: Instant, value: T) {
        self.pending = Some(Pending {
            deadline: now + self.delay,
            value,
        });
    }

    /// Drop the pending value, returning it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Take the pending value if its deadline has passed.
    pub fn poll_at(&mut self, now: Instant) -> Option<T> {
        let due = self.pending.as_ref().is_some_and(|p| p.deadline <= now);
        if due {
            self.pending.take().map(|p| p.value)
        } else {
            None
        }
    }

    pub fn poll(&mut self) -> Option<T> {
        self.poll_at(Instant::now())
    }

    /// Wait for the pending value's deadline and take it.
    ///
    /// Returns `None` immediately when nothing is pending.
    pub async fn fired(&mut self) -> Option<T> {
        let deadline = self.deadline()?;
        tokio::time::sleep_until(deadline).await;
        self.pending.take().map(|p| p.value)
    }
}
