//! Single-slot deferred action

use super::backoff::Backoff;
use super::deadline::reached;

/// An action waiting for its earliest start time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingRetry<A> {
    pub action: A,
    pub not_before: u32,
}

/// Holds at most one pending action plus the backoff that spaces retries
///
/// Scheduling overwrites whatever was pending.
#[derive(Debug, Clone)]
pub struct RetryScheduler<A> {
    pending: Option<PendingRetry<A>>,
    backoff: Backoff,
}

impl<A: Copy> Default for RetryScheduler<A> {
    fn default() -> Self {
        Self::new(Backoff::default())
    }
}

impl<A: Copy> RetryScheduler<A> {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            pending: None,
            backoff,
        }
    }

    /// Run `action` no earlier than `now + delay_ms`
    pub fn schedule(&mut self, action: A, delay_ms: u32, now: u32) {
        self.pending = Some(PendingRetry {
            action,
            not_before: now.wrapping_add(delay_ms),
        });
    }

    /// Grow the backoff, then schedule `action` after the new delay
    pub fn schedule_with_backoff(&mut self, action: A, now: u32) {
        let delay = self.backoff.grow();
        self.schedule(action, delay, now);
    }

    /// Take the pending action if it is due
    pub fn tick(&mut self, now: u32) -> Option<A> {
        match self.pending {
            Some(p) if reached(now, p.not_before) => {
                self.pending = None;
                Some(p.action)
            }
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn pending(&self) -> Option<PendingRetry<A>> {
        self.pending
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn grow_backoff(&mut self) -> u32 {
        self.backoff.grow()
    }

    pub fn reset_backoff(&mut self) {
        self.backoff.reset();
    }

    pub fn backoff_ms(&self) -> u32 {
        self.backoff.current_ms()
    }
}
