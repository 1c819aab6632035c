//! Exponential backoff

/// Starting delay
pub const BACKOFF_INITIAL_MS: u32 = 2_000;

/// Upper bound on the delay
pub const BACKOFF_MAX_MS: u32 = 30_000;

/// Doubling delay with an upper bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Backoff {
    current_ms: u32,
    initial_ms: u32,
    max_ms: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BACKOFF_INITIAL_MS, BACKOFF_MAX_MS)
    }
}

impl Backoff {
    pub fn new(initial_ms: u32, max_ms: u32) -> Self {
        let max_ms = max_ms.max(initial_ms);
        Self {
            current_ms: initial_ms,
            initial_ms,
            max_ms,
        }
    }

    /// Current delay
    pub fn current_ms(&self) -> u32 {
        self.current_ms
    }

    /// Double the delay (capped) and return the new value
    pub fn grow(&mut self) -> u32 {
        self.current_ms = self.current_ms.saturating_mul(2).min(self.max_ms);
        self.current_ms
    }

    /// Back to the initial delay
    pub fn reset(&mut self) {
        self.current_ms = self.initial_ms;
    }
}
