//! Wrap-safe deadlines

/// Whether `now` is at or past `at`
///
/// Valid as long as the two instants are less than ~24.8 days apart.
#[inline]
pub fn reached(now: u32, at: u32) -> bool {
    now.wrapping_sub(at) as i32 >= 0
}

/// An optional point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Deadline {
    at: Option<u32>,
}

impl Deadline {
    /// A deadline that never expires
    pub const fn disarmed() -> Self {
        Self { at: None }
    }

    /// A deadline `after_ms` from `now`
    pub fn after(now: u32, after_ms: u32) -> Self {
        Self {
            at: Some(now.wrapping_add(after_ms)),
        }
    }

    pub fn arm(&mut self, now: u32, after_ms: u32) {
        *self = Self::after(now, after_ms);
    }

    pub fn disarm(&mut self) {
        self.at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    /// Expiry instant, if armed
    pub fn at(&self) -> Option<u32> {
        self.at
    }

    /// Armed and reached
    pub fn expired(&self, now: u32) -> bool {
        self.at.is_some_and(|at| reached(now, at))
    }

    /// Disarm and return `true` if expired, so each expiry is seen once
    pub fn take_expired(&mut self, now: u32) -> bool {
        if self.expired(now) {
            self.at = None;
            true
        } else {
            false
        }
    }
}
