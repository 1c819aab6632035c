//! Uptime-anchored wall clock
//!
//! There is no RTC crystal on the board. The platform time from the last
//! sync is stored together with the uptime at which it arrived; "now" is
//! that epoch plus the uptime elapsed since.

use tidewatch_protocol::PlatformTime;

use crate::traits::RtcClock;

const SECS_PER_DAY: u32 = 86_400;

/// Days since 1970-01-01 for a proleptic Gregorian date
fn days_from_civil(year: i32, month: u32, day: u32) -> i32 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y.rem_euclid(400) as u32;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe as i32 - 719_468
}

/// Proleptic Gregorian date for days since 1970-01-01
fn civil_from_days(days: i32) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe as i32 + era * 400 + i32::from(month <= 2);
    (year, month, day)
}

/// Unix seconds for a validated platform time
pub fn unix_from_civil(time: &PlatformTime) -> u32 {
    let days = days_from_civil(
        i32::from(time.year),
        u32::from(time.month),
        u32::from(time.day),
    );
    let secs_of_day =
        u32::from(time.hour) * 3600 + u32::from(time.minute) * 60 + u32::from(time.second);
    (days.max(0) as u32)
        .wrapping_mul(SECS_PER_DAY)
        .wrapping_add(secs_of_day)
}

/// Calendar fields for Unix seconds
pub fn civil_from_unix(secs: u32) -> PlatformTime {
    let (year, month, day) = civil_from_days((secs / SECS_PER_DAY) as i32);
    let rem = secs % SECS_PER_DAY;
    PlatformTime {
        year: year as u16,
        month: month as u8,
        day: day as u8,
        hour: (rem / 3600) as u8,
        minute: (rem / 60 % 60) as u8,
        second: (rem % 60) as u8,
    }
}

/// Clock set by platform time sync
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SoftRtc {
    base_epoch: u32,
    base_uptime_ms: u32,
    valid: bool,
}

impl SoftRtc {
    pub const fn new() -> Self {
        Self {
            base_epoch: 0,
            base_uptime_ms: 0,
            valid: false,
        }
    }

    /// Calendar time at the given uptime
    pub fn now_fields(&self, uptime_ms: u32) -> Option<PlatformTime> {
        self.now(uptime_ms).map(civil_from_unix)
    }
}

impl RtcClock for SoftRtc {
    fn on_time_sync(&mut self, time: &PlatformTime, received_at_ms: u32) {
        self.base_epoch = unix_from_civil(time);
        self.base_uptime_ms = received_at_ms;
        self.valid = true;
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn now(&self, uptime_ms: u32) -> Option<u32> {
        if !self.valid {
            return None;
        }
        let elapsed_ms = uptime_ms.wrapping_sub(self.base_uptime_ms);
        Some(self.base_epoch.wrapping_add(elapsed_ms / 1000))
    }
}
