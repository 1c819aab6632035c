//! Wall clock collaborator

use tidewatch_protocol::PlatformTime;

/// Clock that is set from platform time-sync responses
pub trait RtcClock {
    /// Accept a validated platform time received at `received_at_ms` uptime
    fn on_time_sync(&mut self, time: &PlatformTime, received_at_ms: u32);

    /// Whether at least one sync has been received
    fn is_valid(&self) -> bool;

    /// Unix seconds at the given uptime, or `None` before the first sync
    fn now(&self, uptime_ms: u32) -> Option<u32>;
}
