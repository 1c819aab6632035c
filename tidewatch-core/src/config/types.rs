//! Configuration type definitions

use heapless::String;
use tidewatch_protocol::DeviceSerial;

use crate::timer::{BACKOFF_INITIAL_MS, BACKOFF_MAX_MS};

/// Maximum server host length
pub const MAX_HOST_LEN: usize = 64;

pub const DEFAULT_SERVER_HOST: &str = "47.104.5.75";
pub const DEFAULT_SERVER_PORT: u16 = 9909;

/// Session timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingConfig {
    /// Reply timeout for plain AT commands
    pub at_timeout_ms: u32,
    /// Network registration query timeout
    pub registration_timeout_ms: u32,
    /// Channel open timeout
    pub open_timeout_ms: u32,
    /// How long to wait for `+MATREADY` before probing anyway
    pub ready_timeout_ms: u32,
    /// Channel state poll interval while monitoring
    pub status_poll_ms: u32,
    /// Heartbeat interval while connected
    pub heartbeat_ms: u32,
    /// Time sync request interval while connected
    pub time_sync_ms: u32,
    pub backoff_initial_ms: u32,
    pub backoff_max_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            at_timeout_ms: 3_000,
            registration_timeout_ms: 8_000,
            open_timeout_ms: 15_000,
            ready_timeout_ms: 5_000,
            status_poll_ms: 10_000,
            heartbeat_ms: 30_000,
            time_sync_ms: 600_000,
            backoff_initial_ms: BACKOFF_INITIAL_MS,
            backoff_max_ms: BACKOFF_MAX_MS,
        }
    }
}

/// Complete link configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    /// Platform server address (IP or host name)
    pub server_host: String<MAX_HOST_LEN>,
    pub server_port: u16,
    /// Serial carried in every packet header
    pub serial: DeviceSerial,
    pub timing: TimingConfig,
    /// Wait for the modem's ready notification before the first probe
    pub wait_for_ready: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        let mut server_host = String::new();
        // Fits: the default is well below MAX_HOST_LEN
        let _ = server_host.push_str(DEFAULT_SERVER_HOST);

        Self {
            server_host,
            server_port: DEFAULT_SERVER_PORT,
            serial: DeviceSerial::default(),
            timing: TimingConfig::default(),
            wait_for_ready: false,
        }
    }
}
