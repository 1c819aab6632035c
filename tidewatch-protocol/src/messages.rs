//! Command codes and payload layouts
//!
//! Uplink reports are built here and wrapped into a [`Packet`]. Layouts are
//! fixed by the platform; note the event image length is little-endian.

use alloc::vec::Vec;

use crate::packet::{DeviceSerial, Packet, PacketError, OP_REPORT};
use crate::time::{PlatformTime, TIME_LEN};

// Command codes
pub const CMD_HEARTBEAT: u16 = 0x0000;
pub const CMD_TIME_SYNC: u16 = 0x0001;
pub const CMD_STARTUP_STATUS: u16 = 0x0002;
pub const CMD_REALTIME_DATA: u16 = 0x1D00;
pub const CMD_MONITOR_EVENT: u16 = 0x1D09;

/// Largest image carried in a monitor event
pub const MAX_IMAGE_LEN: usize = 65_000;

/// Size of the exception status block in realtime data
pub const EXCEPTION_STATUS_LEN: usize = 6;

/// Realtime data payload size
pub const REALTIME_DATA_LEN: usize = TIME_LEN + 1 + EXCEPTION_STATUS_LEN + 1;

/// Monitor event header size (everything before the image)
pub const MONITOR_EVENT_HEADER_LEN: usize = TIME_LEN + 1 + 4 + 4 + 4;

/// Startup status payload size
pub const STARTUP_STATUS_LEN: usize = TIME_LEN + 1;

/// Periodic water sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RealtimeMonitorData {
    pub time: PlatformTime,
    pub data_format: u8,
    pub exception_status: [u8; EXCEPTION_STATUS_LEN],
    pub water_status: u8,
}

impl RealtimeMonitorData {
    pub fn to_payload(&self) -> [u8; REALTIME_DATA_LEN] {
        let mut out = [0u8; REALTIME_DATA_LEN];
        out[..TIME_LEN].copy_from_slice(&self.time.to_bytes());
        out[TIME_LEN] = self.data_format;
        out[TIME_LEN + 1..TIME_LEN + 1 + EXCEPTION_STATUS_LEN]
            .copy_from_slice(&self.exception_status);
        out[REALTIME_DATA_LEN - 1] = self.water_status;
        out
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self, PacketError> {
        if payload.len() < REALTIME_DATA_LEN {
            return Err(PacketError::Truncated);
        }
        let time = PlatformTime::from_bytes(payload).map_err(|_| PacketError::Truncated)?;
        let mut exception_status = [0u8; EXCEPTION_STATUS_LEN];
        exception_status.copy_from_slice(&payload[TIME_LEN + 1..TIME_LEN + 1 + EXCEPTION_STATUS_LEN]);

        Ok(Self {
            time,
            data_format: payload[TIME_LEN],
            exception_status,
            water_status: payload[REALTIME_DATA_LEN - 1],
        })
    }

    pub fn to_packet(&self, serial: DeviceSerial) -> Result<Packet, PacketError> {
        Packet::new(serial, OP_REPORT, CMD_REALTIME_DATA, 0, &self.to_payload())
    }
}

/// Threshold event with an attached camera image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorEvent<'a> {
    pub time: PlatformTime,
    pub trigger: u8,
    pub realtime_value: f32,
    pub threshold_value: f32,
    pub image: &'a [u8],
}

impl<'a> MonitorEvent<'a> {
    /// Image bytes that fit in one event
    pub fn clamped_image(&self) -> &'a [u8] {
        &self.image[..self.image.len().min(MAX_IMAGE_LEN)]
    }

    /// Encode the payload, truncating the image to [`MAX_IMAGE_LEN`]
    pub fn to_payload(&self) -> Vec<u8> {
        let image = self.clamped_image();
        let mut out = Vec::with_capacity(MONITOR_EVENT_HEADER_LEN + image.len());

        out.extend_from_slice(&self.time.to_bytes());
        out.push(self.trigger);
        out.extend_from_slice(&self.realtime_value.to_le_bytes());
        out.extend_from_slice(&self.threshold_value.to_le_bytes());
        out.extend_from_slice(&(image.len() as u32).to_le_bytes());
        out.extend_from_slice(image);
        out
    }

    pub fn from_payload(payload: &'a [u8]) -> Result<Self, PacketError> {
        if payload.len() < MONITOR_EVENT_HEADER_LEN {
            return Err(PacketError::Truncated);
        }
        let time = PlatformTime::from_bytes(payload).map_err(|_| PacketError::Truncated)?;
        let le = |at: usize| [payload[at], payload[at + 1], payload[at + 2], payload[at + 3]];

        let image_len = u32::from_le_bytes(le(TIME_LEN + 9)) as usize;
        let image = payload
            .get(MONITOR_EVENT_HEADER_LEN..MONITOR_EVENT_HEADER_LEN.saturating_add(image_len))
            .ok_or(PacketError::Truncated)?;

        Ok(Self {
            time,
            trigger: payload[TIME_LEN],
            realtime_value: f32::from_le_bytes(le(TIME_LEN + 1)),
            threshold_value: f32::from_le_bytes(le(TIME_LEN + 5)),
            image,
        })
    }

    pub fn to_packet(&self, serial: DeviceSerial) -> Result<Packet, PacketError> {
        Packet::new(serial, OP_REPORT, CMD_MONITOR_EVENT, 0, &self.to_payload())
    }
}

/// Boot report sent once the channel first comes up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StartupStatus {
    pub time: PlatformTime,
    pub status: u8,
}

impl StartupStatus {
    /// Status byte the platform expects from a normal boot
    pub const DEFAULT_STATUS: u8 = 0x00;

    /// Boot report with the default status byte
    pub const fn new(time: PlatformTime) -> Self {
        Self {
            time,
            status: Self::DEFAULT_STATUS,
        }
    }

    pub fn to_payload(&self) -> [u8; STARTUP_STATUS_LEN] {
        let mut out = [0u8; STARTUP_STATUS_LEN];
        out[..TIME_LEN].copy_from_slice(&self.time.to_bytes());
        out[TIME_LEN] = self.status;
        out
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self, PacketError> {
        if payload.len() < STARTUP_STATUS_LEN {
            return Err(PacketError::Truncated);
        }
        let time = PlatformTime::from_bytes(payload).map_err(|_| PacketError::Truncated)?;
        Ok(Self {
            time,
            status: payload[TIME_LEN],
        })
    }

    pub fn to_packet(&self, serial: DeviceSerial) -> Result<Packet, PacketError> {
        Packet::new(serial, OP_REPORT, CMD_STARTUP_STATUS, 0, &self.to_payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    const NOON: PlatformTime = PlatformTime::new(2024, 6, 15, 12, 0, 1);

    #[test]
    fn test_realtime_layout() {
        let data = RealtimeMonitorData {
            time: NOON,
            data_format: 0x02,
            exception_status: [1, 2, 3, 4, 5, 6],
            water_status: 0x01,
        };
        let payload = data.to_payload();
        assert_eq!(
            payload,
            [0x07, 0xE8, 6, 15, 12, 0, 1, 0x02, 1, 2, 3, 4, 5, 6, 0x01]
        );
        assert_eq!(RealtimeMonitorData::from_payload(&payload), Ok(data));

        let packet = data.to_packet(DeviceSerial::default()).unwrap();
        assert_eq!(packet.command(), CMD_REALTIME_DATA);
        assert_eq!(packet.header.payload_len, 15);
    }

    #[test]
    fn test_event_mixed_endianness() {
        let image = [0xFF, 0xD8, 0xFF];
        let event = MonitorEvent {
            time: NOON,
            trigger: 3,
            realtime_value: 1.5,
            threshold_value: -2.0,
            image: &image,
        };
        let payload = event.to_payload();

        assert_eq!(payload.len(), MONITOR_EVENT_HEADER_LEN + 3);
        // year stays big-endian
        assert_eq!(&payload[..2], &[0x07, 0xE8]);
        assert_eq!(payload[7], 3);
        assert_eq!(&payload[8..12], &1.5f32.to_le_bytes());
        assert_eq!(&payload[12..16], &(-2.0f32).to_le_bytes());
        // image length is little-endian
        assert_eq!(&payload[16..20], &[3, 0, 0, 0]);
        assert_eq!(&payload[20..], &image);

        assert_eq!(MonitorEvent::from_payload(&payload), Ok(event));
    }

    #[test]
    fn test_event_image_clamped() {
        let image = vec![0xAA; MAX_IMAGE_LEN + 100];
        let event = MonitorEvent {
            time: NOON,
            trigger: 0,
            realtime_value: 0.0,
            threshold_value: 0.0,
            image: &image,
        };
        let payload = event.to_payload();
        assert_eq!(payload.len(), MONITOR_EVENT_HEADER_LEN + MAX_IMAGE_LEN);
        assert_eq!(
            &payload[16..20],
            &(MAX_IMAGE_LEN as u32).to_le_bytes()
        );

        let packet = event.to_packet(DeviceSerial::default()).unwrap();
        assert_eq!(
            packet.header.payload_len as usize,
            MONITOR_EVENT_HEADER_LEN + MAX_IMAGE_LEN
        );
    }

    #[test]
    fn test_event_truncated_image() {
        let event = MonitorEvent {
            time: NOON,
            trigger: 0,
            realtime_value: 0.0,
            threshold_value: 0.0,
            image: &[1, 2, 3, 4],
        };
        let payload = event.to_payload();
        assert_eq!(
            MonitorEvent::from_payload(&payload[..payload.len() - 1]),
            Err(PacketError::Truncated)
        );
    }

    #[test]
    fn test_startup_status_defaults_to_zero() {
        let status = StartupStatus::new(NOON);
        assert_eq!(status.status, 0x00);
        assert_eq!(status.to_payload()[STARTUP_STATUS_LEN - 1], 0x00);
    }

    #[test]
    fn test_startup_status() {
        let status = StartupStatus {
            time: NOON,
            status: 0x01,
        };
        assert_eq!(status.to_payload(), [0x07, 0xE8, 6, 15, 12, 0, 1, 0x01]);
        assert_eq!(StartupStatus::from_payload(&status.to_payload()), Ok(status));
        assert_eq!(
            StartupStatus::from_payload(&[0x07, 0xE8]),
            Err(PacketError::Truncated)
        );
    }
}
