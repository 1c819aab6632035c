//! Tidewatch Platform Protocol
//!
//! This crate defines the binary application packets exchanged with the
//! monitoring platform over the modem's TCP channel, and the hex wrapping
//! used to push them through the modem's AT command interface.
//!
//! # Packet Overview
//!
//! ```text
//! ┌───┬────┬────────┬───────────┬─────┬───────┬───────┬─────┬──────────┬─────────┬─────────────┐
//! │ $ │ OP │ LEN BE │ SERIAL    │ VER │ CMD BE│ MODEL │ PID │ HCRC BE  │ PAYLOAD │ PCRC BE     │
//! │1B │ 1B │ 2B     │ 12B ASCII │ 1B  │ 2B    │ 1B    │ 1B  │ 2B       │ LEN B   │ 2B if LEN>0 │
//! └───┴────┴────────┴───────────┴─────┴───────┴───────┴─────┴──────────┴─────────┴─────────────┘
//! ```
//!
//! Both checksums are CRC16/MODBUS. The header checksum covers exactly the
//! first 21 bytes; the payload checksum covers only the payload.
//!
//! Payload layouts mix byte orders (the event image length is little-endian
//! while every other multi-byte integer is big-endian). That is what the
//! platform expects and must not be normalised.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

pub mod crc;
pub mod messages;
pub mod packet;
pub mod time;
pub mod wire;

pub use crc::crc16_modbus;
pub use messages::{
    MonitorEvent, RealtimeMonitorData, StartupStatus, CMD_HEARTBEAT, CMD_MONITOR_EVENT,
    CMD_REALTIME_DATA, CMD_STARTUP_STATUS, CMD_TIME_SYNC, MAX_IMAGE_LEN,
};
pub use packet::{
    frame_len, DeviceSerial, Header, Packet, PacketError, FRAME_START, HEADER_LEN,
    LENGTH_FIELD_END, MIN_FRAME_LEN, OP_REPORT,
};
pub use time::{PlatformTime, TimeError};
pub use wire::{wire_wrap, HexBytes};
