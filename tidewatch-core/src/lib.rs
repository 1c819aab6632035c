//! Board-agnostic core logic for the Tidewatch modem link
//!
//! This crate contains everything between the raw serial bytes and the
//! platform packets that does not depend on a specific board:
//!
//! - Collaborator traits (line handler, command dispatcher, clock)
//! - Retry scheduling and exponential backoff
//! - Stream demultiplexing of AT lines, raw frames and hex-embedded frames
//! - Modem session state machine
//! - AT command dispatcher over a serial port
//! - Link configuration and its text parser
//! - Software real-time clock

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

pub mod clock;
pub mod config;
pub mod demux;
pub mod modem;
pub mod session;
pub mod timer;
pub mod traits;
