//! Tidewatch Hardware Abstraction Layer
//!
//! Defines the serial traits the link layer talks through, so the session
//! and demultiplexer run unchanged against the RP2040 UART or a host-side
//! test double.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  tidewatch-core (session, demux)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  tidewatch-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ firmware UART │       │ test recorder │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::UartTx`], [`uart::UartRx`] - Serial communication with the modem

#![no_std]
#![deny(unsafe_code)]

pub mod uart;

pub use uart::{UartConfig, UartRx, UartTx};
