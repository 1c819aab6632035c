//! Software real-time clock

pub mod soft_rtc;

pub use soft_rtc::{civil_from_unix, unix_from_civil, SoftRtc};
