//! Collaborator traits
//!
//! These traits define the seams between the link logic and whatever sits
//! around it: the modem command writer, the consumer of text lines and the
//! wall clock.

pub mod line;
pub mod modem;
pub mod rtc;

pub use line::LineHandler;
pub use modem::{CommandDispatcher, ModemError};
pub use rtc::RtcClock;
