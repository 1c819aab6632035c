//! Modem session state machine
//!
//! Brings the modem up (probe, registration, encoding, close, open), keeps
//! the TCP channel alive and drives the periodic heartbeat, status poll and
//! time sync. Nothing blocks: commands are written through the
//! [`CommandDispatcher`](crate::traits::CommandDispatcher), replies arrive
//! later as lines, and [`Session::tick`] handles every timeout.

pub mod events;
pub mod machine;
pub mod state;

pub use events::ModemEvent;
pub use machine::Session;
pub use state::{RetryAction, SessionState};
