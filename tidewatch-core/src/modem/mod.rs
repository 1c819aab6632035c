//! Modem command output

pub mod dispatcher;

pub use dispatcher::{AtDispatcher, MAX_COMMAND_LEN};
