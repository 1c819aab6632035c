//! Embassy async tasks

pub mod modem;

pub use modem::modem_task;
