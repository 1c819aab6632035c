//! Session states

/// Bring-up and monitoring states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    /// Created, nothing sent yet
    #[default]
    Idle,
    /// Waiting for the modem's `+MATREADY`
    WaitReady,
    /// `AT` sent
    Probing,
    /// `AT+CEREG?` sent
    CheckingRegistration,
    /// `AT+MIPCFG` sent
    ConfiguringEncoding,
    /// `AT+MIPCLOSE` sent
    ClosingChannel,
    /// `AT+MIPOPEN` sent
    OpeningChannel,
    /// Channel up (or waiting for a scheduled reopen)
    Monitoring,
}

/// Deferred actions the session can schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RetryAction {
    Probe,
    QueryRegistration,
    OpenChannel,
}
