//! Command dispatcher trait for the cellular modem

use tidewatch_protocol::PacketError;

/// Errors that can occur when talking to the modem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemError {
    /// Serial write failed
    Write,
    /// Command text did not fit the command buffer
    BufferOverflow,
    /// Data channel is not connected
    ChannelDown,
    /// Packet could not be built
    Encode(PacketError),
}

impl From<PacketError> for ModemError {
    fn from(err: PacketError) -> Self {
        ModemError::Encode(err)
    }
}

/// One method per AT command used during bring-up and monitoring
///
/// Implementations only write the command. Responses come back later as
/// lines through the stream demultiplexer.
pub trait CommandDispatcher {
    /// `AT`
    fn probe(&mut self) -> Result<(), ModemError>;

    /// `AT+CEREG?`
    fn query_registration(&mut self) -> Result<(), ModemError>;

    /// `AT+MIPCFG="encoding",0,1,0`
    fn configure_encoding(&mut self) -> Result<(), ModemError>;

    /// `AT+MIPCLOSE=0`
    fn close_channel(&mut self) -> Result<(), ModemError>;

    /// `AT+MIPOPEN=0,"TCP","<host>",<port>`
    fn open_channel(&mut self, host: &str, port: u16) -> Result<(), ModemError>;

    /// `AT+MIPSTATE=0`
    fn poll_channel_state(&mut self) -> Result<(), ModemError>;

    /// Write an already wrapped `AT+MIPSEND` command verbatim
    fn send_wrapped(&mut self, command: &str) -> Result<(), ModemError>;
}
