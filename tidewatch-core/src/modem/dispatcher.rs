//! AT command writer over a UART

use core::fmt::Write;

use heapless::String;
use tidewatch_hal::UartTx;

use crate::traits::{CommandDispatcher, ModemError};

/// Longest formatted command, excluding the line terminator
pub const MAX_COMMAND_LEN: usize = 128;

const TERMINATOR: &[u8] = b"\r\n";

/// Writes each command as exact text followed by CRLF
#[derive(Debug)]
pub struct AtDispatcher<T> {
    tx: T,
}

impl<T: UartTx> AtDispatcher<T> {
    pub fn new(tx: T) -> Self {
        Self { tx }
    }

    pub fn inner(&self) -> &T {
        &self.tx
    }

    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.tx
    }

    pub fn into_inner(self) -> T {
        self.tx
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), ModemError> {
        self.tx.write_all(bytes).map_err(|_| ModemError::Write)?;
        self.tx.flush().map_err(|_| ModemError::Write)
    }

    fn send_line(&mut self, command: &str) -> Result<(), ModemError> {
        self.tx
            .write_all(command.as_bytes())
            .map_err(|_| ModemError::Write)?;
        self.write_raw(TERMINATOR)
    }
}

impl<T: UartTx> CommandDispatcher for AtDispatcher<T> {
    fn probe(&mut self) -> Result<(), ModemError> {
        self.send_line("AT")
    }

    fn query_registration(&mut self) -> Result<(), ModemError> {
        self.send_line("AT+CEREG?")
    }

    fn configure_encoding(&mut self) -> Result<(), ModemError> {
        self.send_line("AT+MIPCFG=\"encoding\",0,1,0")
    }

    fn close_channel(&mut self) -> Result<(), ModemError> {
        self.send_line("AT+MIPCLOSE=0")
    }

    fn open_channel(&mut self, host: &str, port: u16) -> Result<(), ModemError> {
        let mut command: String<MAX_COMMAND_LEN> = String::new();
        write!(command, "AT+MIPOPEN=0,\"TCP\",\"{}\",{}", host, port)
            .map_err(|_| ModemError::BufferOverflow)?;
        self.send_line(&command)
    }

    fn poll_channel_state(&mut self) -> Result<(), ModemError> {
        self.send_line("AT+MIPSTATE=0")
    }

    fn send_wrapped(&mut self, command: &str) -> Result<(), ModemError> {
        self.write_raw(command.as_bytes())
    }
}
