//! Serial port adapters for the modem UART

use embassy_rp::uart::{self, BufferedUartRx, BufferedUartTx};
use embedded_io::{Read, ReadReady, Write};
use tidewatch_hal::uart::{DataBits, Parity, StopBits};
use tidewatch_hal::{UartConfig, UartRx, UartTx};

/// Translate the link's serial settings into the RP2040 UART config
pub fn embassy_config(config: &UartConfig) -> uart::Config {
    let mut out = uart::Config::default();
    out.baudrate = config.baudrate;
    out.data_bits = match config.data_bits {
        DataBits::Seven => uart::DataBits::DataBits7,
        DataBits::Eight => uart::DataBits::DataBits8,
    };
    out.parity = match config.parity {
        Parity::None => uart::Parity::ParityNone,
        Parity::Even => uart::Parity::ParityEven,
        Parity::Odd => uart::Parity::ParityOdd,
    };
    out.stop_bits = match config.stop_bits {
        StopBits::One => uart::StopBits::STOP1,
        StopBits::Two => uart::StopBits::STOP2,
    };
    out
}

/// Blocking transmit half
pub struct ModemTx(pub BufferedUartTx);

impl UartTx for ModemTx {
    type Error = uart::Error;

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        Write::write_all(&mut self.0, data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Write::flush(&mut self.0)
    }
}

/// Non-blocking view of the receive half
pub struct ModemRx<'a>(pub &'a mut BufferedUartRx);

impl UartRx for ModemRx<'_> {
    type Error = uart::Error;

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() || !self.0.read_ready()? {
            return Ok(0);
        }
        Read::read(self.0, buf)
    }
}
