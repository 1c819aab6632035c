//! Hex wrapping for the modem's text interface
//!
//! Packets leave the device as `AT+MIPSEND=0,0,<HEX>\r\n` and arrive inside
//! `+MIPURC: "recv",...` notifications as a hex token.

use alloc::string::String;
use core::str::Chars;

/// Command prefix for sending hex data on channel 0
pub const SEND_PREFIX: &str = "AT+MIPSEND=0,0,";

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Wrap encoded packet bytes into a complete send command, CRLF included
pub fn wire_wrap(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(SEND_PREFIX.len() + bytes.len() * 2 + 2);
    out.push_str(SEND_PREFIX);
    for &b in bytes {
        out.push(HEX_DIGITS[(b >> 4) as usize] as char);
        out.push(HEX_DIGITS[(b & 0x0F) as usize] as char);
    }
    out.push_str("\r\n");
    out
}

/// Lenient hex decoder
///
/// Characters that are not hex digits are skipped. Digits pair up in order
/// of appearance and an unpaired trailing digit is dropped.
#[derive(Debug, Clone)]
pub struct HexBytes<'a> {
    chars: Chars<'a>,
}

impl<'a> HexBytes<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars(),
        }
    }

    fn next_nibble(&mut self) -> Option<u8> {
        self.chars
            .by_ref()
            .find_map(|c| c.to_digit(16).map(|d| d as u8))
    }
}

impl Iterator for HexBytes<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        let high = self.next_nibble()?;
        let low = self.next_nibble()?;
        Some((high << 4) | low)
    }
}
