//! Bounded text line accumulator

use heapless::Vec;

/// Result of pushing one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    /// Byte appended or ignored
    Pending,
    /// A terminator arrived and the buffer holds a line
    Complete,
    /// The buffer filled up and was reset
    Overflow,
}

/// Accumulates bytes until CR or LF
#[derive(Debug, Default)]
pub struct LineBuffer<const N: usize> {
    buf: Vec<u8, N>,
}

impl<const N: usize> LineBuffer<N> {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn push(&mut self, byte: u8) -> LineStatus {
        match byte {
            b'\r' | b'\n' if self.buf.is_empty() => LineStatus::Pending,
            b'\r' | b'\n' => LineStatus::Complete,
            _ => {
                if self.buf.push(byte).is_err() {
                    self.buf.clear();
                    LineStatus::Overflow
                } else {
                    LineStatus::Pending
                }
            }
        }
    }

    /// Trimmed text of the buffered line
    ///
    /// Bytes after the first invalid UTF-8 sequence are dropped.
    pub fn text(&self) -> &str {
        let text = match core::str::from_utf8(&self.buf) {
            Ok(text) => text,
            Err(e) => core::str::from_utf8(&self.buf[..e.valid_up_to()]).unwrap_or(""),
        };
        text.trim()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
