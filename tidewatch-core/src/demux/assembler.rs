//! Length-prefixed frame assembly
//!
//! A frame starts at `$`. Once the length field has arrived the total size
//! is known and the frame completes at exactly that many bytes.

use heapless::Vec;
use tidewatch_protocol::{frame_len, Header, FRAME_START};

use crate::timer::reached;

/// Result of pushing one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assembly {
    /// No frame in progress and the byte is not a start marker
    Ignored,
    /// Byte consumed, frame incomplete
    Pending,
    /// Frame complete; read it with [`FrameAssembler::frame`]
    Complete,
    /// Frame larger than the buffer; discarded
    Overflow,
}

/// Bounded frame accumulator
#[derive(Debug, Default)]
pub struct FrameAssembler<const N: usize> {
    buf: Vec<u8, N>,
    expected: Option<usize>,
    last_byte_at: u32,
}

impl<const N: usize> FrameAssembler<N> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            expected: None,
            last_byte_at: 0,
        }
    }

    /// Whether a frame is in progress
    pub fn is_active(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Whether an in-progress frame has seen no byte for `idle_ms`
    pub fn is_stale(&self, now: u32, idle_ms: u32) -> bool {
        self.is_active() && reached(now, self.last_byte_at.wrapping_add(idle_ms))
    }

    pub fn push(&mut self, byte: u8, now: u32) -> Assembly {
        if self.buf.is_empty() && byte != FRAME_START {
            return Assembly::Ignored;
        }
        if self.buf.push(byte).is_err() {
            self.reset();
            return Assembly::Overflow;
        }
        self.last_byte_at = now;

        if self.expected.is_none() {
            if let Some(payload_len) = Header::peek_payload_len(&self.buf) {
                let total = frame_len(payload_len);
                if total > N {
                    self.reset();
                    return Assembly::Overflow;
                }
                self.expected = Some(total);
            }
        }

        match self.expected {
            Some(total) if self.buf.len() >= total => Assembly::Complete,
            _ => Assembly::Pending,
        }
    }

    /// Bytes of the completed frame
    pub fn frame(&self) -> &[u8] {
        &self.buf
    }

    pub fn reset(&mut self) {
        self.buf.clear();
        self.expected = None;
    }
}
