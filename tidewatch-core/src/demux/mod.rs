//! Serial stream demultiplexer
//!
//! One UART carries three encodings at once: AT text lines, raw binary
//! platform frames, and platform frames hex-encoded inside `+MIPURC`
//! receive notifications. Bytes are routed one at a time, in order:
//!
//! - Outside a frame, `$` starts frame assembly
//! - While a frame is in progress, every byte belongs to it
//! - Everything else accumulates into the current line
//!
//! Complete lines go to the [`LineHandler`]. Receive notifications are then
//! hex-decoded into the same frame assembler. Complete frames are decoded
//! and time-sync responses are pushed to the [`RtcClock`].
//!
//! Protocol faults never surface as errors; they are counted in
//! [`DemuxStats`].

pub mod assembler;
pub mod line;
pub mod urc;

use tidewatch_hal::UartRx;
use tidewatch_protocol::{
    HexBytes, Packet, PacketError, PlatformTime, CMD_TIME_SYNC, FRAME_START,
};

use crate::traits::{LineHandler, RtcClock};

pub use assembler::{Assembly, FrameAssembler};
pub use line::{LineBuffer, LineStatus};

/// Line buffer capacity
pub const LINE_BUF_MAX: usize = 512;

/// Frame buffer capacity
pub const FRAME_BUF_MAX: usize = 512;

/// A partial frame with no new byte for this long is discarded
pub const FRAME_IDLE_TIMEOUT_MS: u32 = 2_000;

/// Read chunk size for [`StreamDemux::poll_uart`]
const READ_CHUNK: usize = 64;

/// Saturating fault and traffic counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DemuxStats {
    /// Frames that passed both CRC checks
    pub frames_decoded: u32,
    pub header_crc_errors: u32,
    pub payload_crc_errors: u32,
    /// Bad start marker, truncation or length mismatch
    pub malformed_frames: u32,
    pub frame_overflows: u32,
    pub line_overflows: u32,
    /// Partial frames dropped after going idle
    pub stale_frames: u32,
    /// Time-sync responses delivered to the clock
    pub time_syncs: u32,
    /// Time-sync responses rejected by range checks
    pub invalid_time_syncs: u32,
}

fn bump(counter: &mut u32) {
    *counter = counter.saturating_add(1);
}

/// Byte-stream router for the modem UART
#[derive(Debug, Default)]
pub struct StreamDemux {
    line: LineBuffer<LINE_BUF_MAX>,
    frame: FrameAssembler<FRAME_BUF_MAX>,
    stats: DemuxStats,
}

impl StreamDemux {
    pub const fn new() -> Self {
        Self {
            line: LineBuffer::new(),
            frame: FrameAssembler::new(),
            stats: DemuxStats {
                frames_decoded: 0,
                header_crc_errors: 0,
                payload_crc_errors: 0,
                malformed_frames: 0,
                frame_overflows: 0,
                line_overflows: 0,
                stale_frames: 0,
                time_syncs: 0,
                invalid_time_syncs: 0,
            },
        }
    }

    pub fn stats(&self) -> DemuxStats {
        self.stats
    }

    /// Whether a frame is being assembled
    pub fn frame_in_progress(&self) -> bool {
        self.frame.is_active()
    }

    /// Drop a partial frame that has gone idle
    pub fn expire_stale(&mut self, now: u32) {
        if self.frame.is_stale(now, FRAME_IDLE_TIMEOUT_MS) {
            self.frame.reset();
            bump(&mut self.stats.stale_frames);
        }
    }

    /// Route a chunk of received bytes
    pub fn feed<H, R>(&mut self, data: &[u8], now: u32, handler: &mut H, rtc: &mut R)
    where
        H: LineHandler + ?Sized,
        R: RtcClock + ?Sized,
    {
        self.expire_stale(now);
        for &byte in data {
            self.push_byte(byte, now, handler, rtc);
        }
    }

    /// Drain every byte the UART has buffered
    ///
    /// Returns the number of bytes consumed.
    pub fn poll_uart<U, H, R>(
        &mut self,
        rx: &mut U,
        now: u32,
        handler: &mut H,
        rtc: &mut R,
    ) -> Result<usize, U::Error>
    where
        U: UartRx + ?Sized,
        H: LineHandler + ?Sized,
        R: RtcClock + ?Sized,
    {
        let mut chunk = [0u8; READ_CHUNK];
        let mut total = 0;
        loop {
            let n = rx.read_available(&mut chunk)?;
            if n == 0 {
                return Ok(total);
            }
            self.feed(&chunk[..n], now, handler, rtc);
            total += n;
        }
    }

    fn push_byte<H, R>(&mut self, byte: u8, now: u32, handler: &mut H, rtc: &mut R)
    where
        H: LineHandler + ?Sized,
        R: RtcClock + ?Sized,
    {
        if self.frame.is_active() || byte == FRAME_START {
            feed_frame(&mut self.frame, &mut self.stats, byte, now, rtc);
            return;
        }

        match self.line.push(byte) {
            LineStatus::Pending => {}
            LineStatus::Overflow => bump(&mut self.stats.line_overflows),
            LineStatus::Complete => {
                self.finish_line(now, handler, rtc);
                self.line.clear();
            }
        }
    }

    fn finish_line<H, R>(&mut self, now: u32, handler: &mut H, rtc: &mut R)
    where
        H: LineHandler + ?Sized,
        R: RtcClock + ?Sized,
    {
        let Self { line, frame, stats } = self;
        let text = line.text();
        if text.is_empty() {
            return;
        }

        handler.handle_line(text, now);

        // A raw frame never spans a line end, so anything still open here
        // came from the token and cannot be continued by raw bytes.
        if let Some(hex) = urc::recv_hex_token(text) {
            for byte in HexBytes::new(hex) {
                feed_frame(frame, stats, byte, now, rtc);
            }
            if frame.is_active() {
                frame.reset();
                bump(&mut stats.malformed_frames);
            }
        }
    }
}

fn feed_frame<R: RtcClock + ?Sized>(
    frame: &mut FrameAssembler<FRAME_BUF_MAX>,
    stats: &mut DemuxStats,
    byte: u8,
    now: u32,
    rtc: &mut R,
) {
    match frame.push(byte, now) {
        Assembly::Ignored | Assembly::Pending => {}
        Assembly::Overflow => bump(&mut stats.frame_overflows),
        Assembly::Complete => {
            dispatch_frame(frame.frame(), now, stats, rtc);
            frame.reset();
        }
    }
}

fn dispatch_frame<R: RtcClock + ?Sized>(bytes: &[u8], now: u32, stats: &mut DemuxStats, rtc: &mut R) {
    let packet = match Packet::decode(bytes) {
        Ok(packet) => packet,
        Err(err) => {
            bump(match err {
                PacketError::HeaderCrc { .. } => &mut stats.header_crc_errors,
                PacketError::PayloadCrc { .. } => &mut stats.payload_crc_errors,
                _ => &mut stats.malformed_frames,
            });
            return;
        }
    };
    bump(&mut stats.frames_decoded);

    if packet.command() == CMD_TIME_SYNC {
        match PlatformTime::from_time_sync_payload(&packet.payload) {
            Ok(time) => {
                bump(&mut stats.time_syncs);
                rtc.on_time_sync(&time, now);
            }
            Err(_) => bump(&mut stats.invalid_time_syncs),
        }
    }
}
