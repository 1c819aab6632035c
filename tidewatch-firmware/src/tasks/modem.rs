//! Modem link task
//!
//! Owns the modem UART, the stream demultiplexer, the session and the
//! software clock. Wakes on received bytes or on the session tick, whichever
//! comes first.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::uart::{BufferedUartRx, BufferedUartTx};
use embassy_time::{Duration, Instant, Ticker};
use embedded_io_async::Read;
use tidewatch_core::clock::SoftRtc;
use tidewatch_core::config::LinkConfig;
use tidewatch_core::demux::StreamDemux;
use tidewatch_core::modem::AtDispatcher;
use tidewatch_core::session::Session;
use tidewatch_core::timer::reached;
use tidewatch_core::traits::RtcClock;
use tidewatch_protocol::StartupStatus;

use crate::uart::{ModemRx, ModemTx};

/// Session tick period
const TICK_MS: u64 = 50;

/// Interval between demux statistics reports
const STATS_INTERVAL_MS: u32 = 60_000;

fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}

/// Modem task - drives the link session from UART input and the tick
#[embassy_executor::task]
pub async fn modem_task(tx: BufferedUartTx, mut rx: BufferedUartRx, config: LinkConfig) {
    info!("Modem task started");

    let mut session = Session::new(AtDispatcher::new(ModemTx(tx)), config);
    let mut demux = StreamDemux::new();
    let mut rtc = SoftRtc::new();
    let mut ticker = Ticker::every(Duration::from_millis(TICK_MS));
    let mut buf = [0u8; 64];

    let mut last_state = session.state();
    let mut last_connected = false;
    let mut last_syncs = 0;
    let mut startup_sent = false;
    let mut next_stats = now_ms().wrapping_add(STATS_INTERVAL_MS);

    loop {
        let received = match select(rx.read(&mut buf), ticker.next()).await {
            Either::First(Ok(n)) => n,
            Either::First(Err(e)) => {
                warn!("Modem UART read error: {}", e);
                0
            }
            Either::Second(()) => 0,
        };

        let now = now_ms();
        if received > 0 {
            demux.feed(&buf[..received], now, &mut session, &mut rtc);
            if let Err(e) = demux.poll_uart(&mut ModemRx(&mut rx), now, &mut session, &mut rtc) {
                warn!("Modem UART drain error: {}", e);
            }
        }
        demux.expire_stale(now);
        session.tick(now);

        if let Some(err) = session.take_error() {
            warn!("Modem command failed: {}", err);
        }

        let state = session.state();
        if state != last_state {
            debug!("Session {} -> {}", last_state, state);
            last_state = state;
        }

        let connected = session.is_connected();
        if connected != last_connected {
            if connected {
                info!("Platform channel connected");
            } else {
                warn!("Platform channel lost, next retry in {} ms", session.backoff_ms());
            }
            last_connected = connected;
        }

        let syncs = demux.stats().time_syncs;
        if syncs != last_syncs {
            if let Some(time) = rtc.now_fields(now) {
                info!(
                    "Clock synced: {}-{}-{} {}:{}:{}",
                    time.year, time.month, time.day, time.hour, time.minute, time.second
                );
            }
            last_syncs = syncs;
        }

        if connected && rtc.is_valid() && !startup_sent {
            if let Some(time) = rtc.now_fields(now) {
                match session.send_startup_status(&StartupStatus::new(time)) {
                    Ok(()) => {
                        info!("Startup status sent");
                        startup_sent = true;
                    }
                    Err(e) => warn!("Startup status not sent: {}", e),
                }
            }
        }

        if reached(now, next_stats) {
            let stats = demux.stats();
            info!(
                "Link stats: frames={} crc_errors={}/{} malformed={} syncs={}",
                stats.frames_decoded,
                stats.header_crc_errors,
                stats.payload_crc_errors,
                stats.malformed_frames,
                stats.time_syncs
            );
            next_stats = now.wrapping_add(STATS_INTERVAL_MS);
        }
    }
}
