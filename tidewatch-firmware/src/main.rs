//! Tidewatch - Cellular Water Monitor Link Firmware
//!
//! Main firmware binary for RP2040-based monitoring stations. Brings up the
//! cellular modem on UART0, keeps the platform TCP channel alive and keeps
//! the software clock in sync with the platform.

#![no_std]
#![no_main]

extern crate alloc;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Uart};
use embedded_alloc::LlffHeap as Heap;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

mod config;
mod tasks;
mod uart;

// Heap allocator for packet encoding and hex wrapping
#[global_allocator]
static HEAP: Heap = Heap::empty();

// Heap size: 64KB
// Enough for every report except a monitor event, which needs about four
// times its image size; keep event images under ~14KB on this heap.
const HEAP_SIZE: usize = 64 * 1024;

/// Modem baud rate (8N1)
const MODEM_BAUD: u32 = 115_200;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 1024]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 1024]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Tidewatch firmware starting...");

    init_heap();

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let link_config = config::load();
    info!(
        "Link config: server {}:{}, wait_for_ready={}",
        link_config.server_host.as_str(),
        link_config.server_port,
        link_config.wait_for_ready
    );

    // Modem UART: TX on GPIO0, RX on GPIO1
    let serial = tidewatch_hal::UartConfig::new(MODEM_BAUD);
    let uart_config = uart::embassy_config(&serial);

    let tx_buf = TX_BUF.init([0u8; 1024]);
    let rx_buf = RX_BUF.init([0u8; 1024]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    info!("Modem UART initialized at {} baud", serial.baudrate);

    spawner
        .spawn(tasks::modem_task(tx, rx, link_config))
        .unwrap();

    info!("All tasks spawned, firmware running");

    // Main task has nothing else to do - all work happens in spawned tasks
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}
