//! PowerWatch Firmware: Main Entry Point
//!
//! Hexagonal architecture with a single cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter     UartTransport   LogEventSink  NvsAdapter  │
//! │  (MainsSensor +      (Transport)     (EventSink)   (Config)    │
//! │   ModulePower)                                     Esp32Clock  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  boot · Scheduler(sensor · SMS · call · scripts)       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, PinDriver, Pull};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{config::Config as UartConfig, UartDriver};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use powerwatch::adapters::hardware::{HardwareAdapter, Polarity};
use powerwatch::adapters::log_sink::LogEventSink;
use powerwatch::adapters::nvs::NvsAdapter;
use powerwatch::adapters::time::Esp32Clock;
use powerwatch::adapters::uart::UartTransport;
use powerwatch::app::ports::{Clock, ConfigPort};
use powerwatch::app::service::AppService;
use powerwatch::config::AlarmConfig;
use powerwatch::drivers::watchdog::LoopWatchdog;
use powerwatch::error::Error;
use powerwatch::pins;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PowerWatch v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = NvsAdapter::new(EspDefaultNvsPartition::take()?);
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            AlarmConfig::default()
        }
    };
    if !config.has_recipient() {
        warn!("No recipient configured: alarms will be logged but not sent");
    }

    // ── 3. Pins ───────────────────────────────────────────────
    // SAFETY: each GPIO number in `pins` is claimed exactly once here.
    let mut sense = PinDriver::input(unsafe { AnyIOPin::new(pins::MAINS_SENSE_GPIO) })
        .map_err(init_failed("mains sense input"))?;
    sense.set_pull(Pull::Up).map_err(init_failed("mains sense pull-up"))?;
    let module_enable = PinDriver::output(unsafe { AnyOutputPin::new(pins::SIM_EN_GPIO) })
        .map_err(init_failed("module enable output"))?;
    let ready_led = PinDriver::output(unsafe { AnyOutputPin::new(pins::READY_LED_GPIO) })
        .map_err(init_failed("ready LED output"))?;
    let mut hw = HardwareAdapter::new(sense, module_enable, ready_led, Polarity::default());

    // ── 4. Module UART ────────────────────────────────────────
    let uart = UartDriver::new(
        peripherals.uart2,
        unsafe { AnyIOPin::new(pins::SIM_TX_GPIO) },
        unsafe { AnyIOPin::new(pins::SIM_RX_GPIO) },
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(pins::SIM_UART_BAUD)),
    )
    .map_err(init_failed("module UART"))?;

    // ── 5. Application service ────────────────────────────────
    let clock = Esp32Clock::new();
    let mut sink = LogEventSink::new();
    let now = clock.now();
    let mut app = AppService::new(config, UartTransport::new(uart), &mut hw, now);
    app.start(now, &mut hw, &mut sink);

    let mut watchdog = LoopWatchdog::default();
    info!("Entering main loop");

    // ── 6. Main loop ──────────────────────────────────────────
    loop {
        let now = clock.now();
        app.tick(now, &mut hw, &mut sink);

        // Config auto-save (5s debounce after last change).
        app.auto_save_if_needed(now, &nvs, &mut sink);

        watchdog.feed();

        // Yield so the idle task runs; the loop itself never blocks.
        FreeRtos::delay_ms(app.scheduler().config().loop_yield_ms);
    }
}

/// Log the driver error and reduce it to [`Error::Init`] naming the peripheral.
fn init_failed<E: core::fmt::Display>(what: &'static str) -> impl FnOnce(E) -> Error {
    move |e| {
        error!("{} init failed: {}", what, e);
        Error::Init(what)
    }
}
