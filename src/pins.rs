//! GPIO / peripheral pin assignments for the PowerWatch board.
//!
//! Single source of truth: `main.rs` builds every pin driver from these
//! constants rather than hard-coding numbers.

// ---------------------------------------------------------------------------
// Cellular module (SIM800-class) on UART2
// ---------------------------------------------------------------------------

/// ESP32 TX -> module RX.
pub const SIM_TX_GPIO: i32 = 17;
/// ESP32 RX <- module TX.
pub const SIM_RX_GPIO: i32 = 16;
/// Module power-enable.  Driven LOW to switch the module on.
pub const SIM_EN_GPIO: i32 = 15;
/// Whether [`SIM_EN_GPIO`] is active-low on this board revision.
pub const SIM_EN_ACTIVE_LOW: bool = true;

/// UART peripheral baud rate expected by the module.
pub const SIM_UART_BAUD: u32 = 115_200;

// ---------------------------------------------------------------------------
// Mains sense
// ---------------------------------------------------------------------------

/// Digital input from the mains-presence opto-coupler.
/// HIGH = mains present, LOW = power lost.
pub const MAINS_SENSE_GPIO: i32 = 4;
/// Whether a LOW level on [`MAINS_SENSE_GPIO`] means power is lost.
pub const MAINS_LOST_ACTIVE_LOW: bool = true;

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

/// On-board LED, lit once the module has finished its start-up probe.
pub const READY_LED_GPIO: i32 = 2;
