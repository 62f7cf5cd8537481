//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements        | Connects to                       |
//! |------------|-------------------|-----------------------------------|
//! | `hardware` | MainsSensorPort   | mains sense input (embedded-hal)  |
//! |            | ModulePowerPort   | module enable + ready LED         |
//! | `log_sink` | EventSink         | Serial log output                 |
//! | `nvs`      | ConfigPort        | NVS / in-memory store             |
//! | `time`     | Clock             | ESP32 system timer                |
//! | `uart`     | Transport         | UART2 to the cellular module      |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
#[cfg(target_os = "espidf")]
pub mod uart;
