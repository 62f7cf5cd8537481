//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (mains input, module power, event sinks, config store)
//! implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.  The byte channel to the module is the
//! [`Transport`](crate::modem::Transport) trait next to its link.
//!
//! ## Notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed; callers must handle every variant explicitly.

use crate::config::AlarmConfig;
use crate::timing::Timestamp;

// ───────────────────────────────────────────────────────────────
// Mains sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw read of the mains-presence input.
pub trait MainsSensorPort {
    /// `true` when the input currently reports power lost.
    fn power_lost(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Module power port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// The two output signals the core drives besides the UART.
pub trait ModulePowerPort {
    /// Switch the cellular module's power-enable on or off.
    fn set_module_power(&mut self, on: bool);

    /// Drive the "module ready" indicator.
    fn set_ready_indicator(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go; on the board that
/// is the serial log.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the alarm configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid values are rejected with [`ConfigError::ValidationFailed`],
/// not clamped.  A malformed number or message would otherwise end up
/// in the module's command stream.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`AlarmConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<AlarmConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &AlarmConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<crate::error::Error> for ConfigError {
    fn from(e: crate::error::Error) -> Self {
        match e {
            crate::error::Error::Config(msg) => Self::ValidationFailed(msg),
            _ => Self::IoError,
        }
    }
}
