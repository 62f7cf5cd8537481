//! Unified error types for the PowerWatch firmware.
//!
//! Only the edges of the system return errors: configuration validation,
//! peripheral bring-up, and the raw byte transport.  The control core
//! itself (sensor, SMS sequencer, call controller, scheduler) is
//! infallible by construction and reports problems as log lines.
//! All variants are `Copy` so they can be passed around without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A configuration value failed validation.
    Config(&'static str),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// The byte transport to the cellular module rejected a read or write.
    Transport,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Transport => write!(f, "transport I/O failed"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
