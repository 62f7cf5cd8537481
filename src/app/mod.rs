//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the alarm's orchestration: module bring-up, the
//! per-tick scheduler, operator commands, and config persistence.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
