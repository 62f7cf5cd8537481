//! Sensor subsystem.
//!
//! PowerWatch has a single physical input, the mains-presence
//! opto-coupler.  [`mains::MainsSensor`] turns its raw level into
//! debounced [`mains::SensorEvent`]s once per sample interval.

pub mod mains;

pub use mains::{MainsSensor, SensorEvent, SensorState};
