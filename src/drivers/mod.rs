//! Low-level drivers that are not behind a port trait.

pub mod watchdog;
