//! Debounced mains-presence sensor with edge detection and re-notify.
//!
//! ## Sampling
//!
//! The raw input is read at most once per `sample_interval_ms`.  Between
//! samples [`MainsSensor::poll`] returns `None` without touching the pin.
//! On every sample the debounced level is replaced by the raw level and the
//! pair `(previous, new)` is classified:
//!
//! | previous | new   | Event                                            |
//! |----------|-------|--------------------------------------------------|
//! | present  | lost  | `PowerLost` (re-notify timer restarts)           |
//! | lost     | lost  | `StillLost` once more than `renotify_interval_ms` |
//! | lost     | present | `PowerRestored`                                |
//! | present  | present | none                                           |
//!
//! The first reading at start-up is taken as-is: if mains is already
//! missing at boot no `PowerLost` fires, but `StillLost` follows after one
//! re-notify interval.

use crate::app::ports::MainsSensorPort;
use crate::config::AlarmConfig;
use crate::timing::Timestamp;

/// Validated sensor transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorEvent {
    /// Debounced level went from present to lost.
    PowerLost,
    /// Debounced level went from lost to present.
    PowerRestored,
    /// Power is still lost and the re-notify interval has passed.
    StillLost,
}

/// Snapshot of the sensor's debounce state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorState {
    /// Last raw level read from the input (`true` = power lost).
    pub current_level: bool,
    /// Level the rest of the system acts on.
    pub debounced_level: bool,
    pub last_sample: Timestamp,
    pub last_notify: Timestamp,
}

/// Debounced edge detector over a [`MainsSensorPort`].
pub struct MainsSensor {
    state: SensorState,
    sample_interval_ms: u32,
    renotify_interval_ms: u32,
}

impl MainsSensor {
    /// Seed the detector from an immediate raw read.
    pub fn new<P: MainsSensorPort>(input: &mut P, now: Timestamp, config: &AlarmConfig) -> Self {
        let level = input.power_lost();
        log::info!(
            "mains sensor: initial level {}",
            if level { "LOST" } else { "present" }
        );
        Self {
            state: SensorState {
                current_level: level,
                debounced_level: level,
                last_sample: now,
                last_notify: now,
            },
            sample_interval_ms: config.sample_interval_ms,
            renotify_interval_ms: config.renotify_interval_ms,
        }
    }

    /// Sample the input if due and classify the result.
    pub fn poll<P: MainsSensorPort>(&mut self, input: &mut P, now: Timestamp) -> Option<SensorEvent> {
        if !now.has_elapsed(self.state.last_sample, self.sample_interval_ms) {
            return None;
        }
        let raw = input.power_lost();
        self.state.current_level = raw;
        self.state.last_sample = now;

        let previous = self.state.debounced_level;
        self.state.debounced_level = raw;

        match (previous, raw) {
            (false, true) => {
                self.state.last_notify = now;
                Some(SensorEvent::PowerLost)
            }
            (true, true)
                if now.elapsed_since(self.state.last_notify) > self.renotify_interval_ms =>
            {
                self.state.last_notify = now;
                Some(SensorEvent::StillLost)
            }
            (true, false) => Some(SensorEvent::PowerRestored),
            _ => None,
        }
    }

    /// `true` while the debounced level reports power lost.
    pub fn power_lost(&self) -> bool {
        self.state.debounced_level
    }

    pub fn state(&self) -> &SensorState {
        &self.state
    }

    /// Apply new timing from a config update.  Debounce state is kept.
    pub fn reconfigure(&mut self, config: &AlarmConfig) {
        self.sample_interval_ms = config.sample_interval_ms;
        self.renotify_interval_ms = config.renotify_interval_ms;
    }
}
