//! Hardware adapter: bridges board pins to domain port traits.
//!
//! Generic over `embedded-hal` 1.0 digital pins so the same adapter runs
//! on `esp-idf-hal` `PinDriver`s and on host-side mock pins.  This is the
//! only module in the system that touches GPIO levels.
//!
//! Pin read and write failures are logged, never propagated: a failed
//! sense read keeps the last good level so one glitch cannot fabricate a
//! power-loss edge.

use embedded_hal::digital::{InputPin, OutputPin};
use log::warn;

use crate::app::ports::{MainsSensorPort, ModulePowerPort};

/// Electrical polarity of the three signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Polarity {
    /// Sense input reads LOW when mains is lost.
    pub sense_lost_low: bool,
    /// Module enable is asserted by driving LOW.
    pub enable_active_low: bool,
    /// Ready LED is lit by driving LOW.
    pub led_active_low: bool,
}

impl Default for Polarity {
    fn default() -> Self {
        Self {
            sense_lost_low: crate::pins::MAINS_LOST_ACTIVE_LOW,
            enable_active_low: crate::pins::SIM_EN_ACTIVE_LOW,
            led_active_low: false,
        }
    }
}

/// Concrete adapter that combines the board's pins behind port traits.
pub struct HardwareAdapter<S, E, L> {
    sense: S,
    module_enable: E,
    ready_led: L,
    polarity: Polarity,
    last_lost: bool,
    read_errors: u32,
}

impl<S, E, L> HardwareAdapter<S, E, L>
where
    S: InputPin,
    E: OutputPin,
    L: OutputPin,
{
    pub fn new(sense: S, module_enable: E, ready_led: L, polarity: Polarity) -> Self {
        Self {
            sense,
            module_enable,
            ready_led,
            polarity,
            last_lost: false,
            read_errors: 0,
        }
    }

    /// Sense reads that failed since start-up.
    pub fn read_errors(&self) -> u32 {
        self.read_errors
    }
}

fn drive<P: OutputPin>(pin: &mut P, asserted: bool, active_low: bool, what: &str) {
    let result = if asserted != active_low {
        pin.set_high()
    } else {
        pin.set_low()
    };
    if let Err(e) = result {
        warn!("{} pin write failed: {:?}", what, e);
    }
}

// ── MainsSensorPort implementation ────────────────────────────

impl<S, E, L> MainsSensorPort for HardwareAdapter<S, E, L>
where
    S: InputPin,
    E: OutputPin,
    L: OutputPin,
{
    fn power_lost(&mut self) -> bool {
        match self.sense.is_low() {
            Ok(low) => {
                self.last_lost = low == self.polarity.sense_lost_low;
            }
            Err(e) => {
                self.read_errors = self.read_errors.wrapping_add(1);
                warn!("mains sense read failed ({:?}); keeping last level", e);
            }
        }
        self.last_lost
    }
}

// ── ModulePowerPort implementation ────────────────────────────

impl<S, E, L> ModulePowerPort for HardwareAdapter<S, E, L>
where
    S: InputPin,
    E: OutputPin,
    L: OutputPin,
{
    fn set_module_power(&mut self, on: bool) {
        drive(&mut self.module_enable, on, self.polarity.enable_active_low, "module enable");
    }

    fn set_ready_indicator(&mut self, on: bool) {
        drive(&mut self.ready_led, on, self.polarity.led_active_low, "ready LED");
    }
}
