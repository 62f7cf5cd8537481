//! Mock board, modem, sink, and config store for integration tests.
//!
//! The mock modem records every write together with the simulated time it
//! happened at, so tests can assert on order and spacing of the command
//! stream without touching a UART.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use powerwatch::app::events::AppEvent;
use powerwatch::app::ports::{ConfigError, ConfigPort, EventSink, MainsSensorPort, ModulePowerPort};
use powerwatch::config::AlarmConfig;
use powerwatch::error::{Error, Result};
use powerwatch::modem::Transport;
use powerwatch::timing::Timestamp;

pub const PHONE: &str = "+84912345678";
pub const ALERT: &str = "Mat dien tai tram";

pub fn ms(v: u32) -> Timestamp {
    Timestamp::from_millis(v)
}

pub fn provisioned_config() -> AlarmConfig {
    AlarmConfig::with_recipient(PHONE, ALERT).unwrap()
}

// ── Board (sense input + module power) ───────────────────────

#[derive(Debug, Default)]
pub struct MockBoard {
    pub lost: bool,
    pub sense_reads: usize,
    pub module_on: bool,
    pub ready_led: bool,
}

impl MainsSensorPort for MockBoard {
    fn power_lost(&mut self) -> bool {
        self.sense_reads += 1;
        self.lost
    }
}

impl ModulePowerPort for MockBoard {
    fn set_module_power(&mut self, on: bool) {
        self.module_on = on;
    }

    fn set_ready_indicator(&mut self, on: bool) {
        self.ready_led = on;
    }
}

// ── Modem transport ──────────────────────────────────────────

/// One write, as seen on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Write {
    pub at_ms: u32,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct MockModem {
    /// Simulated time stamped onto each write; advanced by the harness.
    pub now_ms: u32,
    pub writes: Vec<Write>,
    pub inbound: VecDeque<u8>,
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MockModem {
    /// Queue bytes the module "sends".
    pub fn reply(&mut self, text: &str) {
        self.inbound.extend(text.as_bytes());
    }

    /// Written lines with the `\r\n` stripped; the SMS terminator shows as `<SUB>`.
    pub fn lines(&self) -> Vec<String> {
        self.writes.iter().map(|w| w.text.clone()).collect()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.writes.iter().filter(|w| w.text.starts_with(prefix)).count()
    }

    pub fn first_at(&self, prefix: &str) -> Option<u32> {
        self.writes.iter().find(|w| w.text.starts_with(prefix)).map(|w| w.at_ms)
    }
}

impl Transport for MockModem {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(Error::Transport);
        }
        let text = if bytes == [0x1A] {
            "<SUB>".to_string()
        } else {
            String::from_utf8_lossy(bytes).trim_end_matches("\r\n").to_string()
        };
        self.writes.push(Write { at_ms: self.now_ms, text });
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.inbound.len());
        for (slot, b) in buf.iter_mut().zip(self.inbound.drain(..n)) {
            *slot = b;
        }
        Ok(n)
    }
}

// ── Event sink ───────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Config store ─────────────────────────────────────────────

#[derive(Default)]
pub struct MemConfigStore {
    pub saved: RefCell<Option<AlarmConfig>>,
    pub saves: Cell<u32>,
    pub fail: Cell<bool>,
}

impl ConfigPort for MemConfigStore {
    fn load(&self) -> std::result::Result<AlarmConfig, ConfigError> {
        Ok(self.saved.borrow().clone().unwrap_or_default())
    }

    fn save(&self, config: &AlarmConfig) -> std::result::Result<(), ConfigError> {
        if self.fail.get() {
            return Err(ConfigError::IoError);
        }
        config.validate()?;
        self.saves.set(self.saves.get() + 1);
        *self.saved.borrow_mut() = Some(config.clone());
        Ok(())
    }
}
