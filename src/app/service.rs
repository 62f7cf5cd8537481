//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the [`Scheduler`] plus everything around it that is
//! not per-tick alarm logic: module power-up sequencing, the status
//! heartbeat, operator commands, and config persistence.  All I/O flows
//! through port traits injected at call sites, making the entire service
//! testable with mock adapters.
//!
//! ```text
//!  MainsSensorPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                      │        AppService         │
//!  ModulePowerPort ◀── │  boot · Scheduler · NVS   │ ◀─▶ Transport
//!                      └──────────────────────────┘
//! ```
//!
//! ## Boot sequence
//!
//! ```text
//!  start()          boot delay             probe finished
//!  PoweringUp ─────────────────► Probing ─────────────────► Ready
//!  module power on          AT, ATI, CPIN?, CSQ, CIMI     ready LED on
//! ```
//!
//! The sensor runs from the first tick, but SMS and calls are refused
//! until `Ready`.  A loss that happened during boot is picked up by the
//! sensor's re-notify signal.

use log::{info, warn};

use crate::config::AlarmConfig;
use crate::error::Error;
use crate::modem::{ScriptKind, Transport};
use crate::scheduler::Scheduler;
use crate::timing::{Cadence, Timestamp};

use super::commands::AppCommand;
use super::events::{AppEvent, StatusSnapshot};
use super::ports::{ConfigPort, EventSink, MainsSensorPort, ModulePowerPort};

/// Unsaved config is flushed this long after the last change.
const AUTO_SAVE_DELAY_MS: u32 = 5000;

/// Module bring-up progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootPhase {
    /// Power-enable asserted; waiting for the module to boot.
    PoweringUp { since: Timestamp },
    /// Start-up probe script running.
    Probing,
    /// Alarms armed.
    Ready,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService<T: Transport> {
    scheduler: Scheduler<T>,
    boot: BootPhase,
    boot_time: Timestamp,
    status: Cadence,
    tick_count: u64,
    config_dirty: bool,
    dirty_since: Timestamp,
    save_requested: bool,
}

impl<T: Transport> AppService<T> {
    /// Construct the service.  The sensor is seeded from `input` right away.
    ///
    /// Does **not** power the module; call [`start`](Self::start) next.
    pub fn new<P: MainsSensorPort>(config: AlarmConfig, transport: T, input: &mut P, now: Timestamp) -> Self {
        let status = Cadence::new(config.status_interval_secs * 1000, now);
        Self {
            scheduler: Scheduler::new(config, transport, input, now),
            boot: BootPhase::PoweringUp { since: now },
            boot_time: now,
            status,
            tick_count: 0,
            config_dirty: false,
            dirty_since: now,
            save_requested: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Power the module and begin the boot delay.
    pub fn start(&mut self, now: Timestamp, hw: &mut impl ModulePowerPort, sink: &mut impl EventSink) {
        hw.set_ready_indicator(false);
        hw.set_module_power(true);
        self.boot = BootPhase::PoweringUp { since: now };
        let boot_delay_ms = self.scheduler.config().module_boot_delay_ms;
        sink.emit(&AppEvent::Started { boot_delay_ms });
        info!("AppService started; module boot delay {} ms", boot_delay_ms);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One main-loop iteration: scheduler tick, boot progress, heartbeat.
    ///
    /// The `hw` parameter satisfies **both** [`MainsSensorPort`] and
    /// [`ModulePowerPort`]. This avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        now: Timestamp,
        hw: &mut (impl MainsSensorPort + ModulePowerPort),
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;

        self.scheduler.tick(now, hw, sink);
        self.advance_boot(now, hw, sink);

        if self.status.poll(now) {
            sink.emit(&AppEvent::Status(self.snapshot(now)));
        }
    }

    fn advance_boot(&mut self, now: Timestamp, hw: &mut impl ModulePowerPort, sink: &mut impl EventSink) {
        match self.boot {
            BootPhase::PoweringUp { since } => {
                let delay = self.scheduler.config().module_boot_delay_ms;
                if now.has_elapsed(since, delay) && self.scheduler.run_script(ScriptKind::StartupProbe, now, sink) {
                    self.boot = BootPhase::Probing;
                }
            }
            BootPhase::Probing => {
                if !self.scheduler.scripts().is_running() {
                    self.boot = BootPhase::Ready;
                    self.scheduler.set_modem_ready(true);
                    hw.set_ready_indicator(true);
                    sink.emit(&AppEvent::ModemReady);
                    info!("Module ready; alarm armed");
                    if self.scheduler.config().startup_test_sms {
                        self.scheduler.send_test_sms(now, sink);
                    }
                }
            }
            BootPhase::Ready => {}
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command.
    pub fn handle_command(&mut self, cmd: AppCommand, now: Timestamp, sink: &mut impl EventSink) {
        match cmd {
            AppCommand::SendAlert => {
                self.scheduler.trigger_alert(now, sink);
            }
            AppCommand::SendSms(text) => {
                self.scheduler.send_text(text, now, sink);
            }
            AppCommand::RequestCall => self.scheduler.request_call(now, sink),
            AppCommand::RunScript(kind) => {
                self.scheduler.run_script(kind, now, sink);
            }
            AppCommand::UpdateConfig(new_config) => {
                if let Err(e) = new_config.validate() {
                    let msg = match e {
                        Error::Config(msg) => msg,
                        _ => "invalid config",
                    };
                    warn!("Rejected config update: {}", e);
                    sink.emit(&AppEvent::ConfigRejected(msg));
                    return;
                }
                self.status.set_interval(new_config.status_interval_secs * 1000);
                self.scheduler.apply_config(new_config);
                self.mark_config_dirty(now);
                sink.emit(&AppEvent::ConfigApplied);
                info!("Configuration updated at runtime");
            }
            AppCommand::SaveConfig => {
                self.mark_config_dirty(now);
                self.save_requested = true;
                info!("Explicit config save requested (will flush on next auto-save check)");
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn snapshot(&self, now: Timestamp) -> StatusSnapshot {
        self.scheduler
            .snapshot(now.elapsed_since(self.boot_time) / 1000)
    }

    pub fn boot_phase(&self) -> BootPhase {
        self.boot
    }

    pub fn scheduler(&self) -> &Scheduler<T> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler<T> {
        &mut self.scheduler
    }

    /// Total ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Clone of the live configuration.
    pub fn current_config(&self) -> AlarmConfig {
        self.scheduler.config().clone()
    }

    // ── Config dirty-flag management ──────────────────────────

    /// Mark the config as modified.  Repeated changes restart the delay.
    pub fn mark_config_dirty(&mut self, now: Timestamp) {
        self.config_dirty = true;
        self.dirty_since = now;
    }

    /// Persist the config once it has been unchanged for 5 seconds (or
    /// immediately after an explicit save request).
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(
        &mut self,
        now: Timestamp,
        storage: &impl ConfigPort,
        sink: &mut impl EventSink,
    ) -> bool {
        if !self.config_dirty {
            return false;
        }
        if !self.save_requested && !now.has_elapsed(self.dirty_since, AUTO_SAVE_DELAY_MS) {
            return false;
        }
        match storage.save(self.scheduler.config()) {
            Ok(()) => {
                self.config_dirty = false;
                self.save_requested = false;
                sink.emit(&AppEvent::ConfigSaved);
                info!("Config saved to NVS");
                true
            }
            Err(e) => {
                // Stay dirty; the next check retries.
                self.save_requested = false;
                self.dirty_since = now;
                warn!("Config save failed: {}", e);
                false
            }
        }
    }

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }
}
