//! Cooperative per-tick dispatcher.
//!
//! Owns every piece of alarm state and the command link, and advances
//! them in a fixed order once per main-loop iteration:
//!
//! ```text
//!  tick(now)
//!    1. MainsSensor::poll      PowerLost / StillLost ──► SMS start (Alert)
//!    2. SmsSequencer::tick     Completed (Alert) ──────► call request
//!    3. CallController::tick   hang-up / cooldown expiry
//!    4. ScriptRunner::tick     maintenance commands
//!    5. CommandLink::drain     module lines ───────────► ModemLine events
//! ```
//!
//! Nothing here sleeps.  Every "wait" is a stored timestamp compared
//! against `now`.  `PowerRestored` is reported but never cancels an SMS or
//! call that is already under way.

use crate::alarm::{CallController, SmsEvent, SmsSequencer};
use crate::app::events::{AppEvent, ModemLine, Refusal, SmsPurpose, StatusSnapshot};
use crate::app::ports::{EventSink, MainsSensorPort};
use crate::config::{AlarmConfig, MessageText, validate_message};
use crate::modem::script::ScriptRunner;
use crate::modem::{CommandLink, ScriptKind, Transport};
use crate::sensors::{MainsSensor, SensorEvent};
use crate::timing::Timestamp;

pub struct Scheduler<T: Transport> {
    config: AlarmConfig,
    sensor: MainsSensor,
    sms: SmsSequencer,
    sms_purpose: SmsPurpose,
    calls: CallController,
    scripts: ScriptRunner,
    link: CommandLink<T>,
    /// Alarm traffic is held back until the module has been probed.
    modem_ready: bool,
}

impl<T: Transport> Scheduler<T> {
    /// Build the scheduler, seeding the sensor from an immediate read.
    pub fn new<P: MainsSensorPort>(
        config: AlarmConfig,
        transport: T,
        input: &mut P,
        now: Timestamp,
    ) -> Self {
        Self {
            sensor: MainsSensor::new(input, now, &config),
            sms: SmsSequencer::new(&config),
            sms_purpose: SmsPurpose::Alert,
            calls: CallController::new(&config),
            scripts: ScriptRunner::new(),
            link: CommandLink::new(transport),
            modem_ready: false,
            config,
        }
    }

    /// One scheduler iteration.
    pub fn tick<P: MainsSensorPort, S: EventSink>(&mut self, now: Timestamp, input: &mut P, sink: &mut S) {
        if let Some(ev) = self.sensor.poll(input, now) {
            sink.emit(&AppEvent::Sensor(ev));
            match ev {
                SensorEvent::PowerLost | SensorEvent::StillLost => {
                    self.start_sms(SmsPurpose::Alert, self.config.alert_message.clone(), now, sink);
                }
                SensorEvent::PowerRestored => {}
            }
        }

        match self.sms.tick(now, &mut self.link) {
            Some(SmsEvent::Advanced(step)) => sink.emit(&AppEvent::SmsStep(step)),
            Some(SmsEvent::Completed) => {
                sink.emit(&AppEvent::SmsCompleted(self.sms_purpose));
                if self.sms_purpose == SmsPurpose::Alert {
                    self.request_call(now, sink);
                }
            }
            None => {}
        }

        if let Some(ev) = self.calls.tick(now, &mut self.link) {
            sink.emit(&AppEvent::Call(ev));
        }

        if let Some(ev) = self.scripts.tick(now, &mut self.link) {
            sink.emit(&AppEvent::Script(ev));
        }

        self.drain(sink);
    }

    /// Start the power-loss alert SMS.
    pub fn trigger_alert<S: EventSink>(&mut self, now: Timestamp, sink: &mut S) -> bool {
        self.start_sms(SmsPurpose::Alert, self.config.alert_message.clone(), now, sink)
    }

    /// Send the configured test message.
    pub fn send_test_sms<S: EventSink>(&mut self, now: Timestamp, sink: &mut S) -> bool {
        self.start_sms(SmsPurpose::Test, self.config.test_message.clone(), now, sink)
    }

    /// Send an operator-supplied text.  Refused unless it is 1-160
    /// printable ASCII characters; a stray 0x1A would end the SMS early
    /// and the rest would reach the module as commands.
    pub fn send_text<S: EventSink>(&mut self, text: MessageText, now: Timestamp, sink: &mut S) -> bool {
        if let Err(e) = validate_message(&text, "SMS text must be 1-160 printable ASCII chars") {
            log::warn!("sms: manual text rejected ({e})");
            sink.emit(&AppEvent::SmsRefused {
                purpose: SmsPurpose::Manual,
                reason: Refusal::InvalidText,
            });
            return false;
        }
        self.start_sms(SmsPurpose::Manual, text, now, sink)
    }

    /// Ask the call controller for a call to the configured recipient.
    pub fn request_call<S: EventSink>(&mut self, now: Timestamp, sink: &mut S) {
        if let Some(reason) = self.alarm_gate() {
            log::warn!("call: refused ({reason:?})");
            sink.emit(&AppEvent::CallRefused(reason));
            return;
        }
        if self.calls.phase() == crate::alarm::CallPhase::Ready {
            self.abort_script(sink);
        }
        let ev = self
            .calls
            .request_call(now, &self.config.phone_number, &mut self.link);
        sink.emit(&AppEvent::Call(ev));
    }

    /// Start a maintenance script.  Refused while an SMS or call owns the
    /// link, while another script runs, or (except for the start-up probe)
    /// before the module is ready.
    pub fn run_script<S: EventSink>(&mut self, kind: ScriptKind, now: Timestamp, sink: &mut S) -> bool {
        let reason = if self.sms.is_active() || self.calls.is_active() {
            Some(Refusal::AlarmActive)
        } else if self.scripts.is_running() {
            Some(Refusal::ScriptBusy)
        } else if !self.modem_ready && kind != ScriptKind::StartupProbe {
            Some(Refusal::ModemNotReady)
        } else {
            None
        };
        if let Some(reason) = reason {
            log::warn!("script: {} refused ({reason:?})", kind.label());
            sink.emit(&AppEvent::ScriptRefused { kind, reason });
            return false;
        }
        match self.scripts.start(kind, now, &self.config, &mut self.link) {
            Some(ev) => {
                sink.emit(&AppEvent::Script(ev));
                true
            }
            None => false,
        }
    }

    /// Replace the live configuration.  In-flight jobs keep running; new
    /// timings take effect from their next step.
    pub fn apply_config(&mut self, config: AlarmConfig) {
        self.sensor.reconfigure(&config);
        self.sms.reconfigure(&config);
        self.calls.reconfigure(&config);
        self.config = config;
    }

    pub fn set_modem_ready(&mut self, ready: bool) {
        self.modem_ready = ready;
    }

    pub fn modem_ready(&self) -> bool {
        self.modem_ready
    }

    pub fn config(&self) -> &AlarmConfig {
        &self.config
    }

    pub fn sensor(&self) -> &MainsSensor {
        &self.sensor
    }

    pub fn sms(&self) -> &SmsSequencer {
        &self.sms
    }

    pub fn calls(&self) -> &CallController {
        &self.calls
    }

    pub fn scripts(&self) -> &ScriptRunner {
        &self.scripts
    }

    pub fn transport(&self) -> &T {
        self.link.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.link.transport_mut()
    }

    pub fn snapshot(&self, uptime_secs: u32) -> StatusSnapshot {
        StatusSnapshot {
            uptime_secs,
            power_lost: self.sensor.power_lost(),
            modem_ready: self.modem_ready,
            sms_step: self.sms.step(),
            sms_completed: self.sms.completed(),
            call_phase: self.calls.phase(),
            calls_in_batch: self.calls.batch().calls_in_batch,
            script: self.scripts.running(),
            write_failures: self.link.write_failures(),
        }
    }

    // ── internals ──────────────────────────────────────────────

    fn start_sms<S: EventSink>(
        &mut self,
        purpose: SmsPurpose,
        body: MessageText,
        now: Timestamp,
        sink: &mut S,
    ) -> bool {
        if let Some(reason) = self.alarm_gate() {
            log::warn!("sms: {purpose:?} not sent ({reason:?})");
            sink.emit(&AppEvent::SmsRefused { purpose, reason });
            return false;
        }
        // Busy is the silent re-entrancy guard.
        if self.sms.is_active() {
            return self.sms.start(now, &self.config.phone_number, &body, &mut self.link);
        }
        self.abort_script(sink);
        if !self.sms.start(now, &self.config.phone_number, &body, &mut self.link) {
            return false;
        }
        self.sms_purpose = purpose;
        sink.emit(&AppEvent::SmsStarted {
            purpose,
            recipient: self.config.phone_number.clone(),
        });
        sink.emit(&AppEvent::SmsStep(self.sms.step()));
        true
    }

    fn alarm_gate(&self) -> Option<Refusal> {
        if !self.modem_ready {
            Some(Refusal::ModemNotReady)
        } else if !self.config.has_recipient() {
            Some(Refusal::NoRecipient)
        } else {
            None
        }
    }

    fn abort_script<S: EventSink>(&mut self, sink: &mut S) {
        if let Some(ev) = self.scripts.abort() {
            sink.emit(&AppEvent::Script(ev));
        }
    }

    fn drain<S: EventSink>(&mut self, sink: &mut S) {
        self.link.drain(|line| {
            if let Ok(line) = ModemLine::try_from(line) {
                sink.emit(&AppEvent::ModemLine(line));
            }
        });
    }
}
