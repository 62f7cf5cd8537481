//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART0 / USB-CDC in production).
//! This is the operator-visible log: one prefixed line per event.

use log::{info, warn};

use crate::alarm::{CallEvent, DropReason};
use crate::app::events::{AppEvent, StatusSnapshot};
use crate::app::ports::EventSink;
use crate::modem::script::ScriptEvent;
use crate::sensors::SensorEvent;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { boot_delay_ms } => {
                info!("START | module powering up, boot delay {} ms", boot_delay_ms);
            }
            AppEvent::Sensor(ev) => match ev {
                SensorEvent::PowerLost => warn!("SENSOR | mains power LOST"),
                SensorEvent::StillLost => warn!("SENSOR | mains still lost, re-notifying"),
                SensorEvent::PowerRestored => info!("SENSOR | mains power restored"),
            },
            AppEvent::SmsStarted { purpose, recipient } => {
                info!("SMS | {:?} message to {}", purpose, recipient);
            }
            AppEvent::SmsStep(step) => info!("SMS | -> {}", step.label()),
            AppEvent::SmsCompleted(purpose) => info!("SMS | {:?} message sent", purpose),
            AppEvent::SmsRefused { purpose, reason } => {
                warn!("SMS | {:?} message not sent: {:?}", purpose, reason);
            }
            AppEvent::Call(ev) => log_call(ev),
            AppEvent::CallRefused(reason) => warn!("CALL | refused: {:?}", reason),
            AppEvent::Script(ev) => match ev {
                ScriptEvent::Started(kind) => info!("SCRIPT | {} started", kind.label()),
                ScriptEvent::Finished(kind) => info!("SCRIPT | {} finished", kind.label()),
                ScriptEvent::Aborted(kind) => warn!("SCRIPT | {} aborted for alarm traffic", kind.label()),
            },
            AppEvent::ScriptRefused { kind, reason } => {
                warn!("SCRIPT | {} refused: {:?}", kind.label(), reason);
            }
            AppEvent::ModemReady => info!("MODEM | ready, alarm armed"),
            AppEvent::ModemLine(line) => info!("MODEM | {}", line),
            AppEvent::ConfigApplied => info!("CONFIG | update applied"),
            AppEvent::ConfigSaved => info!("CONFIG | saved"),
            AppEvent::ConfigRejected(msg) => warn!("CONFIG | rejected: {}", msg),
            AppEvent::Status(s) => log_status(s),
        }
    }
}

fn log_call(ev: &CallEvent) {
    match ev {
        CallEvent::Dialed { call_in_batch } => info!("CALL | dialing, call #{} of batch", call_in_batch),
        CallEvent::HungUp => info!("CALL | hung up"),
        CallEvent::CooldownExpired => info!("CALL | cooldown over, ready"),
        CallEvent::Dropped(DropReason::CallActive) => warn!("CALL | dropped: call already active"),
        CallEvent::Dropped(DropReason::BatchExhausted) => {
            warn!("CALL | dropped: batch limit reached, cooldown started");
        }
        CallEvent::Dropped(DropReason::CoolingDown { remaining_ms }) => {
            warn!("CALL | dropped: cooling down, {} s left", remaining_ms.div_ceil(1000));
        }
        CallEvent::Dropped(DropReason::CooldownJustExpired) => {
            warn!("CALL | dropped: cooldown just ended, next request will dial");
        }
    }
}

fn log_status(s: &StatusSnapshot) {
    info!(
        "STATUS | up={}s | mains={} | modem={} | sms={} (sent {}) | call={} {} | script={} | tx_err={}",
        s.uptime_secs,
        if s.power_lost { "LOST" } else { "OK" },
        if s.modem_ready { "ready" } else { "booting" },
        s.sms_step.label(),
        s.sms_completed,
        s.call_phase.label(),
        s.calls_in_batch,
        s.script.map_or("-", |k| k.label()),
        s.write_failures,
    );
}
