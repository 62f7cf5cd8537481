//! Outbound application events.
//!
//! The [`Scheduler`](crate::scheduler::Scheduler) and
//! [`AppService`](super::service::AppService) emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Together they form the
//! operator-visible log: every state transition, every dropped call, and
//! every line the module sends back.

use crate::alarm::{CallEvent, CallPhase, SmsStep};
use crate::config::PhoneNumber;
use crate::modem::script::{ScriptEvent, ScriptKind};
use crate::sensors::SensorEvent;

/// One inbound line from the module, control bytes masked.
pub type ModemLine = heapless::String<128>;

/// What an SMS job was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsPurpose {
    /// Power-loss alert; completion chains into a call request.
    Alert,
    /// Start-up self test.
    Test,
    /// Operator-requested text.
    Manual,
}

/// Why an SMS or call was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// The module has not finished its start-up probe.
    ModemNotReady,
    /// No recipient number is configured.
    NoRecipient,
    /// A call or SMS owns the transport (scripts only).
    AlarmActive,
    /// Another script is still running.
    ScriptBusy,
    /// Message text is empty or contains non-printable bytes.
    InvalidText,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started; the module is powering up.
    Started { boot_delay_ms: u32 },

    /// Debounced mains sensor transition.
    Sensor(SensorEvent),

    /// An SMS job began (mode-set already written).
    SmsStarted { purpose: SmsPurpose, recipient: PhoneNumber },
    /// The SMS job entered a new step.
    SmsStep(SmsStep),
    /// The SMS job finished.
    SmsCompleted(SmsPurpose),
    /// An SMS was not started.
    SmsRefused { purpose: SmsPurpose, reason: Refusal },

    /// Call controller outcome (dial, hang-up, drop, cooldown end).
    Call(CallEvent),
    /// A call request was refused before reaching admission control.
    CallRefused(Refusal),

    /// A maintenance script started, finished, or was aborted.
    Script(ScriptEvent),
    /// A script was refused.
    ScriptRefused { kind: ScriptKind, reason: Refusal },

    /// The start-up probe finished; alarms are armed.
    ModemReady,
    /// A line received from the module.
    ModemLine(ModemLine),

    /// New configuration validated and applied.
    ConfigApplied,
    /// Configuration written to NVS.
    ConfigSaved,
    /// A config update or save was rejected.
    ConfigRejected(&'static str),

    /// Periodic heartbeat.
    Status(StatusSnapshot),
}

/// A point-in-time view of the alarm, suitable for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub uptime_secs: u32,
    pub power_lost: bool,
    pub modem_ready: bool,
    pub sms_step: SmsStep,
    pub sms_completed: u32,
    pub call_phase: CallPhase,
    pub calls_in_batch: u8,
    pub script: Option<ScriptKind>,
    pub write_failures: u32,
}
