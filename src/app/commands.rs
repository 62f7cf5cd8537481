//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (a serial
//! console, a future remote channel) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.
//! Every command goes through the same guards as the automatic alarm
//! path: recipient configured, module ready, call admission.

use crate::config::{AlarmConfig, MessageText};
use crate::modem::ScriptKind;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Send the configured alert SMS now (followed by a call, like a real alarm).
    SendAlert,

    /// Send an arbitrary text to the configured recipient.  No call follows.
    SendSms(MessageText),

    /// Ask the call controller for a call (subject to batch/cooldown).
    RequestCall,

    /// Run a maintenance script.
    RunScript(ScriptKind),

    /// Hot-reload configuration.  Validated before it is applied.
    UpdateConfig(AlarmConfig),

    /// Explicitly persist the current config to NVS immediately.
    SaveConfig,
}
