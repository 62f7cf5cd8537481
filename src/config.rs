//! System configuration parameters
//!
//! All tunable parameters for the PowerWatch alarm.
//! Values can be overridden via NVS (non-volatile storage) or at runtime
//! through [`AppCommand::UpdateConfig`](crate::app::commands::AppCommand).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Recipient phone number, e.g. `+84912345678`.
pub type PhoneNumber = heapless::String<24>;
/// SMS body.  160 characters is the single-segment GSM 7-bit limit.
pub type MessageText = heapless::String<160>;
/// Numeric network operator code (MCC+MNC), e.g. `45204`.
pub type OperatorCode = heapless::String<8>;

/// Core alarm configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmConfig {
    // --- Recipient ---
    /// Number that receives the SMS and the call.  Empty = unprovisioned.
    pub phone_number: PhoneNumber,
    /// SMS body sent on power loss and on every re-notify.
    pub alert_message: MessageText,
    /// SMS body for the optional start-up test message.
    pub test_message: MessageText,

    // --- Sensor ---
    /// Minimum spacing between raw samples of the mains sense input (ms)
    pub sample_interval_ms: u32,
    /// Re-notify period while power stays lost (ms)
    pub renotify_interval_ms: u32,

    // --- SMS settle ladder ---
    /// Settle time after `AT+CMGF=1` (ms)
    pub sms_mode_settle_ms: u32,
    /// Settle time after `AT+CMGS="<number>"` (ms)
    pub sms_recipient_settle_ms: u32,
    /// Settle time after the message body (ms)
    pub sms_body_settle_ms: u32,
    /// Settle time after the 0x1A terminator (ms)
    pub sms_terminator_settle_ms: u32,

    // --- Calls ---
    /// How long a dialed call is held before hang-up (ms)
    pub call_duration_ms: u32,
    /// Calls admitted per batch before the cooldown is enforced
    pub max_calls_per_batch: u8,
    /// Mandatory pause before a new batch may start (ms)
    pub call_cooldown_ms: u32,

    // --- Module ---
    /// Time the module needs after power-enable before it accepts AT commands (ms)
    pub module_boot_delay_ms: u32,
    /// Settle time between start-up probe commands (ms)
    pub probe_settle_ms: u32,
    /// Operator code for the manual-selection step of the reconnect script.
    /// Empty = automatic selection only.
    pub preferred_operator: OperatorCode,
    /// Send `test_message` once the module is ready.
    pub startup_test_sms: bool,

    // --- Timing ---
    /// Status heartbeat interval (seconds)
    pub status_interval_secs: u32,
    /// Idle yield between main-loop iterations (ms); keeps the RTOS idle task fed
    pub loop_yield_ms: u32,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            // Recipient (provisioned at build time or via NVS)
            phone_number: bounded(option_env!("POWERWATCH_PHONE").unwrap_or("")),
            alert_message: bounded("CANH BAO: Mat dien! Power lost at site."),
            test_message: bounded("PowerWatch online"),

            // Sensor
            sample_interval_ms: 100,    // 10 Hz
            renotify_interval_ms: 5000, // 5 s

            // SMS settle ladder
            sms_mode_settle_ms: 1000,
            sms_recipient_settle_ms: 2000,
            sms_body_settle_ms: 1000,
            sms_terminator_settle_ms: 500,

            // Calls
            call_duration_ms: 20_000,
            max_calls_per_batch: 3,
            call_cooldown_ms: 60_000,

            // Module
            module_boot_delay_ms: 8000,
            probe_settle_ms: 100,
            preferred_operator: OperatorCode::new(),
            startup_test_sms: false,

            // Timing
            status_interval_secs: 60,
            loop_yield_ms: 5,
        }
    }
}

impl AlarmConfig {
    /// Defaults with the given recipient and alert text, validated.
    pub fn with_recipient(phone: &str, message: &str) -> Result<Self> {
        let mut cfg = Self::default();
        cfg.phone_number = PhoneNumber::try_from(phone)
            .map_err(|_| Error::Config("phone_number too long"))?;
        cfg.alert_message = MessageText::try_from(message)
            .map_err(|_| Error::Config("alert_message longer than 160 characters"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `true` once a recipient number is configured.
    pub fn has_recipient(&self) -> bool {
        !self.phone_number.is_empty()
    }

    /// Full duration of one SMS job from `AT+CMGF=1` to completion (ms).
    pub fn sms_sequence_ms(&self) -> u32 {
        self.sms_mode_settle_ms
            + self.sms_recipient_settle_ms
            + self.sms_body_settle_ms
            + self.sms_terminator_settle_ms
    }

    /// Range-check every field.
    ///
    /// Invalid values are rejected, never clamped: a bad message or number
    /// would otherwise be injected verbatim into the module's command stream.
    pub fn validate(&self) -> Result<()> {
        if !self.phone_number.is_empty() && !is_dial_string(&self.phone_number) {
            return Err(Error::Config(
                "phone_number must be an optional '+' followed by 3-20 digits",
            ));
        }
        validate_message(&self.alert_message, "alert_message must be 1-160 printable ASCII chars")?;
        validate_message(&self.test_message, "test_message must be 1-160 printable ASCII chars")?;

        if !(10..=1000).contains(&self.sample_interval_ms) {
            return Err(Error::Config("sample_interval_ms must be 10-1000"));
        }
        if self.renotify_interval_ms <= self.sample_interval_ms
            || self.renotify_interval_ms > 3_600_000
        {
            return Err(Error::Config(
                "renotify_interval_ms must exceed sample_interval_ms and be <= 1h",
            ));
        }
        for settle in [
            self.sms_mode_settle_ms,
            self.sms_recipient_settle_ms,
            self.sms_body_settle_ms,
            self.sms_terminator_settle_ms,
        ] {
            if !(100..=30_000).contains(&settle) {
                return Err(Error::Config("SMS settle delays must be 100-30000 ms"));
            }
        }
        if !(1000..=300_000).contains(&self.call_duration_ms) {
            return Err(Error::Config("call_duration_ms must be 1000-300000"));
        }
        if !(1..=10).contains(&self.max_calls_per_batch) {
            return Err(Error::Config("max_calls_per_batch must be 1-10"));
        }
        if !(1000..=86_400_000).contains(&self.call_cooldown_ms) {
            return Err(Error::Config("call_cooldown_ms must be 1000-86400000"));
        }
        if self.module_boot_delay_ms > 60_000 {
            return Err(Error::Config("module_boot_delay_ms must be <= 60000"));
        }
        if !(10..=5000).contains(&self.probe_settle_ms) {
            return Err(Error::Config("probe_settle_ms must be 10-5000"));
        }
        let op = &self.preferred_operator;
        if !op.is_empty() && (!(5..=6).contains(&op.len()) || !op.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(Error::Config("preferred_operator must be empty or 5-6 digits"));
        }
        if !(5..=86_400).contains(&self.status_interval_secs) {
            return Err(Error::Config("status_interval_secs must be 5-86400"));
        }
        if self.loop_yield_ms > 50 {
            return Err(Error::Config("loop_yield_ms must be <= 50"));
        }
        Ok(())
    }
}

fn bounded<const N: usize>(s: &str) -> heapless::String<N> {
    heapless::String::try_from(s).unwrap_or_default()
}

fn is_dial_string(s: &str) -> bool {
    let digits = s.strip_prefix('+').unwrap_or(s);
    (3..=20).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}

pub(crate) fn validate_message(text: &str, err: &'static str) -> Result<()> {
    // 0x1A would terminate the SMS early; printable ASCII excludes it.
    if text.is_empty() || !is_printable_ascii(text) {
        return Err(Error::Config(err));
    }
    Ok(())
}

/// Returns `true` if every byte of `s` is in the printable ASCII range
/// `0x20..=0x7E` (space through tilde, inclusive).
fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}
