//! Non-blocking SMS sequencer.
//!
//! One SMS is a fixed ladder of writes, each followed by a settle time
//! that lets the module digest the command.  The settle times are not
//! reply timeouts; nothing is read back.
//!
//! ```text
//!  start()        mode settle      recipient settle   body settle   terminator settle
//!  Idle ─► ModeSet ──────────► RecipientSet ───────► BodySent ──► Terminated ──► Idle
//!        AT+CMGF=1          AT+CMGS="<n>"          <body>      0x1A         Completed
//! ```
//!
//! The entry action of each state is performed on the transition into it,
//! so `start()` writes `AT+CMGF=1` immediately.  `tick()` advances at most
//! one step.

use crate::config::{AlarmConfig, MessageText, PhoneNumber};
use crate::modem::at::{AtCommand, SMS_TERMINATOR};
use crate::modem::{CommandLink, Transport};
use crate::timing::Timestamp;

/// Position in the SMS ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsStep {
    Idle,
    ModeSet,
    RecipientSet,
    BodySent,
    Terminated,
}

impl SmsStep {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::ModeSet => "ModeSet",
            Self::RecipientSet => "RecipientSet",
            Self::BodySent => "BodySent",
            Self::Terminated => "Terminated",
        }
    }
}

/// Transitions reported by [`SmsSequencer::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsEvent {
    /// Entered the given step and performed its write.
    Advanced(SmsStep),
    /// The terminator has settled; the job is finished.
    Completed,
}

/// The one in-flight SMS.
#[derive(Debug, Clone)]
pub struct SmsJob {
    pub step: SmsStep,
    pub step_start: Timestamp,
    pub recipient: PhoneNumber,
    pub body: MessageText,
}

#[derive(Debug, Clone, Copy)]
struct SettleTimes {
    mode_ms: u32,
    recipient_ms: u32,
    body_ms: u32,
    terminator_ms: u32,
}

impl SettleTimes {
    fn from_config(config: &AlarmConfig) -> Self {
        Self {
            mode_ms: config.sms_mode_settle_ms,
            recipient_ms: config.sms_recipient_settle_ms,
            body_ms: config.sms_body_settle_ms,
            terminator_ms: config.sms_terminator_settle_ms,
        }
    }
}

pub struct SmsSequencer {
    job: SmsJob,
    settle: SettleTimes,
    completed: u32,
}

impl SmsSequencer {
    pub fn new(config: &AlarmConfig) -> Self {
        Self {
            job: SmsJob {
                step: SmsStep::Idle,
                step_start: Timestamp::ZERO,
                recipient: PhoneNumber::new(),
                body: MessageText::new(),
            },
            settle: SettleTimes::from_config(config),
            completed: 0,
        }
    }

    /// Begin sending `body` to `recipient`.
    ///
    /// Returns `false` without writing anything if a job is already in
    /// flight or the arguments do not fit.
    pub fn start<T: Transport>(
        &mut self,
        now: Timestamp,
        recipient: &str,
        body: &str,
        link: &mut CommandLink<T>,
    ) -> bool {
        if self.is_active() {
            log::debug!("sms: start ignored, job in {}", self.job.step.label());
            return false;
        }
        let (Ok(recipient), Ok(body)) = (PhoneNumber::try_from(recipient), MessageText::try_from(body))
        else {
            log::warn!("sms: recipient or body exceeds capacity, not sent");
            return false;
        };
        self.job.recipient = recipient;
        self.job.body = body;
        log::info!("sms: sending to {}", self.job.recipient);
        self.enter(SmsStep::ModeSet, now, link);
        true
    }

    /// Advance at most one step if the current step has settled.
    pub fn tick<T: Transport>(&mut self, now: Timestamp, link: &mut CommandLink<T>) -> Option<SmsEvent> {
        let (settle, next) = match self.job.step {
            SmsStep::Idle => return None,
            SmsStep::ModeSet => (self.settle.mode_ms, SmsStep::RecipientSet),
            SmsStep::RecipientSet => (self.settle.recipient_ms, SmsStep::BodySent),
            SmsStep::BodySent => (self.settle.body_ms, SmsStep::Terminated),
            SmsStep::Terminated => (self.settle.terminator_ms, SmsStep::Idle),
        };
        if !now.has_elapsed(self.job.step_start, settle) {
            return None;
        }
        self.enter(next, now, link);
        if next == SmsStep::Idle {
            self.completed = self.completed.wrapping_add(1);
            log::info!("sms: sequence complete");
            Some(SmsEvent::Completed)
        } else {
            Some(SmsEvent::Advanced(next))
        }
    }

    fn enter<T: Transport>(&mut self, step: SmsStep, now: Timestamp, link: &mut CommandLink<T>) {
        match step {
            SmsStep::Idle => {}
            SmsStep::ModeSet => link.send(AtCommand::SmsTextMode),
            SmsStep::RecipientSet => link.send(AtCommand::SmsSend { recipient: &self.job.recipient }),
            SmsStep::BodySent => link.send(self.job.body.as_str()),
            SmsStep::Terminated => link.send_raw(SMS_TERMINATOR),
        }
        log::debug!("sms: {} -> {}", self.job.step.label(), step.label());
        self.job.step = step;
        self.job.step_start = now;
    }

    pub fn is_active(&self) -> bool {
        self.job.step != SmsStep::Idle
    }

    pub fn step(&self) -> SmsStep {
        self.job.step
    }

    pub fn job(&self) -> &SmsJob {
        &self.job
    }

    /// Jobs completed since start-up.
    pub fn completed(&self) -> u32 {
        self.completed
    }

    /// Apply new settle times.  An in-flight job picks them up from its
    /// next step on.
    pub fn reconfigure(&mut self, config: &AlarmConfig) {
        self.settle = SettleTimes::from_config(config);
    }
}
