//! Call admission, cooldown, and call lifecycle.
//!
//! ```text
//!                request (calls < max)                 duration elapsed
//!   ┌──────► Ready ─────────────────────► CallActive ───────────────────┐
//!   │          │        dial ATD<n>;                      hang up ATH   │
//!   │          │ request (calls >= max)                                 │
//!   │          ▼                                                        │
//!   │      InCooldown ◄── requests dropped while cooling down           │
//!   │          │                                                        │
//!   └──────────┘ cooldown elapsed: calls_in_batch = 0     ◄─────────────┘
//! ```
//!
//! At most `max_calls_per_batch` calls are placed before a cooldown of
//! `call_cooldown_ms` is enforced.  Dropped requests are never queued.
//! The batch cap is evaluated on request only; finishing a call always
//! returns to `Ready`.

use crate::config::AlarmConfig;
use crate::modem::{AtCommand, CommandLink, Transport};
use crate::timing::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Ready,
    CallActive,
    InCooldown,
}

impl CallPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::CallActive => "CallActive",
            Self::InCooldown => "InCooldown",
        }
    }
}

/// Why a call request was not dialed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// A call is already in progress.
    CallActive,
    /// The batch cap was reached; cooldown starts now.
    BatchExhausted,
    /// Cooldown has not yet elapsed.
    CoolingDown { remaining_ms: u32 },
    /// Cooldown had just elapsed; the next request will be admitted.
    CooldownJustExpired,
}

/// Outcome of a request or a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEvent {
    /// A call was placed; `call_in_batch` is 1-based.
    Dialed { call_in_batch: u8 },
    /// Hold time elapsed and the call was hung up.
    HungUp,
    Dropped(DropReason),
    /// Cooldown finished; the batch counter is back to zero.
    CooldownExpired,
}

/// Batch accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallBatchState {
    pub calls_in_batch: u8,
    pub in_cooldown: bool,
    pub cooldown_start: Timestamp,
    pub batch_start: Timestamp,
}

/// The single in-flight call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallState {
    pub active: bool,
    pub start_time: Timestamp,
}

pub struct CallController {
    batch: CallBatchState,
    call: CallState,
    max_calls_per_batch: u8,
    call_duration_ms: u32,
    cooldown_ms: u32,
}

impl CallController {
    pub fn new(config: &AlarmConfig) -> Self {
        Self {
            batch: CallBatchState {
                calls_in_batch: 0,
                in_cooldown: false,
                cooldown_start: Timestamp::ZERO,
                batch_start: Timestamp::ZERO,
            },
            call: CallState {
                active: false,
                start_time: Timestamp::ZERO,
            },
            max_calls_per_batch: config.max_calls_per_batch,
            call_duration_ms: config.call_duration_ms,
            cooldown_ms: config.call_cooldown_ms,
        }
    }

    pub fn phase(&self) -> CallPhase {
        if self.call.active {
            CallPhase::CallActive
        } else if self.batch.in_cooldown {
            CallPhase::InCooldown
        } else {
            CallPhase::Ready
        }
    }

    /// Ask for a call to `number`.  Either dials or drops the request.
    pub fn request_call<T: Transport>(
        &mut self,
        now: Timestamp,
        number: &str,
        link: &mut CommandLink<T>,
    ) -> CallEvent {
        match self.phase() {
            CallPhase::CallActive => {
                log::warn!("call: request dropped, call already active");
                CallEvent::Dropped(DropReason::CallActive)
            }
            CallPhase::InCooldown => {
                if self.expire_cooldown(now) {
                    log::warn!("call: request dropped, cooldown just expired; next request admitted");
                    return CallEvent::Dropped(DropReason::CooldownJustExpired);
                }
                let remaining_ms = self
                    .cooldown_ms
                    .saturating_sub(now.elapsed_since(self.batch.cooldown_start));
                log::warn!("call: request dropped, cooldown {} s remaining", remaining_ms.div_ceil(1000));
                CallEvent::Dropped(DropReason::CoolingDown { remaining_ms })
            }
            CallPhase::Ready if self.batch.calls_in_batch >= self.max_calls_per_batch => {
                self.batch.in_cooldown = true;
                self.batch.cooldown_start = now;
                log::warn!(
                    "call: batch of {} calls exhausted, cooling down for {} s",
                    self.batch.calls_in_batch,
                    self.cooldown_ms / 1000
                );
                CallEvent::Dropped(DropReason::BatchExhausted)
            }
            CallPhase::Ready => {
                if self.batch.calls_in_batch == 0 {
                    self.batch.batch_start = now;
                }
                self.batch.calls_in_batch += 1;
                self.call = CallState {
                    active: true,
                    start_time: now,
                };
                link.send(AtCommand::Dial { number });
                log::info!(
                    "call: dialing {} ({}/{})",
                    number,
                    self.batch.calls_in_batch,
                    self.max_calls_per_batch
                );
                CallEvent::Dialed {
                    call_in_batch: self.batch.calls_in_batch,
                }
            }
        }
    }

    /// Hang up a call whose hold time has elapsed, or end an expired cooldown.
    pub fn tick<T: Transport>(&mut self, now: Timestamp, link: &mut CommandLink<T>) -> Option<CallEvent> {
        match self.phase() {
            CallPhase::CallActive if now.has_elapsed(self.call.start_time, self.call_duration_ms) => {
                link.send(AtCommand::HangUp);
                self.call.active = false;
                log::info!("call: hung up after {} ms", now.elapsed_since(self.call.start_time));
                Some(CallEvent::HungUp)
            }
            CallPhase::InCooldown if self.expire_cooldown(now) => Some(CallEvent::CooldownExpired),
            _ => None,
        }
    }

    fn expire_cooldown(&mut self, now: Timestamp) -> bool {
        if !now.has_elapsed(self.batch.cooldown_start, self.cooldown_ms) {
            return false;
        }
        self.batch.in_cooldown = false;
        self.batch.calls_in_batch = 0;
        log::info!("call: cooldown over, batch reset");
        true
    }

    pub fn batch(&self) -> &CallBatchState {
        &self.batch
    }

    pub fn call(&self) -> &CallState {
        &self.call
    }

    pub fn is_active(&self) -> bool {
        self.call.active
    }

    /// Apply new limits.  An active call keeps its original start time.
    ///
    /// Lowering the cap below the calls already placed clamps the counter,
    /// so the next request exhausts the batch and starts the cooldown.
    pub fn reconfigure(&mut self, config: &AlarmConfig) {
        self.max_calls_per_batch = config.max_calls_per_batch;
        self.call_duration_ms = config.call_duration_ms;
        self.cooldown_ms = config.call_cooldown_ms;
        if self.batch.calls_in_batch > self.max_calls_per_batch {
            log::info!(
                "call: batch cap lowered to {}, clamping {} placed calls",
                self.max_calls_per_batch,
                self.batch.calls_in_batch
            );
            self.batch.calls_in_batch = self.max_calls_per_batch;
        }
    }
}
