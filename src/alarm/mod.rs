//! Alarm delivery: the SMS sequencer and the call admission controller.
//!
//! Both are timer-driven state machines advanced by the
//! [`Scheduler`](crate::scheduler::Scheduler) once per tick.  Neither ever
//! waits on the module; each stores the time it entered its current state
//! and compares against the tick's `now`.

pub mod call;
pub mod sms;

pub use call::{CallController, CallEvent, CallPhase, DropReason};
pub use sms::{SmsEvent, SmsSequencer, SmsStep};
