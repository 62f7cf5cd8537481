//! Maintenance scripts: fixed command sequences with per-step settle times.
//!
//! A script writes its first command on `start` and each following command
//! once the previous one has settled, exactly like the SMS ladder.  Replies
//! show up as `ModemLine` events through the normal transport drain; the
//! script itself never reads them.
//!
//! | Script           | Steps                                                     |
//! |------------------|-----------------------------------------------------------|
//! | `StartupProbe`   | AT, ATI, CPIN?, CSQ, CIMI (probe settle each)             |
//! | `NetworkStatus`  | CREG=2 (500 ms), CREG?, CSQ, COPS?, CFUN? (1 s each)       |
//! | `Reconnect`      | CFUN=0 (3 s), CFUN=1 (5 s), CREG=2 (1 s), COPS=0 (15 s), [COPS=1,2,op (10 s)], status steps |
//! | `SimDiagnostics` | CPIN?, CIMI, CCID (1 s each), COPS=? (15 s)               |

use crate::config::{AlarmConfig, OperatorCode};
use crate::modem::{AtCommand, CommandLink, Transport};
use crate::timing::Timestamp;

const MAX_STEPS: usize = 12;

/// The config values a script plan depends on, captured when it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptParams {
    pub probe_settle_ms: u32,
    pub preferred_operator: OperatorCode,
}

impl ScriptParams {
    pub fn from_config(config: &AlarmConfig) -> Self {
        Self {
            probe_settle_ms: config.probe_settle_ms,
            preferred_operator: config.preferred_operator.clone(),
        }
    }
}

type Plan<'a> = heapless::Vec<(AtCommand<'a>, u32), MAX_STEPS>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ScriptKind {
    StartupProbe,
    NetworkStatus,
    Reconnect,
    SimDiagnostics,
}

impl ScriptKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::StartupProbe => "startup-probe",
            Self::NetworkStatus => "network-status",
            Self::Reconnect => "reconnect",
            Self::SimDiagnostics => "sim-diagnostics",
        }
    }

    /// Commands and their settle times for this script.
    pub fn plan(self, params: &ScriptParams) -> Plan<'_> {
        use AtCommand as C;
        let mut plan = Plan::new();
        let mut push = |cmd, settle_ms| {
            // MAX_STEPS covers the longest script.
            let _ = plan.push((cmd, settle_ms));
        };
        match self {
            Self::StartupProbe => {
                for cmd in [C::Attention, C::Identify, C::SimStatus, C::SignalQuality, C::Imsi] {
                    push(cmd, params.probe_settle_ms);
                }
            }
            Self::NetworkStatus => push_status_steps(&mut push),
            Self::Reconnect => {
                push(C::SetFunctionality(0), 3000);
                push(C::SetFunctionality(1), 5000);
                push(C::SetRegistrationReport(2), 1000);
                push(C::AutoOperator, 15_000);
                if !params.preferred_operator.is_empty() {
                    push(C::ManualOperator { code: &params.preferred_operator }, 10_000);
                }
                push_status_steps(&mut push);
            }
            Self::SimDiagnostics => {
                push(C::SimStatus, 1000);
                push(C::Imsi, 1000);
                push(C::Iccid, 1000);
                push(C::ScanOperators, 15_000);
            }
        }
        plan
    }
}

fn push_status_steps<'a>(push: &mut impl FnMut(AtCommand<'a>, u32)) {
    push(AtCommand::SetRegistrationReport(2), 500);
    push(AtCommand::QueryRegistration, 1000);
    push(AtCommand::SignalQuality, 1000);
    push(AtCommand::QueryOperator, 1000);
    push(AtCommand::QueryFunctionality, 1000);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptEvent {
    Started(ScriptKind),
    Finished(ScriptKind),
    Aborted(ScriptKind),
}

#[derive(Debug, Clone)]
struct Running {
    kind: ScriptKind,
    index: usize,
    step_start: Timestamp,
    /// Frozen at start so a config update cannot shift the remaining steps.
    params: ScriptParams,
}

/// Runs at most one script at a time.
#[derive(Default)]
pub struct ScriptRunner {
    running: Option<Running>,
}

impl ScriptRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `kind`, writing its first command now.  Refused if another
    /// script is running.
    pub fn start<T: Transport>(
        &mut self,
        kind: ScriptKind,
        now: Timestamp,
        config: &AlarmConfig,
        link: &mut CommandLink<T>,
    ) -> Option<ScriptEvent> {
        if let Some(r) = &self.running {
            log::warn!("script: {} refused, {} still running", kind.label(), r.kind.label());
            return None;
        }
        let params = ScriptParams::from_config(config);
        let plan = kind.plan(&params);
        let (first, _) = plan.first()?;
        link.send(first);
        log::info!("script: {} started ({} steps)", kind.label(), plan.len());
        drop(plan);
        self.running = Some(Running {
            kind,
            index: 0,
            step_start: now,
            params,
        });
        Some(ScriptEvent::Started(kind))
    }

    /// Issue the next command once the current one has settled.
    pub fn tick<T: Transport>(&mut self, now: Timestamp, link: &mut CommandLink<T>) -> Option<ScriptEvent> {
        let r = self.running.as_mut()?;
        let kind = r.kind;
        let plan = kind.plan(&r.params);
        let settle = plan.get(r.index).map_or(0, |(_, ms)| *ms);
        if !now.has_elapsed(r.step_start, settle) {
            return None;
        }
        let next = r.index + 1;
        let Some((cmd, _)) = plan.get(next) else {
            drop(plan);
            self.running = None;
            log::info!("script: {} finished", kind.label());
            return Some(ScriptEvent::Finished(kind));
        };
        link.send(cmd);
        drop(plan);
        r.index = next;
        r.step_start = now;
        None
    }

    /// Stop the running script without sending anything further.
    pub fn abort(&mut self) -> Option<ScriptEvent> {
        let r = self.running.take()?;
        log::warn!("script: {} aborted at step {}", r.kind.label(), r.index + 1);
        Some(ScriptEvent::Aborted(r.kind))
    }

    pub fn running(&self) -> Option<ScriptKind> {
        self.running.as_ref().map(|r| r.kind)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}
