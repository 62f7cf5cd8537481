//! AppService lifecycle: module boot, command handling, persistence,
//! and the status heartbeat, all against the mocks in `mock_hw`.

use powerwatch::alarm::{CallEvent, CallPhase};
use powerwatch::app::commands::AppCommand;
use powerwatch::app::events::{AppEvent, Refusal, SmsPurpose};
use powerwatch::app::ports::ConfigPort;
use powerwatch::app::service::{AppService, BootPhase};
use powerwatch::config::{AlarmConfig, MessageText};
use powerwatch::modem::ScriptKind;
use powerwatch::modem::script::ScriptEvent;
use powerwatch::sensors::SensorEvent;

use crate::mock_hw::{MemConfigStore, MockBoard, MockModem, RecordingSink, ms, provisioned_config};

struct Rig {
    app: AppService<MockModem>,
    board: MockBoard,
    sink: RecordingSink,
    store: MemConfigStore,
    now: u32,
}

impl Rig {
    fn started(config: AlarmConfig) -> Self {
        let mut board = MockBoard::default();
        let mut sink = RecordingSink::default();
        let mut app = AppService::new(config, MockModem::default(), &mut board, ms(0));
        app.start(ms(0), &mut board, &mut sink);
        Self {
            app,
            board,
            sink,
            store: MemConfigStore::default(),
            now: 0,
        }
    }

    /// Main-loop body every 10 ms up to and including `end`.
    fn run_until(&mut self, end: u32) {
        while self.now < end {
            self.now += 10;
            let now = ms(self.now);
            self.app.scheduler_mut().transport_mut().now_ms = self.now;
            self.app.tick(now, &mut self.board, &mut self.sink);
            self.app.auto_save_if_needed(now, &self.store, &mut self.sink);
        }
    }

    fn command(&mut self, cmd: AppCommand) {
        self.app.handle_command(cmd, ms(self.now), &mut self.sink);
    }

    fn modem(&self) -> &MockModem {
        self.app.scheduler().transport()
    }
}

// ── Boot ─────────────────────────────────────────────────────

#[test]
fn start_powers_module_and_waits_for_boot_delay() {
    let mut rig = Rig::started(provisioned_config());
    assert!(rig.board.module_on);
    assert!(!rig.board.ready_led);
    assert_eq!(rig.sink.events[0], AppEvent::Started { boot_delay_ms: 8000 });

    rig.run_until(7_990);
    assert!(rig.modem().writes.is_empty());
    assert!(matches!(rig.app.boot_phase(), BootPhase::PoweringUp { .. }));
}

#[test]
fn probe_runs_then_module_is_ready() {
    let mut rig = Rig::started(provisioned_config());
    rig.run_until(8_600);

    assert_eq!(
        rig.modem().lines(),
        vec!["AT", "ATI", "AT+CPIN?", "AT+CSQ", "AT+CIMI"]
    );
    assert_eq!(rig.modem().first_at("AT").unwrap(), 8_000);
    assert!(rig.sink.contains(&AppEvent::Script(ScriptEvent::Finished(ScriptKind::StartupProbe))));
    assert!(rig.sink.contains(&AppEvent::ModemReady));
    assert_eq!(rig.app.boot_phase(), BootPhase::Ready);
    assert!(rig.board.ready_led);
}

#[test]
fn startup_test_sms_sent_once_ready() {
    let cfg = AlarmConfig {
        startup_test_sms: true,
        ..provisioned_config()
    };
    let mut rig = Rig::started(cfg);
    rig.run_until(14_000);

    assert!(rig.modem().lines().contains(&"PowerWatch online".to_string()));
    assert!(rig.sink.contains(&AppEvent::SmsCompleted(SmsPurpose::Test)));
    // A test message never dials.
    assert_eq!(rig.modem().count_prefix("ATD"), 0);
}

#[test]
fn loss_during_boot_alarms_after_ready() {
    let mut rig = Rig::started(provisioned_config());
    rig.run_until(990);
    rig.board.lost = true;
    rig.run_until(20_000);

    assert!(rig.sink.contains(&AppEvent::SmsRefused {
        purpose: SmsPurpose::Alert,
        reason: Refusal::ModemNotReady,
    }));
    // PowerLost at 1000, refused re-notify at 6100, first deliverable at 11200.
    assert_eq!(rig.modem().first_at("AT+CMGF"), Some(11_200));
    assert!(rig.sink.contains(&AppEvent::Call(CallEvent::Dialed { call_in_batch: 1 })));
    assert_eq!(rig.sink.count(|e| *e == AppEvent::Sensor(SensorEvent::PowerLost)), 1);
}

// ── Commands ─────────────────────────────────────────────────

#[test]
fn commands_refused_before_ready() {
    let mut rig = Rig::started(provisioned_config());
    rig.command(AppCommand::SendAlert);
    rig.command(AppCommand::RequestCall);
    rig.command(AppCommand::RunScript(ScriptKind::Reconnect));

    assert!(rig.sink.contains(&AppEvent::SmsRefused {
        purpose: SmsPurpose::Alert,
        reason: Refusal::ModemNotReady,
    }));
    assert!(rig.sink.contains(&AppEvent::CallRefused(Refusal::ModemNotReady)));
    assert!(rig.sink.contains(&AppEvent::ScriptRefused {
        kind: ScriptKind::Reconnect,
        reason: Refusal::ModemNotReady,
    }));
    assert!(rig.modem().writes.is_empty());
}

#[test]
fn manual_sms_and_call_after_ready() {
    let mut rig = Rig::started(provisioned_config());
    rig.run_until(8_600);
    let text = MessageText::try_from("Generator test").unwrap();
    rig.command(AppCommand::SendSms(text));
    rig.run_until(13_200);
    assert!(rig.sink.contains(&AppEvent::SmsCompleted(SmsPurpose::Manual)));
    assert_eq!(rig.app.scheduler().calls().phase(), CallPhase::Ready);

    rig.command(AppCommand::RequestCall);
    assert_eq!(rig.app.scheduler().calls().phase(), CallPhase::CallActive);
    assert_eq!(rig.modem().count_prefix("ATD"), 1);
}

#[test]
fn manual_sms_with_control_bytes_never_reaches_module() {
    let mut rig = Rig::started(provisioned_config());
    rig.run_until(8_600);
    let writes = rig.modem().writes.len();

    let text = MessageText::try_from("ok\x1aATD+1900;").unwrap();
    rig.command(AppCommand::SendSms(text));
    rig.run_until(30_000);

    assert!(rig.sink.contains(&AppEvent::SmsRefused {
        purpose: SmsPurpose::Manual,
        reason: Refusal::InvalidText,
    }));
    assert_eq!(rig.modem().writes.len(), writes);
    assert_eq!(rig.modem().count_prefix("ATD"), 0);
}

// ── Configuration ────────────────────────────────────────────

#[test]
fn config_update_auto_saves_after_quiet_period() {
    let mut rig = Rig::started(provisioned_config());
    rig.run_until(1_000);
    let cfg = AlarmConfig {
        call_cooldown_ms: 120_000,
        ..rig.app.current_config()
    };
    rig.command(AppCommand::UpdateConfig(cfg));
    assert!(rig.sink.contains(&AppEvent::ConfigApplied));
    assert!(rig.app.is_config_dirty());

    rig.run_until(5_990);
    assert_eq!(rig.store.saves.get(), 0);
    rig.run_until(6_000);
    assert_eq!(rig.store.saves.get(), 1);
    assert!(!rig.app.is_config_dirty());
    assert_eq!(rig.store.load().unwrap().call_cooldown_ms, 120_000);
    assert!(rig.sink.contains(&AppEvent::ConfigSaved));
}

#[test]
fn explicit_save_flushes_on_next_check() {
    let mut rig = Rig::started(provisioned_config());
    rig.command(AppCommand::SaveConfig);
    rig.run_until(10);
    assert_eq!(rig.store.saves.get(), 1);
}

#[test]
fn failed_save_stays_dirty_and_retries() {
    let mut rig = Rig::started(provisioned_config());
    rig.store.fail.set(true);
    rig.command(AppCommand::SaveConfig);
    rig.run_until(10);
    assert!(rig.app.is_config_dirty());
    assert!(!rig.sink.contains(&AppEvent::ConfigSaved));

    rig.store.fail.set(false);
    rig.run_until(5_000);
    assert_eq!(rig.store.saves.get(), 0);
    rig.run_until(5_010);
    assert_eq!(rig.store.saves.get(), 1);
    assert!(!rig.app.is_config_dirty());
}

#[test]
fn invalid_update_keeps_running_config() {
    let mut rig = Rig::started(provisioned_config());
    let bad = AlarmConfig {
        sample_interval_ms: 5,
        ..rig.app.current_config()
    };
    rig.command(AppCommand::UpdateConfig(bad));
    assert!(matches!(rig.sink.events.last(), Some(AppEvent::ConfigRejected(_))));
    assert_eq!(rig.app.current_config().sample_interval_ms, 100);
    assert!(!rig.app.is_config_dirty());
}

// ── Heartbeat ────────────────────────────────────────────────

#[test]
fn status_heartbeat_reports_snapshot() {
    let mut rig = Rig::started(provisioned_config());
    rig.run_until(60_000);

    let statuses: Vec<_> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Status(s) => Some(*s),
            _ => None,
        })
        .collect();
    assert_eq!(statuses.len(), 1);
    let s = statuses[0];
    assert_eq!(s.uptime_secs, 60);
    assert!(s.modem_ready);
    assert!(!s.power_lost);
    assert_eq!(s.call_phase, CallPhase::Ready);
    assert_eq!(s.script, None);
    assert_eq!(rig.app.tick_count(), 6_000);
}
