//! Scheduler scenarios: sensor edge → SMS ladder → call admission.
//!
//! The modem is marked ready up front so these tests exercise the alarm
//! pipeline only; boot sequencing is covered in `app_service_tests`.

use powerwatch::alarm::{CallEvent, CallPhase, DropReason, SmsStep};
use powerwatch::app::events::{AppEvent, ModemLine, Refusal, SmsPurpose};
use powerwatch::config::{AlarmConfig, PhoneNumber};
use powerwatch::modem::ScriptKind;
use powerwatch::modem::script::ScriptEvent;
use powerwatch::scheduler::Scheduler;
use powerwatch::sensors::SensorEvent;

use crate::mock_hw::{ALERT, MockBoard, MockModem, PHONE, RecordingSink, ms, provisioned_config};

struct Rig {
    sched: Scheduler<MockModem>,
    board: MockBoard,
    sink: RecordingSink,
    now: u32,
}

impl Rig {
    fn new(config: AlarmConfig) -> Self {
        let mut board = MockBoard::default();
        let mut sched = Scheduler::new(config, MockModem::default(), &mut board, ms(0));
        sched.set_modem_ready(true);
        Self {
            sched,
            board,
            sink: RecordingSink::default(),
            now: 0,
        }
    }

    /// Tick every 10 ms up to and including `end`.
    fn run_until(&mut self, end: u32) {
        while self.now < end {
            self.now += 10;
            self.sched.transport_mut().now_ms = self.now;
            self.sched.tick(ms(self.now), &mut self.board, &mut self.sink);
        }
    }

    fn modem(&self) -> &MockModem {
        self.sched.transport()
    }

    fn dialed(&self) -> Vec<u8> {
        self.sink
            .events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Call(CallEvent::Dialed { call_in_batch }) => Some(*call_in_batch),
                _ => None,
            })
            .collect()
    }
}

#[test]
fn loss_edge_sends_sms_then_dials() {
    // Samples at 100, 200, 300 read present; the 4th at 400 reads lost.
    let mut rig = Rig::new(provisioned_config());
    rig.run_until(390);
    assert!(rig.sink.events.is_empty());
    assert_eq!(rig.board.sense_reads, 4);

    rig.board.lost = true;
    rig.run_until(400);
    assert_eq!(rig.sink.events[0], AppEvent::Sensor(SensorEvent::PowerLost));
    assert_eq!(rig.sched.sms().step(), SmsStep::ModeSet);
    assert_eq!(rig.modem().first_at("AT+CMGF"), Some(400));

    rig.run_until(4_890);
    assert!(rig.dialed().is_empty());
    rig.run_until(4_900);
    assert_eq!(rig.sched.sms().step(), SmsStep::Idle);
    assert_eq!(rig.dialed(), vec![1]);

    let expected_cmgs = format!("AT+CMGS=\"{PHONE}\"");
    let dial = format!("ATD{PHONE};");
    assert_eq!(
        rig.modem().lines(),
        vec!["AT+CMGF=1", expected_cmgs.as_str(), ALERT, "<SUB>", dial.as_str()]
    );
}

#[test]
fn sms_ladder_respects_settle_times() {
    let mut rig = Rig::new(provisioned_config());
    rig.board.lost = true;
    rig.run_until(5_000);

    let m = rig.modem();
    let mode = m.first_at("AT+CMGF").unwrap();
    let recipient = m.first_at("AT+CMGS").unwrap();
    let body = m.first_at(ALERT).unwrap();
    let sub = m.first_at("<SUB>").unwrap();
    let dial = m.first_at("ATD").unwrap();
    assert!(recipient - mode >= 1_000);
    assert!(body - recipient >= 2_000);
    assert!(sub - body >= 1_000);
    assert!(dial - sub >= 500);
}

#[test]
fn restore_reported_without_cancelling_alarm() {
    let mut rig = Rig::new(provisioned_config());
    rig.board.lost = true;
    rig.run_until(100);
    rig.board.lost = false;
    rig.run_until(200);

    assert!(rig.sink.contains(&AppEvent::Sensor(SensorEvent::PowerRestored)));
    assert!(rig.sched.sms().is_active());
    rig.run_until(4_600);
    assert!(rig.sink.contains(&AppEvent::SmsCompleted(SmsPurpose::Alert)));
    assert_eq!(rig.dialed(), vec![1]);
}

#[test]
fn sustained_loss_renotifies_and_respects_batch_cap() {
    let mut rig = Rig::new(provisioned_config());
    rig.board.lost = true;
    rig.run_until(150_000);

    let still_lost = rig.sink.count(|e| *e == AppEvent::Sensor(SensorEvent::StillLost));
    assert!(still_lost >= 25, "re-notify every ~5 s, got {still_lost}");

    // Three calls, a forced cooldown, then a fresh batch.
    let dialed = rig.dialed();
    assert_eq!(&dialed[..3], &[1, 2, 3]);
    assert!(rig.sink.contains(&AppEvent::Call(CallEvent::Dropped(DropReason::BatchExhausted))));
    assert!(rig.sink.contains(&AppEvent::Call(CallEvent::CooldownExpired)));
    assert!(dialed.len() <= 4);

    // Never two dials without a hang-up between them.
    let mut active = false;
    for line in rig.modem().lines() {
        if line.starts_with("ATD") {
            assert!(!active, "dialed while a call was active");
            active = true;
        } else if line == "ATH" {
            active = false;
        }
    }
}

#[test]
fn cooldown_blocks_calls_until_expired() {
    let cfg = AlarmConfig {
        max_calls_per_batch: 1,
        call_duration_ms: 1_000,
        call_cooldown_ms: 30_000,
        ..provisioned_config()
    };
    let mut rig = Rig::new(cfg);
    rig.sched.request_call(ms(0), &mut rig.sink);
    rig.run_until(2_000);
    assert_eq!(rig.sched.calls().phase(), CallPhase::Ready);

    rig.sched.request_call(ms(rig.now), &mut rig.sink);
    assert_eq!(rig.sched.calls().phase(), CallPhase::InCooldown);

    rig.sched.request_call(ms(rig.now + 10), &mut rig.sink);
    assert!(matches!(
        rig.sink.events.last(),
        Some(AppEvent::Call(CallEvent::Dropped(DropReason::CoolingDown { remaining_ms })))
            if *remaining_ms > 29_000
    ));

    rig.run_until(32_000);
    assert_eq!(rig.sched.calls().phase(), CallPhase::Ready);
    assert_eq!(rig.sched.calls().batch().calls_in_batch, 0);
    rig.sched.request_call(ms(rig.now), &mut rig.sink);
    assert_eq!(rig.dialed(), vec![1, 1]);
    assert_eq!(rig.modem().count_prefix("ATD"), 2);
}

#[test]
fn fourth_request_starts_cooldown_and_later_request_is_admitted() {
    let mut rig = Rig::new(provisioned_config());
    for n in 1..=3u32 {
        rig.sched.request_call(ms(rig.now), &mut rig.sink);
        rig.run_until(n * 21_000);
    }
    assert_eq!(rig.dialed(), vec![1, 2, 3]);
    assert_eq!(rig.modem().count_prefix("ATH"), 3);

    rig.sched.request_call(ms(rig.now), &mut rig.sink);
    assert_eq!(
        rig.sink.events.last(),
        Some(&AppEvent::Call(CallEvent::Dropped(DropReason::BatchExhausted)))
    );
    assert_eq!(rig.sched.calls().phase(), CallPhase::InCooldown);

    rig.run_until(rig.now + 61_000);
    rig.sched.request_call(ms(rig.now), &mut rig.sink);
    assert_eq!(rig.dialed(), vec![1, 2, 3, 1]);
    assert_eq!(rig.sched.calls().batch().calls_in_batch, 1);
}

#[test]
fn unprovisioned_recipient_refuses_traffic() {
    let cfg = AlarmConfig {
        phone_number: PhoneNumber::new(),
        ..provisioned_config()
    };
    let mut rig = Rig::new(cfg);
    rig.board.lost = true;
    rig.run_until(300);

    assert!(rig.sink.contains(&AppEvent::SmsRefused {
        purpose: SmsPurpose::Alert,
        reason: Refusal::NoRecipient,
    }));
    rig.sched.request_call(ms(rig.now), &mut rig.sink);
    assert_eq!(rig.sink.events.last(), Some(&AppEvent::CallRefused(Refusal::NoRecipient)));
    assert!(rig.modem().writes.is_empty());
}

#[test]
fn second_alert_while_sending_is_silent() {
    let mut rig = Rig::new(provisioned_config());
    assert!(rig.sched.trigger_alert(ms(0), &mut rig.sink));
    let events = rig.sink.events.len();
    let writes = rig.modem().writes.len();

    assert!(!rig.sched.trigger_alert(ms(10), &mut rig.sink));
    assert_eq!(rig.sink.events.len(), events);
    assert_eq!(rig.modem().writes.len(), writes);
}

#[test]
fn module_output_surfaces_as_lines() {
    let mut rig = Rig::new(provisioned_config());
    rig.sched
        .transport_mut()
        .reply("\r\nOK\r\n+CSQ: 21,0\r\n\x07RING\r\n");
    rig.run_until(10);

    let lines: Vec<&ModemLine> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::ModemLine(l) => Some(l),
            _ => None,
        })
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].as_str(), "OK");
    assert_eq!(lines[1].as_str(), "+CSQ: 21,0");
    assert_eq!(lines[2].as_str(), ".RING");
}

#[test]
fn network_script_runs_to_completion_when_idle() {
    let mut rig = Rig::new(provisioned_config());
    assert!(rig.sched.run_script(ScriptKind::NetworkStatus, ms(0), &mut rig.sink));
    rig.run_until(5_000);

    assert!(rig.sink.contains(&AppEvent::Script(ScriptEvent::Finished(ScriptKind::NetworkStatus))));
    assert_eq!(
        rig.modem().lines(),
        vec!["AT+CREG=2", "AT+CREG?", "AT+CSQ", "AT+COPS?", "AT+CFUN?"]
    );
}

#[test]
fn loss_aborts_running_script() {
    let mut rig = Rig::new(provisioned_config());
    assert!(rig.sched.run_script(ScriptKind::SimDiagnostics, ms(0), &mut rig.sink));
    rig.board.lost = true;
    rig.run_until(100);

    assert!(rig.sink.contains(&AppEvent::Script(ScriptEvent::Aborted(ScriptKind::SimDiagnostics))));
    assert!(!rig.sched.scripts().is_running());
    assert_eq!(rig.sched.sms().step(), SmsStep::ModeSet);
    // No further diagnostics commands after the abort.
    rig.run_until(20_000);
    assert_eq!(rig.modem().count_prefix("AT+CIMI"), 0);
    assert_eq!(rig.modem().count_prefix("AT+COPS=?"), 0);
}
