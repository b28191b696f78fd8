//! Remote commands through the service's inbox path.

use powerguard::app::events::GuardEvent;
use powerguard::app::ports::NullTransport;
use powerguard::app::service::GuardService;
use powerguard::config::GuardConfig;
use powerguard::drivers::actuators::{Bank, Channel};
use powerguard::error::ParseError;
use powerguard::inbox::CommandInbox;
use powerguard::safety::SafetyMode;
use powerguard::sensors::SensorReading;

use crate::mock_hw::*;

fn service() -> GuardService {
    GuardService::new(&GuardConfig::default(), "pg-cmd")
}

fn run(payloads: &[&[u8]], hw: &mut MockHardware) -> (GuardService, RecordingDisplay, RecordingSink) {
    let mut svc = service();
    let inbox = CommandInbox::new();
    let mut display = RecordingDisplay::default();
    let mut sink = RecordingSink::default();
    for p in payloads {
        assert!(inbox.push(p));
    }
    svc.process_inbox(&inbox, hw, &mut display, &mut sink);
    (svc, display, sink)
}

#[test]
fn beep_twice_touches_nothing_else() {
    let mut hw = MockHardware::with_relays_on();
    run(&[br#"{"cmd":"beep","times":2}"#], &mut hw);
    assert_eq!(hw.calls, vec![ActuatorCall::Beep(2)]);
    assert!(hw.any_relay_on());
    assert!(!hw.fan_on());
}

#[test]
fn shutdown_cuts_relays_runs_fan_and_alarms() {
    for payload in [&br#"{"cmd":"shutdown"}"#[..], br#"{"cmd":"relays_off"}"#] {
        let mut hw = MockHardware::with_relays_on();
        let (svc, display, _) = run(&[payload], &mut hw);
        assert!(!hw.any_relay_on());
        assert!(hw.fan_on());
        assert_eq!(hw.beeps(), vec![3]);
        assert_eq!(display.warnings, vec!["CLOUD SHUTDOWN"]);
        assert!(svc.safety().fan_decision());
    }
}

#[test]
fn malformed_and_unknown_are_no_ops() {
    let mut hw = MockHardware::with_relays_on();
    let (svc, display, sink) = run(
        &[b"{oops", br#"{"times":3}"#, br#"{"cmd":"self_destruct"}"#],
        &mut hw,
    );
    assert!(hw.calls.is_empty());
    assert!(display.warnings.is_empty());
    assert_eq!(svc.command_counts(), (0, 2));
    assert_eq!(
        sink.count(|e| matches!(e, GuardEvent::CommandRejected(ParseError::Malformed))),
        1
    );
    assert_eq!(
        sink.count(|e| matches!(e, GuardEvent::CommandRejected(ParseError::MissingCommand))),
        1
    );
    assert_eq!(sink.count(|e| matches!(e, GuardEvent::CommandApplied(_))), 0);
}

#[test]
fn relay_override_maps_dashboard_numbers() {
    let mut hw = MockHardware::new();
    run(
        &[
            br#"{"cmd":"relay","relay":1,"state":true}"#,
            br#"{"cmd":"relay","relay":4,"state":1}"#,
        ],
        &mut hw,
    );
    assert_eq!(
        hw.calls,
        vec![
            ActuatorCall::SetRelay {
                bank: Bank::First,
                channel: Channel::One,
                on: true
            },
            ActuatorCall::SetRelay {
                bank: Bank::Second,
                channel: Channel::Two,
                on: true
            },
        ]
    );
}

#[test]
fn fan_off_syncs_controller() {
    let mut hw = MockHardware::new();
    let (svc, _, _) = run(&[br#"{"cmd":"fan_on"}"#, br#"{"cmd":"fan_off"}"#], &mut hw);
    assert!(!hw.fan_on());
    assert!(!svc.safety().fan_decision());
}

#[test]
fn price_recording_toggle() {
    let mut hw = MockHardware::new();
    let (svc, _, _) = run(&[br#"{"cmd":"price_recording","enabled":false}"#], &mut hw);
    assert!(!svc.energy().is_recording());
    assert!(hw.calls.is_empty());
}

#[test]
fn transport_delivers_into_the_cycle() {
    let mut svc = service();
    let mut hw = MockHardware::new();
    let inbox = CommandInbox::new();
    let mut transport = ScriptedTransport::default()
        .then(vec![])
        .then(vec![br#"{"cmd":"beep","times":1}"#]);
    let mut display = RecordingDisplay::default();
    let mut publisher = RecordingPublisher::default();
    let mut sink = RecordingSink::default();

    for i in 0..2 {
        svc.tick(
            ts(i),
            &mut hw,
            &mut transport,
            &inbox,
            &mut display,
            &mut publisher,
            &mut sink,
        );
    }
    assert_eq!(hw.beeps(), vec![1]);
    assert_eq!(svc.command_counts(), (1, 0));
}

#[test]
fn relay_on_refused_while_emergency_holds() {
    let mut svc = service();
    let mut hw = MockHardware::with_relays_on();
    let inbox = CommandInbox::new();
    let mut display = RecordingDisplay::default();
    let mut publisher = RecordingPublisher::default();
    let mut sink = RecordingSink::default();

    let mut reading = SensorReading::empty(ts(1));
    reading.bus_voltage_v = Some(20.0);
    hw.queue(reading);
    assert!(inbox.push(br#"{"cmd":"relay","relay":1,"state":true}"#));
    assert!(inbox.push(br#"{"cmd":"relay","relay":2,"state":false}"#));

    let t = svc.tick(
        ts(1),
        &mut hw,
        &mut NullTransport,
        &inbox,
        &mut display,
        &mut publisher,
        &mut sink,
    );
    assert_eq!(t.mode, SafetyMode::Emergency);
    assert_eq!(t.relay_1, "OFF");
    assert!(!hw.any_relay_on());
    // Switching off is always allowed; switching on is refused.
    assert_eq!(svc.command_counts(), (1, 1));
    assert_eq!(sink.count(|e| matches!(e, GuardEvent::CommandRefused("relay"))), 1);

    // Once the supply recovers the override goes through.
    hw.queue(SensorReading::empty(ts(2)));
    assert!(inbox.push(br#"{"cmd":"relay","relay":1,"state":true}"#));
    let t = svc.tick(
        ts(2),
        &mut hw,
        &mut NullTransport,
        &inbox,
        &mut display,
        &mut publisher,
        &mut sink,
    );
    assert_eq!(t.mode, SafetyMode::Normal);
    assert_eq!(t.relay_1, "ON");
    assert_eq!(svc.command_counts(), (2, 1));
}
