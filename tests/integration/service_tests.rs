//! GuardService → SafetyController → actuators, one cycle at a time.

use powerguard::app::events::GuardEvent;
use powerguard::app::ports::NullTransport;
use powerguard::app::service::GuardService;
use powerguard::config::GuardConfig;
use powerguard::error::PublishError;
use powerguard::inbox::CommandInbox;
use powerguard::safety::SafetyMode;
use powerguard::sensors::SensorReading;

use crate::mock_hw::*;

struct Rig {
    service: GuardService,
    hw: MockHardware,
    inbox: CommandInbox,
    display: RecordingDisplay,
    publisher: RecordingPublisher,
    sink: RecordingSink,
    t: i64,
}

impl Rig {
    fn new(config: GuardConfig, hw: MockHardware) -> Self {
        Self {
            service: GuardService::new(&config, "pg-test01"),
            hw,
            inbox: CommandInbox::new(),
            display: RecordingDisplay::default(),
            publisher: RecordingPublisher::default(),
            sink: RecordingSink::default(),
            t: 0,
        }
    }

    fn tick(&mut self) -> powerguard::app::events::TelemetryData {
        self.t += 1;
        self.service.tick(
            ts(self.t),
            &mut self.hw,
            &mut NullTransport,
            &self.inbox,
            &mut self.display,
            &mut self.publisher,
            &mut self.sink,
        )
    }

    fn feed(&mut self, f: impl FnOnce(&mut SensorReading)) -> powerguard::app::events::TelemetryData {
        let mut r = SensorReading::empty(ts(0));
        f(&mut r);
        self.hw.queue(r);
        self.tick()
    }
}

fn limits() -> GuardConfig {
    GuardConfig {
        overcurrent_ma: 1500.0,
        ..Default::default()
    }
}

#[test]
fn overvoltage_cycle_cuts_relays_and_runs_fan() {
    let mut rig = Rig::new(limits(), MockHardware::with_relays_on());
    let t = rig.feed(|r| r.bus_voltage_v = Some(14.5));

    assert_eq!(rig.service.mode(), SafetyMode::Emergency);
    assert!(!rig.hw.any_relay_on());
    assert!(rig.hw.fan_on());
    assert_eq!(t.relay_1, "OFF");
    assert_eq!(t.relay_4, "OFF");
    assert_eq!(t.fan, "ON");
    assert_eq!(t.mode, SafetyMode::Emergency);
    assert_eq!(rig.sink.count(|e| matches!(e, GuardEvent::Tripped(_))), 1);
}

#[test]
fn overcurrent_leaves_fan_as_it_was() {
    let mut rig = Rig::new(limits(), MockHardware::with_relays_on());
    let t = rig.feed(|r| r.current_a = Some(1.6));

    assert_eq!(t.mode, SafetyMode::Emergency);
    assert!(!rig.hw.any_relay_on());
    assert!(!rig.hw.fan_on());
    assert!(
        !rig.hw
            .calls
            .iter()
            .any(|c| matches!(c, ActuatorCall::SetFan(_))),
        "overcurrent must not touch the fan"
    );
    assert!((t.current_ma.unwrap() - 1600.0).abs() < 0.01);
}

#[test]
fn hysteresis_across_cycles() {
    let mut rig = Rig::new(limits(), MockHardware::new());

    rig.feed(|r| r.temperature_analog = Some(46.0));
    assert!(rig.hw.fan_on());
    assert_eq!(rig.service.mode(), SafetyMode::FanActive);

    rig.feed(|r| r.temperature_analog = Some(40.0));
    assert!(rig.hw.fan_on());

    rig.feed(|r| r.temperature_analog = Some(37.0));
    assert!(!rig.hw.fan_on());
    assert_eq!(rig.service.mode(), SafetyMode::Normal);

    assert_eq!(rig.hw.beeps(), vec![2]);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, GuardEvent::ModeChanged { .. })),
        2
    );
}

#[test]
fn missing_ambient_never_trips() {
    let mut rig = Rig::new(limits(), MockHardware::with_relays_on());
    let t = rig.feed(|r| {
        r.temperature_env = None;
        r.bus_voltage_v = Some(12.0);
        r.current_a = Some(0.2);
    });
    assert_eq!(t.mode, SafetyMode::Normal);
    assert!(rig.hw.any_relay_on());
    assert!(t.dht_temperature_c.is_none());
    assert!(rig.hw.beeps().is_empty());
}

#[test]
fn emergency_releases_when_reading_recovers() {
    let mut rig = Rig::new(limits(), MockHardware::with_relays_on());
    rig.feed(|r| r.temperature_env = Some(65.0));
    assert_eq!(rig.service.mode(), SafetyMode::Emergency);
    assert_eq!(rig.hw.beeps(), vec![4]);

    rig.feed(|r| r.temperature_env = Some(30.0));
    assert_eq!(rig.service.mode(), SafetyMode::Normal);
    // Relays stay where the trip left them; nothing switches them back.
    assert!(!rig.hw.any_relay_on());
}

#[test]
fn telemetry_rounded_and_priced() {
    let mut config = limits();
    config.poll_interval_ms = 1000;
    config.rate_per_kwh = 6.5;
    let mut rig = Rig::new(config, MockHardware::new());

    let t = rig.feed(|r| {
        r.bus_voltage_v = Some(12.034_56);
        r.current_a = Some(0.150_04);
        r.power_w = Some(1.805_55);
    });
    assert!((t.bus_voltage_v.unwrap() - 12.035).abs() < 1e-4);
    assert!((t.current_ma.unwrap() - 150.04).abs() < 1e-3);
    assert!((t.power_mw.unwrap() - 1805.55).abs() < 1e-2);
    assert_eq!(t.device_id.as_str(), "pg-test01");
    assert_eq!(rig.publisher.published.len(), 1);
    assert_eq!(rig.display.refreshes, 1);

    // 1.8 W for one second is far below a paisa.
    assert!(t.price >= 0.0 && t.price < 0.0001);
    assert!(rig.service.energy().energy_wh() > 0.0);
}

#[test]
fn publish_failure_is_counted_not_fatal() {
    let mut rig = Rig::new(limits(), MockHardware::new());
    rig.publisher.fail_with = Some(PublishError::NotConnected);

    rig.tick();
    rig.tick();
    assert_eq!(rig.service.publish_failures(), 2);
    assert_eq!(rig.service.cycle_count(), 2);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, GuardEvent::PublishFailed { .. })),
        2
    );
    // Telemetry still reached the display.
    assert_eq!(rig.display.refreshes, 2);
}

#[test]
fn commands_apply_after_safety_before_publish() {
    let mut rig = Rig::new(limits(), MockHardware::with_relays_on());
    rig.inbox.push(br#"{"cmd":"fan_on"}"#);
    rig.inbox.push(br#"{"cmd":"warning","text":"Grid unstable"}"#);

    // Cool analog reading: safety turns the fan off, then the command
    // turns it back on before telemetry is built.
    let t = rig.feed(|r| r.temperature_analog = Some(30.0));
    assert_eq!(t.fan, "ON");
    assert_eq!(t.warning.as_deref(), Some("Grid unstable"));
    assert_eq!(rig.display.warnings, vec!["FAN ON (CLOUD)", "Grid unstable"]);
    assert!(rig.inbox.is_empty());

    // The warning is published once.
    let t = rig.tick();
    assert!(t.warning.is_none());
}

#[test]
fn every_cycle_redrives_failed_outputs() {
    let mut rig = Rig::new(limits(), MockHardware::new());
    rig.tick();
    rig.tick();
    assert_eq!(rig.hw.reasserts, 2);
}
