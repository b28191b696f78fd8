//! Full stack: HardwareAdapter over the real drivers, mocked at the
//! embedded-hal boundary (I2C register file, probe pins).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use powerguard::adapters::hardware::HardwareAdapter;
use powerguard::app::ports::{ActuatorPort, SensorPort};
use powerguard::config::{AnalogSensorKind, GuardConfig};
use powerguard::drivers::actuators::{ActuatorBank, Bank, Buzzer, Channel, RelayBank};
use powerguard::drivers::ina219::PowerMeterDriver;
use powerguard::drivers::output::{OutputState, PolarityOutput};
use powerguard::error::{DriverError, Error, SensorError};
use powerguard::safety::{SafetyController, SafetyMode};
use powerguard::sensors::analog_temp::AnalogTempSensor;
use powerguard::sensors::{AmbientSample, SensorHub};

use crate::mock_hw::*;

type Adapter = HardwareAdapter<FakeIna219, FakeAmbient, FakeAdc, ProbePin, NoDelay>;

struct Board {
    hw: Adapter,
    ina: FakeIna219,
    ambient: Rc<RefCell<Result<AmbientSample, SensorError>>>,
    adc: Rc<RefCell<Result<u16, SensorError>>>,
    lines: Vec<Rc<RefCell<bool>>>,
    faults: Vec<Rc<Cell<u32>>>,
}

fn board(relay_active_high: bool) -> Board {
    let ina = FakeIna219::new();
    let ambient = Rc::new(RefCell::new(Ok(AmbientSample {
        temperature_c: 25.0,
        humidity_pct: 50.0,
    })));
    let adc = Rc::new(RefCell::new(Ok(372))); // ≈ 0.3 V → 30 °C on an LM35
    let pins: Vec<ProbePin> = (0..6).map(|_| ProbePin::default()).collect();
    let lines = pins.iter().map(|p| p.0.clone()).collect();
    let faults = pins.iter().map(|p| p.1.clone()).collect();

    let outputs = ActuatorBank::new(
        RelayBank::new(pins[0].clone(), pins[1].clone(), relay_active_high),
        RelayBank::new(pins[2].clone(), pins[3].clone(), relay_active_high),
        PolarityOutput::new(pins[4].clone(), true, "fan"),
        Buzzer::new(pins[5].clone(), true, NoDelay),
    );
    let sensors = SensorHub::new(
        FakeAmbient(ambient.clone()),
        AnalogTempSensor::new(FakeAdc(adc.clone()), AnalogSensorKind::Lm35),
    );
    let meter = PowerMeterDriver::new(ina.clone(), 0x40);

    Board {
        hw: HardwareAdapter::new(sensors, meter, outputs),
        ina,
        ambient,
        adc,
        lines,
        faults,
    }
}

#[test]
fn calibration_writes_register_and_enables_current() {
    let mut b = board(true);
    let profile = b.hw.calibrate(&GuardConfig::default(), &mut NoDelay).unwrap();
    assert!((profile.current_lsb - 0.0001).abs() < 1e-9);
    assert_eq!(b.ina.state.borrow().writes, vec![(0x05, 4096)]);

    // bus: 12 V = 3000 LSB << 3; current raw 1500; power raw 900
    b.ina.set(0x02, 3000 << 3);
    b.ina.set(0x04, 1500);
    b.ina.set(0x03, 900);
    let r = b.hw.read_all(ts(0));
    assert!((r.bus_voltage_v.unwrap() - 12.0).abs() < 1e-4);
    assert!((r.current_a.unwrap() - 0.15).abs() < 1e-6);
    assert!((r.power_w.unwrap() - 1.8).abs() < 1e-5);
    assert_eq!(r.temperature_env, Some(25.0));
    assert!((r.temperature_analog.unwrap() - 30.0).abs() < 0.1);
}

#[test]
fn absent_meter_is_fatal_at_startup() {
    let mut b = board(true);
    b.ina.set_present(false);
    let config = GuardConfig {
        startup_calibration_attempts: 3,
        ..Default::default()
    };
    assert_eq!(
        b.hw.calibrate(&config, &mut NoDelay),
        Err(Error::Driver(DriverError::Bus))
    );
    assert!(b.hw.meter().calibration().is_none());
}

#[test]
fn uncalibrated_meter_still_reports_bus_voltage() {
    let mut b = board(true);
    b.ina.set(0x02, 3000 << 3);
    b.ina.set(0x04, 1500);
    let r = b.hw.read_all(ts(0));
    assert!((r.bus_voltage_v.unwrap() - 12.0).abs() < 1e-4);
    assert_eq!(r.current_a, None, "no guessed scale when uncalibrated");
    assert_eq!(r.power_w, None);
}

#[test]
fn bus_fault_blanks_electrical_fields_only() {
    let mut b = board(true);
    b.hw.calibrate(&GuardConfig::default(), &mut NoDelay).unwrap();
    b.ina.set_present(false);
    *b.adc.borrow_mut() = Err(SensorError::AdcReadFailed);

    let r = b.hw.read_all(ts(0));
    assert_eq!(r.bus_voltage_v, None);
    assert_eq!(r.current_a, None);
    assert_eq!(r.temperature_analog, None);
    assert_eq!(r.humidity_env, Some(50.0));
    assert_eq!(b.hw.bus_failures(), 1);
}

#[test]
fn overvoltage_drives_physical_lines_on_active_low_board() {
    let mut b = board(false);
    b.hw.calibrate(&GuardConfig::default(), &mut NoDelay).unwrap();
    for bank in Bank::ALL {
        for ch in Channel::ALL {
            b.hw.set_relay(bank, ch, true);
        }
    }
    assert!(!*b.lines[0].borrow(), "active-low ON is a LOW line");

    b.ina.set(0x02, 3625 << 3); // 14.5 V
    let mut safety = SafetyController::new(&GuardConfig::default());
    let reading = b.hw.read_all(ts(0));
    let out = safety.evaluate(&reading, &mut b.hw);

    assert_eq!(out.mode, SafetyMode::Emergency);
    for bank in Bank::ALL {
        for ch in Channel::ALL {
            assert_eq!(b.hw.relay_state(bank, ch), OutputState::Off);
        }
    }
    for line in &b.lines[..4] {
        assert!(*line.borrow(), "active-low OFF is a HIGH line");
    }
    assert_eq!(b.hw.fan_state(), OutputState::On);
    assert!(*b.lines[4].borrow());
    assert_eq!(b.hw.outputs().buzzer_total_pulses(), 3);
    assert!(!*b.lines[5].borrow(), "buzzer ends silent");
}

#[test]
fn ambient_failure_keeps_other_fields() {
    let mut b = board(true);
    *b.ambient.borrow_mut() = Err(SensorError::Timeout);
    let r = b.hw.read_all(ts(0));
    assert_eq!(r.temperature_env, None);
    assert!(r.temperature_analog.is_some());
    assert_eq!(b.hw.sensors().failure_counts(), (1, 0));
}

#[test]
fn rejected_relay_write_is_redriven() {
    let mut b = board(true);
    b.faults[0].set(1);
    b.hw.set_relay(Bank::First, Channel::One, true);
    assert_eq!(b.hw.relay_state(Bank::First, Channel::One), OutputState::On);
    assert!(!*b.lines[0].borrow(), "write was rejected");

    b.hw.reassert_outputs();
    assert!(*b.lines[0].borrow());

    // A clean line is left alone.
    b.faults[1].set(1);
    b.hw.reassert_outputs();
    assert_eq!(b.faults[1].get(), 1, "no retry without a failed write");
}
