//! Mock adapters for integration tests.
//!
//! Records every actuator call so tests can assert on the full command
//! history without touching real GPIO or I2C.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind as PinErrorKind, ErrorType as PinErrorType, OutputPin};
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use powerguard::app::events::{GuardEvent, TelemetryData};
use powerguard::app::ports::{
    ActuatorPort, CommandTransport, DisplayPort, EventSink, SensorPort, TelemetryPublisher,
};
use powerguard::drivers::actuators::{Bank, BeepPattern, Channel};
use powerguard::drivers::output::OutputState;
use powerguard::error::{PublishError, SensorError};
use powerguard::inbox::CommandInbox;
use powerguard::sensors::{AdcChannel, AmbientSample, AmbientSensor, SensorReading};

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_780_000_000 + secs, 0).unwrap()
}

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    SetRelay { bank: Bank, channel: Channel, on: bool },
    AllRelaysOff,
    SetFan(bool),
    Beep(u32),
}

// ── MockHardware ──────────────────────────────────────────────

/// Sensor + actuator mock.  Readings are served from a script; once the
/// script runs dry every field is absent.
pub struct MockHardware {
    pub calls: Vec<ActuatorCall>,
    pub readings: VecDeque<SensorReading>,
    relays: [[bool; 2]; 2],
    fan: bool,
    /// Times the service asked for failed outputs to be re-driven.
    pub reasserts: u32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            readings: VecDeque::new(),
            relays: [[false; 2]; 2],
            fan: false,
            reasserts: 0,
        }
    }

    /// All four relays ON, as after a dashboard power-up.
    pub fn with_relays_on() -> Self {
        let mut hw = Self::new();
        hw.relays = [[true; 2]; 2];
        hw
    }

    pub fn queue(&mut self, reading: SensorReading) {
        self.readings.push_back(reading);
    }

    pub fn any_relay_on(&self) -> bool {
        self.relays.iter().flatten().any(|r| *r)
    }

    pub fn fan_on(&self) -> bool {
        self.fan
    }

    pub fn beeps(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ActuatorCall::Beep(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHardware {
    fn read_all(&mut self, now: DateTime<Utc>) -> SensorReading {
        let mut r = self
            .readings
            .pop_front()
            .unwrap_or_else(|| SensorReading::empty(now));
        r.timestamp = now;
        r
    }
}

impl ActuatorPort for MockHardware {
    fn set_relay(&mut self, bank: Bank, channel: Channel, on: bool) {
        self.relays[bank as usize][channel as usize] = on;
        self.calls.push(ActuatorCall::SetRelay { bank, channel, on });
    }

    fn relay_state(&self, bank: Bank, channel: Channel) -> OutputState {
        self.relays[bank as usize][channel as usize].into()
    }

    fn all_relays_off(&mut self) {
        self.relays = [[false; 2]; 2];
        self.calls.push(ActuatorCall::AllRelaysOff);
    }

    fn set_fan(&mut self, on: bool) {
        self.fan = on;
        self.calls.push(ActuatorCall::SetFan(on));
    }

    fn fan_state(&self) -> OutputState {
        self.fan.into()
    }

    fn beep(&mut self, pattern: BeepPattern) {
        self.calls.push(ActuatorCall::Beep(pattern.count));
    }

    fn reassert_outputs(&mut self) {
        self.reasserts += 1;
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<GuardEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&GuardEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &GuardEvent) {
        self.events.push(event.clone());
    }
}

// ── Publisher ─────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Vec<TelemetryData>,
    pub fail_with: Option<PublishError>,
}

impl TelemetryPublisher for RecordingPublisher {
    fn publish(&mut self, data: &TelemetryData) -> Result<(), PublishError> {
        if let Some(e) = self.fail_with {
            return Err(e);
        }
        self.published.push(data.clone());
        Ok(())
    }
}

// ── Display ───────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingDisplay {
    pub warnings: Vec<String>,
    pub refreshes: usize,
}

impl DisplayPort for RecordingDisplay {
    fn show_status(&mut self, _data: &TelemetryData) {
        self.refreshes += 1;
    }

    fn show_warning(&mut self, text: &str) {
        self.warnings.push(text.to_string());
    }
}

// ── Transport ─────────────────────────────────────────────────

/// Delivers each queued batch on successive polls.
#[derive(Default)]
pub struct ScriptedTransport {
    pub batches: VecDeque<Vec<&'static [u8]>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn then(mut self, batch: Vec<&'static [u8]>) -> Self {
        self.batches.push_back(batch);
        self
    }
}

impl CommandTransport for ScriptedTransport {
    fn poll(&mut self, inbox: &CommandInbox) {
        if let Some(batch) = self.batches.pop_front() {
            for payload in batch {
                inbox.push(payload);
            }
        }
    }
}

// ── Low-level peripherals for the full adapter stack ──────────

#[derive(Debug)]
pub struct Nack;

impl embedded_hal::i2c::Error for Nack {
    fn kind(&self) -> ErrorKind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
    }
}

/// INA219 register file behind a shared handle, so tests can change
/// register values after the driver has taken ownership.
#[derive(Clone)]
pub struct FakeIna219 {
    pub state: Rc<RefCell<InaState>>,
}

pub struct InaState {
    pub regs: [u16; 6],
    pub present: bool,
    pub writes: Vec<(u8, u16)>,
}

#[allow(dead_code)]
impl FakeIna219 {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(InaState {
                regs: [0; 6],
                present: true,
                writes: Vec::new(),
            })),
        }
    }

    pub fn set(&self, reg: usize, value: u16) {
        self.state.borrow_mut().regs[reg] = value;
    }

    pub fn set_present(&self, present: bool) {
        self.state.borrow_mut().present = present;
    }
}

impl ErrorType for FakeIna219 {
    type Error = Nack;
}

impl I2c for FakeIna219 {
    fn transaction(&mut self, _address: u8, ops: &mut [Operation<'_>]) -> Result<(), Nack> {
        let mut st = self.state.borrow_mut();
        if !st.present {
            return Err(Nack);
        }
        let mut pointer = 0usize;
        for op in ops {
            match op {
                Operation::Write(bytes) => {
                    pointer = bytes[0] as usize;
                    if bytes.len() == 3 {
                        let v = u16::from_be_bytes([bytes[1], bytes[2]]);
                        st.regs[pointer] = v;
                        st.writes.push((bytes[0], v));
                    }
                }
                Operation::Read(buf) => {
                    buf.copy_from_slice(&st.regs[pointer].to_be_bytes());
                }
            }
        }
        Ok(())
    }
}

/// Output pin mirroring its level into a shared cell.
/// Output line with a shared level and a count of writes to reject.
#[derive(Clone, Default)]
pub struct ProbePin(pub Rc<RefCell<bool>>, pub Rc<Cell<u32>>);

impl ProbePin {
    fn write(&mut self, high: bool) -> Result<(), PinErrorKind> {
        let failures = self.1.get();
        if failures > 0 {
            self.1.set(failures - 1);
            return Err(PinErrorKind::Other);
        }
        *self.0.borrow_mut() = high;
        Ok(())
    }
}

impl PinErrorType for ProbePin {
    type Error = PinErrorKind;
}

impl OutputPin for ProbePin {
    fn set_low(&mut self) -> Result<(), PinErrorKind> {
        self.write(false)
    }
    fn set_high(&mut self) -> Result<(), PinErrorKind> {
        self.write(true)
    }
}

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Ambient sensor returning a shared, mutable result.
#[derive(Clone)]
pub struct FakeAmbient(pub Rc<RefCell<Result<AmbientSample, SensorError>>>);

impl AmbientSensor for FakeAmbient {
    fn measure(&mut self) -> Result<AmbientSample, SensorError> {
        *self.0.borrow()
    }
}

#[derive(Clone)]
pub struct FakeAdc(pub Rc<RefCell<Result<u16, SensorError>>>);

impl AdcChannel for FakeAdc {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        *self.0.borrow()
    }
}
