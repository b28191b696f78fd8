//! Application service: the hexagonal core.
//!
//! [`GuardService`] owns the safety controller, the energy meter and the
//! per-cycle bookkeeping.  All I/O flows through port traits injected at
//! call sites, making the entire service testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌────────────────────────┐ ──▶ TelemetryPublisher
//!                 │      GuardService      │ ──▶ EventSink
//! ActuatorPort ◀──│ Safety · Energy · Cmds │ ──▶ DisplayPort
//!                 └────────────────────────┘
//!                          ▲
//!            CommandInbox ─┘
//! ```

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::config::GuardConfig;
use crate::drivers::actuators::{Bank, Channel};
use crate::energy::EnergyMeter;
use crate::inbox::CommandInbox;
use crate::safety::{SafetyController, SafetyMode, SafetyTrip};
use crate::sensors::SensorReading;

use super::commands::{self, Command};
use super::events::{round_to, GuardEvent, TelemetryData, WarningText};
use super::ports::{
    ActuatorPort, CommandTransport, DisplayPort, EventSink, SensorPort, TelemetryPublisher,
};

// ───────────────────────────────────────────────────────────────
// GuardService
// ───────────────────────────────────────────────────────────────

pub struct GuardService {
    device_id: heapless::String<32>,
    safety: SafetyController,
    energy: EnergyMeter,
    /// Seconds per control cycle (derived from config).
    cycle_secs: f32,
    cycle_count: u64,
    mode: SafetyMode,
    /// Set by a `warning` command, published once with the next record.
    pending_warning: Option<WarningText>,
    publish_failures: u32,
    commands_applied: u32,
    commands_rejected: u32,
}

impl GuardService {
    /// `device_id` is the resolved identity (config override or MAC-derived).
    pub fn new(config: &GuardConfig, device_id: &str) -> Self {
        let mut id = heapless::String::new();
        for ch in device_id.chars() {
            if id.push(ch).is_err() {
                warn!("device id truncated to {id}");
                break;
            }
        }
        Self {
            device_id: id,
            safety: SafetyController::new(config),
            energy: EnergyMeter::new(config.rate_per_kwh),
            cycle_secs: config.poll_interval_secs(),
            cycle_count: 0,
            mode: SafetyMode::Normal,
            pending_warning: None,
            publish_failures: 0,
            commands_applied: 0,
            commands_rejected: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&GuardEvent::Started {
            device_id: self.device_id.clone(),
        });
        info!("GuardService started as {}", self.device_id);
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one full control cycle:
    /// outputs → read → safety → energy → commands → telemetry.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`], which avoids a double mutable borrow while keeping
    /// the port boundary explicit.
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        now: DateTime<Utc>,
        hw: &mut (impl SensorPort + ActuatorPort),
        transport: &mut impl CommandTransport,
        inbox: &CommandInbox,
        display: &mut impl DisplayPort,
        publisher: &mut impl TelemetryPublisher,
        sink: &mut impl EventSink,
    ) -> TelemetryData {
        self.cycle_count += 1;

        // 0. Retry outputs the last cycle failed to drive
        hw.reassert_outputs();

        // 1. Read sensors
        let reading = hw.read_all(now);

        // 2. Safety evaluation (drives outputs directly)
        let outcome = self.safety.evaluate(&reading, hw);
        if outcome.mode != self.mode {
            sink.emit(&GuardEvent::ModeChanged {
                from: self.mode,
                to: outcome.mode,
            });
            self.mode = outcome.mode;
        }
        if outcome.trips & SafetyTrip::EMERGENCY_MASK != 0 {
            sink.emit(&GuardEvent::Tripped(outcome.trips));
        }

        // 3. Energy cost
        self.energy.accumulate(reading.power_w, self.cycle_secs);

        // 4. Remote commands
        transport.poll(inbox);
        self.process_inbox(inbox, hw, display, sink);

        // 5. Telemetry
        let telemetry = self.build_telemetry(&reading, &*hw);
        self.pending_warning = None;
        sink.emit(&GuardEvent::Telemetry(telemetry.clone()));
        display.show_status(&telemetry);
        if let Err(e) = publisher.publish(&telemetry) {
            self.publish_failures = self.publish_failures.saturating_add(1);
            warn!("telemetry publish failed: {e}");
            sink.emit(&GuardEvent::PublishFailed {
                error: e,
                total: self.publish_failures,
            });
        }

        telemetry
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply every queued payload, oldest first.
    pub fn process_inbox(
        &mut self,
        inbox: &CommandInbox,
        hw: &mut impl ActuatorPort,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) -> usize {
        inbox.drain(|raw| self.handle_payload(raw, hw, display, sink))
    }

    /// Decode and apply a single payload.  Bad payloads are dropped
    /// without touching any output.
    pub fn handle_payload(
        &mut self,
        raw: &[u8],
        hw: &mut impl ActuatorPort,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) {
        match commands::decode(raw) {
            Ok(cmd) => self.handle_command(&cmd, hw, display, sink),
            Err(e) => {
                self.commands_rejected = self.commands_rejected.saturating_add(1);
                warn!("command dropped: {e}");
                sink.emit(&GuardEvent::CommandRejected(e));
            }
        }
    }

    pub fn handle_command(
        &mut self,
        cmd: &Command,
        hw: &mut impl ActuatorPort,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) {
        let outcome = commands::apply(cmd, hw, &mut self.safety, &mut self.energy, display);
        if let Some(w) = outcome.warning {
            self.pending_warning = Some(w);
        }
        if outcome.refused {
            self.commands_rejected = self.commands_rejected.saturating_add(1);
            sink.emit(&GuardEvent::CommandRefused(cmd.name()));
        } else if *cmd != Command::Unknown {
            self.commands_applied = self.commands_applied.saturating_add(1);
            sink.emit(&GuardEvent::CommandApplied(cmd.name()));
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Telemetry record from a reading and the live output states.
    pub fn build_telemetry(&self, reading: &SensorReading, hw: &impl ActuatorPort) -> TelemetryData {
        TelemetryData {
            device_id: self.device_id.clone(),
            timestamp: reading.timestamp,
            dht_temperature_c: reading.temperature_env,
            dht_humidity_pct: reading.humidity_env,
            analog_temperature_c: reading.temperature_analog.map(|t| round_to(t, 2)),
            bus_voltage_v: reading.bus_voltage_v.map(|v| round_to(v, 3)),
            current_ma: reading.current_ma().map(|ma| round_to(ma, 2)),
            power_mw: reading.power_w.map(|w| round_to(w * 1000.0, 2)),
            price: round_to(self.energy.cost(), 4),
            relay_1: hw.relay_state(Bank::First, Channel::One).as_str(),
            relay_2: hw.relay_state(Bank::First, Channel::Two).as_str(),
            relay_3: hw.relay_state(Bank::Second, Channel::One).as_str(),
            relay_4: hw.relay_state(Bank::Second, Channel::Two).as_str(),
            fan: hw.fan_state().as_str(),
            warning: self.pending_warning.clone(),
            mode: self.mode,
        }
    }

    pub fn mode(&self) -> SafetyMode {
        self.mode
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Control cycles executed since startup.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn publish_failures(&self) -> u32 {
        self.publish_failures
    }

    /// `(applied, rejected)` remote command counts.
    pub fn command_counts(&self) -> (u32, u32) {
        (self.commands_applied, self.commands_rejected)
    }

    pub fn safety(&self) -> &SafetyController {
        &self.safety
    }

    pub fn energy(&self) -> &EnergyMeter {
        &self.energy
    }
}
