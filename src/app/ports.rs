//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ GuardService (domain)
//! ```
//!
//! Driven adapters (sensors, actuators, event sinks, publishers, displays)
//! implement these traits.  The [`GuardService`](super::service::GuardService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.

use chrono::{DateTime, Utc};

use crate::drivers::actuators::{Bank, BeepPattern, Channel};
use crate::drivers::output::OutputState;
use crate::error::PublishError;
use crate::inbox::CommandInbox;
use crate::sensors::SensorReading;

use super::events::{GuardEvent, TelemetryData};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this to obtain sensor data.
pub trait SensorPort {
    /// Read every sensor and return a unified snapshot stamped `now`.
    /// Failed sources come back as `None`, never as zero.
    fn read_all(&mut self, now: DateTime<Utc>) -> SensorReading;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command outputs.
pub trait ActuatorPort {
    fn set_relay(&mut self, bank: Bank, channel: Channel, on: bool);

    fn relay_state(&self, bank: Bank, channel: Channel) -> OutputState;

    /// Cut both relay banks.
    fn all_relays_off(&mut self);

    fn set_fan(&mut self, on: bool);

    fn fan_state(&self) -> OutputState;

    /// Blocking buzzer pulse train.
    fn beep(&mut self, pattern: BeepPattern);

    /// Retry outputs whose last write did not reach the line.
    fn reassert_outputs(&mut self) {}
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`GuardEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &GuardEvent);
}

// ───────────────────────────────────────────────────────────────
// Telemetry publisher (driven adapter: domain → pub/sub, dashboard)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget telemetry output.  An error is counted by the caller
/// and never retried within the cycle.
pub trait TelemetryPublisher {
    fn publish(&mut self, data: &TelemetryData) -> Result<(), PublishError>;
}

// ───────────────────────────────────────────────────────────────
// Display port
// ───────────────────────────────────────────────────────────────

pub trait DisplayPort {
    /// Refresh the status screen.
    fn show_status(&mut self, data: &TelemetryData);

    /// Show a warning banner (remote warning, cloud shutdown).
    fn show_warning(&mut self, text: &str);
}

// ───────────────────────────────────────────────────────────────
// Command transport (driving adapter: pub/sub → inbox)
// ───────────────────────────────────────────────────────────────

/// Inbound side of the pub/sub client.  `poll` is called once per cycle
/// and pushes any received payloads into the inbox.
pub trait CommandTransport {
    fn poll(&mut self, inbox: &CommandInbox);
}

/// A transport that never delivers anything.  Useful when the pub/sub
/// client is not connected, or when commands are pushed from elsewhere.
pub struct NullTransport;

impl CommandTransport for NullTransport {
    fn poll(&mut self, _inbox: &CommandInbox) {}
}
