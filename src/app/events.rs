//! Outbound application events and the telemetry record.
//!
//! The [`GuardService`](super::service::GuardService) emits [`GuardEvent`]s
//! through the [`EventSink`](super::ports::EventSink) port and hands
//! [`TelemetryData`] to the publisher.  The telemetry field names are the
//! ones the cloud side and dashboard already consume.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::{ParseError, PublishError};
use crate::safety::SafetyMode;

/// Wall-clock format used in every outbound message.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub type WarningText = heapless::String<64>;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum GuardEvent {
    /// The service has started.
    Started { device_id: heapless::String<32> },

    /// Per-cycle telemetry snapshot.
    Telemetry(TelemetryData),

    /// The safety mode changed.
    ModeChanged { from: SafetyMode, to: SafetyMode },

    /// One or more safety trips are active (bitmask).
    Tripped(u8),

    /// A remote command was applied.
    CommandApplied(&'static str),

    /// A remote payload was dropped.
    CommandRejected(ParseError),

    /// A valid command was refused by the current safety mode.
    CommandRefused(&'static str),

    /// Telemetry could not be published.
    PublishFailed { error: PublishError, total: u32 },
}

/// One outbound telemetry record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryData {
    pub device_id: heapless::String<32>,
    #[serde(rename = "ts", serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "DHT11_Temperature")]
    pub dht_temperature_c: Option<f32>,
    #[serde(rename = "DHT11_Humidity")]
    pub dht_humidity_pct: Option<f32>,
    #[serde(rename = "Analog_Temperature")]
    pub analog_temperature_c: Option<f32>,
    #[serde(rename = "INA219_Voltage(V)")]
    pub bus_voltage_v: Option<f32>,
    #[serde(rename = "INA219_Current(mA)")]
    pub current_ma: Option<f32>,
    #[serde(rename = "INA219_Power(mW)")]
    pub power_mw: Option<f32>,
    #[serde(rename = "Price_Rs")]
    pub price: f32,
    #[serde(rename = "Relay_1")]
    pub relay_1: &'static str,
    #[serde(rename = "Relay_2")]
    pub relay_2: &'static str,
    #[serde(rename = "Relay_3")]
    pub relay_3: &'static str,
    #[serde(rename = "Relay_4")]
    pub relay_4: &'static str,
    #[serde(rename = "DC_Fan")]
    pub fan: &'static str,
    #[serde(rename = "Warning")]
    pub warning: Option<WarningText>,
    #[serde(rename = "Mode", serialize_with = "serialize_mode")]
    pub mode: SafetyMode,
}

impl TelemetryData {
    /// JSON encoding as published.
    pub fn to_json(&self) -> Result<String, PublishError> {
        serde_json::to_string(self).map_err(|_| PublishError::Encode)
    }
}

/// Round to `places` decimals for publication.
pub fn round_to(value: f32, places: i32) -> f32 {
    let scale = 10f32.powi(places);
    (value * scale).round() / scale
}

/// Copy `text` into a fixed-size buffer, cutting at a char boundary.
pub fn truncate_warning(text: &str) -> WarningText {
    let mut out = WarningText::new();
    for ch in text.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&ts.format(TIMESTAMP_FORMAT))
}

fn serialize_mode<S: Serializer>(mode: &SafetyMode, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(mode)
}
