//! Sensor subsystem: individual drivers and the aggregating [`SensorHub`].
//!
//! The hub owns the ambient (DHT11) and analog temperature sensors.  The
//! power meter lives next to it in the hardware adapter because it owns the
//! I2C bus; the adapter merges both into one [`SensorReading`] per cycle.
//!
//! A failed sensor yields an absent field for that cycle.  Nothing here
//! substitutes zero or a stale value for a failed read.

pub mod analog_temp;
pub mod dht11;

use chrono::{DateTime, Utc};
use log::warn;

use crate::error::SensorError;
use analog_temp::AnalogTempSensor;

/// One ambient measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientSample {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// A humidity/temperature source (DHT11 on the reference board).
pub trait AmbientSensor {
    fn measure(&mut self) -> Result<AmbientSample, SensorError>;
}

/// A single ADC channel returning raw 12-bit counts.
pub trait AdcChannel {
    fn read_raw(&mut self) -> Result<u16, SensorError>;
}

/// A point-in-time snapshot of every input the safety controller uses.
///
/// `None` means the source failed this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub timestamp: DateTime<Utc>,
    pub temperature_env: Option<f32>,
    pub humidity_env: Option<f32>,
    pub temperature_analog: Option<f32>,
    pub bus_voltage_v: Option<f32>,
    pub current_a: Option<f32>,
    pub power_w: Option<f32>,
}

impl SensorReading {
    /// Snapshot with every field absent.
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            temperature_env: None,
            humidity_env: None,
            temperature_analog: None,
            bus_voltage_v: None,
            current_a: None,
            power_w: None,
        }
    }

    /// Load current in mA, if measured.
    pub fn current_ma(&self) -> Option<f32> {
        self.current_a.map(|a| a * 1000.0)
    }
}

/// Environmental half of a [`SensorReading`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnvironmentReading {
    pub temperature_env: Option<f32>,
    pub humidity_env: Option<f32>,
    pub temperature_analog: Option<f32>,
}

/// Owns the environmental sensors and tolerates per-sensor failure.
pub struct SensorHub<S, A> {
    ambient: S,
    analog: AnalogTempSensor<A>,
    ambient_failures: u32,
    analog_failures: u32,
}

impl<S: AmbientSensor, A: AdcChannel> SensorHub<S, A> {
    pub fn new(ambient: S, analog: AnalogTempSensor<A>) -> Self {
        Self {
            ambient,
            analog,
            ambient_failures: 0,
            analog_failures: 0,
        }
    }

    /// Read every sensor.  A failure blanks only that sensor's fields.
    pub fn read_all(&mut self) -> EnvironmentReading {
        let (temperature_env, humidity_env) = match self.ambient.measure() {
            Ok(s) => (Some(s.temperature_c), Some(s.humidity_pct)),
            Err(e) => {
                self.ambient_failures = self.ambient_failures.saturating_add(1);
                warn!("ambient sensor unavailable: {e}");
                (None, None)
            }
        };

        let temperature_analog = match self.analog.read_temperature() {
            Ok(t) => Some(t),
            Err(e) => {
                self.analog_failures = self.analog_failures.saturating_add(1);
                warn!("analog temperature unavailable: {e}");
                None
            }
        };

        EnvironmentReading {
            temperature_env,
            humidity_env,
            temperature_analog,
        }
    }

    /// Cumulative failure counts `(ambient, analog)`.
    pub fn failure_counts(&self) -> (u32, u32) {
        (self.ambient_failures, self.analog_failures)
    }
}
