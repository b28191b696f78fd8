//! System configuration parameters
//!
//! All tunable parameters for the PowerGuard system.  Defaults match the
//! reference wiring (INA219 breakout with a 0.1 Ω shunt, LM35 on the ADC,
//! active-high relay boards).  A JSON override can replace any subset of
//! fields; everything is range-checked before use.

use core::fmt;

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::safety::HysteresisThreshold;

/// Transfer function of the analog temperature probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalogSensorKind {
    /// 10 mV/°C, 0 V = 0 °C.
    Lm35,
    /// 10 mV/°C, 500 mV = 0 °C.
    Tmp36,
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    // --- Identity ---
    /// Telemetry device id.  Empty = derive from the factory MAC.
    pub device_id: String<32>,

    // --- Thermal thresholds ---
    /// Analog temperature (°C) at or above which the fan switches on.
    pub fan_on_temp_c: f32,
    /// Analog temperature (°C) at or below which the fan switches off.
    pub fan_off_temp_c: f32,
    /// Ambient (DHT11) temperature (°C) that forces an emergency shutdown.
    pub ambient_shutoff_temp_c: f32,

    // --- Electrical limits ---
    /// Bus voltage (V) at or above which the relays are cut.
    pub overvoltage_v: f32,
    /// Load current (mA) at or above which the relays are cut.
    pub overcurrent_ma: f32,

    // --- Power meter ---
    /// Value written to the INA219 calibration register.
    pub calibration_value: u16,
    /// Shunt resistance in ohms.
    pub shunt_ohm: f32,
    /// INA219 7-bit I2C address.
    pub ina219_address: u8,
    /// Upper bound on a single I2C transaction (milliseconds).
    pub bus_timeout_ms: u32,
    /// Calibration write attempts before startup is declared failed.
    pub startup_calibration_attempts: u8,

    // --- Outputs ---
    pub relay_active_high: bool,
    pub fan_active_high: bool,
    pub buzzer_active_high: bool,

    // --- Sensors ---
    pub analog_sensor: AnalogSensorKind,

    // --- Energy cost ---
    /// Tariff in currency units per kWh.
    pub rate_per_kwh: f32,

    // --- Timing ---
    /// Control loop period (milliseconds).
    pub poll_interval_ms: u32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            device_id: String::new(),

            // Thermal
            fan_on_temp_c: 45.0,
            fan_off_temp_c: 38.0,
            ambient_shutoff_temp_c: 60.0,

            // Electrical
            overvoltage_v: 14.0,
            overcurrent_ma: 2000.0,

            // INA219
            calibration_value: 4096,
            shunt_ohm: 0.1,
            ina219_address: 0x40,
            bus_timeout_ms: 100,
            startup_calibration_attempts: 5,

            // Outputs
            relay_active_high: true,
            fan_active_high: true,
            buzzer_active_high: true,

            analog_sensor: AnalogSensorKind::Lm35,

            rate_per_kwh: 6.50,

            poll_interval_ms: 1000, // 1 Hz
        }
    }
}

/// Errors from loading or validating a [`GuardConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The override blob is not valid JSON for this schema.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Corrupted => Self::Config("config corrupted"),
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
        }
    }
}

impl GuardConfig {
    /// Parse a JSON override.  Missing fields keep their defaults; the result
    /// is validated before it is returned.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_slice(bytes).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values that would disable a safety check or break the bus
    /// arithmetic.  Invalid values are never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=150.0).contains(&self.fan_on_temp_c) {
            return Err(ConfigError::ValidationFailed(
                "fan_on_temp_c must be 0.0–150.0",
            ));
        }
        if !(0.0..=150.0).contains(&self.fan_off_temp_c) {
            return Err(ConfigError::ValidationFailed(
                "fan_off_temp_c must be 0.0–150.0",
            ));
        }
        if self.fan_off_temp_c >= self.fan_on_temp_c {
            return Err(ConfigError::ValidationFailed(
                "fan_off_temp_c must be < fan_on_temp_c",
            ));
        }
        if !(20.0..=100.0).contains(&self.ambient_shutoff_temp_c) {
            return Err(ConfigError::ValidationFailed(
                "ambient_shutoff_temp_c must be 20.0–100.0",
            ));
        }
        // INA219 bus range tops out at 32 V.
        if !(0.5..=32.0).contains(&self.overvoltage_v) {
            return Err(ConfigError::ValidationFailed(
                "overvoltage_v must be 0.5–32.0",
            ));
        }
        if !(1.0..=20_000.0).contains(&self.overcurrent_ma) {
            return Err(ConfigError::ValidationFailed(
                "overcurrent_ma must be 1–20000",
            ));
        }
        if self.calibration_value == 0 {
            return Err(ConfigError::ValidationFailed(
                "calibration_value must be non-zero",
            ));
        }
        if !(self.shunt_ohm.is_finite() && self.shunt_ohm > 0.0) {
            return Err(ConfigError::ValidationFailed("shunt_ohm must be > 0"));
        }
        if !(0x40..=0x4F).contains(&self.ina219_address) {
            return Err(ConfigError::ValidationFailed(
                "ina219_address must be 0x40–0x4F",
            ));
        }
        if !(1..=1000).contains(&self.bus_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "bus_timeout_ms must be 1–1000",
            ));
        }
        if self.startup_calibration_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "startup_calibration_attempts must be >= 1",
            ));
        }
        if !(self.rate_per_kwh.is_finite() && self.rate_per_kwh >= 0.0) {
            return Err(ConfigError::ValidationFailed(
                "rate_per_kwh must be >= 0",
            ));
        }
        if !(100..=60_000).contains(&self.poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be 100–60000",
            ));
        }
        if self.bus_timeout_ms >= self.poll_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "bus_timeout_ms must be < poll_interval_ms",
            ));
        }
        Ok(())
    }

    /// Analog fan thresholds as a hysteresis pair.
    pub fn fan_threshold(&self) -> Result<HysteresisThreshold, ConfigError> {
        HysteresisThreshold::new(self.fan_on_temp_c, self.fan_off_temp_c).ok_or(
            ConfigError::ValidationFailed("fan_off_temp_c must be < fan_on_temp_c"),
        )
    }

    /// Control period in seconds.
    pub fn poll_interval_secs(&self) -> f32 {
        self.poll_interval_ms as f32 / 1000.0
    }
}
