//! INA219 current / bus-voltage monitor driver.
//!
//! The chip exposes six 16-bit big-endian registers over I2C.  Shunt and bus
//! voltage are available straight after power-up; current and power are only
//! meaningful once the calibration register has been written, because the
//! chip scales them by the value stored there.
//!
//! ## Register map
//!
//! | Addr | Register      | Format                        | LSB            |
//! |------|---------------|-------------------------------|----------------|
//! | 0x00 | Configuration | -                             | -              |
//! | 0x01 | Shunt voltage | i16                           | 10 µV          |
//! | 0x02 | Bus voltage   | u16, bits 15..3 (3 status)    | 4 mV           |
//! | 0x03 | Power         | u16                           | `power_lsb`    |
//! | 0x04 | Current       | i16                           | `current_lsb`  |
//! | 0x05 | Calibration   | u16                           | -              |
//!
//! `current_lsb = 0.04096 / (calibration × R_shunt)` and
//! `power_lsb = 20 × current_lsb`.
//!
//! Reading current or power before [`PowerMeterDriver::configure`] has
//! succeeded returns [`DriverError::Uncalibrated`]; no default scale is ever
//! assumed.
//!
//! The driver is generic over [`embedded_hal::i2c::I2c`].  Bounding each
//! transaction in time is the bus implementation's job; any error it reports
//! (including a timeout) becomes [`DriverError::Bus`].

use embedded_hal::i2c::{Error as _, I2c};
use log::{error, info, warn};

use crate::error::DriverError;

/// Factory-default 7-bit address (A0 = A1 = GND).
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// Numerator of the datasheet current-LSB formula.
const CURRENT_LSB_NUMERATOR: f32 = 0.04096;
/// Power LSB is a fixed multiple of the current LSB.
const POWER_LSB_FACTOR: f32 = 20.0;
/// Bus voltage register resolution after dropping the status bits.
const BUS_VOLTAGE_LSB_V: f32 = 4e-3;
/// Shunt voltage register resolution.
const SHUNT_VOLTAGE_LSB_V: f32 = 10e-6;
/// Bus voltage register: CNVR, OVF and one reserved bit sit below the value.
const BUS_VOLTAGE_STATUS_BITS: u32 = 3;

/// INA219 register addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    Configuration = 0x00,
    ShuntVoltage = 0x01,
    BusVoltage = 0x02,
    Power = 0x03,
    Current = 0x04,
    Calibration = 0x05,
}

/// Scale factors derived from a calibration write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationProfile {
    pub shunt_resistance_ohm: f32,
    pub calibration_register_value: u16,
    /// Amps per current-register count.
    pub current_lsb: f32,
    /// Watts per power-register count.
    pub power_lsb: f32,
}

impl CalibrationProfile {
    /// Compute the profile for a calibration value and shunt.  `None` when
    /// either input would make the LSBs meaningless.
    pub fn new(calibration_value: u16, shunt_ohm: f32) -> Option<Self> {
        if calibration_value == 0 || !shunt_ohm.is_finite() || shunt_ohm <= 0.0 {
            return None;
        }
        let current_lsb = CURRENT_LSB_NUMERATOR / (f32::from(calibration_value) * shunt_ohm);
        Some(Self {
            shunt_resistance_ohm: shunt_ohm,
            calibration_register_value: calibration_value,
            current_lsb,
            power_lsb: POWER_LSB_FACTOR * current_lsb,
        })
    }
}

/// One coherent set of electrical readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerSample {
    pub shunt_v: f32,
    pub bus_v: f32,
    pub current_a: f32,
    pub power_w: f32,
}

/// INA219 driver.  Owns the I2C bus for its lifetime.
pub struct PowerMeterDriver<I> {
    i2c: I,
    address: u8,
    calibration: Option<CalibrationProfile>,
}

impl<I: I2c> PowerMeterDriver<I> {
    /// Wrap a bus.  No traffic is generated until the first call.
    pub fn new(i2c: I, address: u8) -> Self {
        Self {
            i2c,
            address,
            calibration: None,
        }
    }

    /// Write the calibration register and derive the current/power LSBs.
    ///
    /// On failure the previously stored profile (if any) stays in effect.
    pub fn configure(
        &mut self,
        calibration_value: u16,
        shunt_ohm: f32,
    ) -> Result<CalibrationProfile, DriverError> {
        let profile = CalibrationProfile::new(calibration_value, shunt_ohm)
            .ok_or(DriverError::InvalidCalibration)?;

        self.write_register(Register::Calibration, calibration_value)?;
        self.calibration = Some(profile);
        info!(
            "INA219@0x{:02x}: calibrated (cal={}, shunt={}Ω, current_lsb={:e}A)",
            self.address, calibration_value, shunt_ohm, profile.current_lsb
        );
        Ok(profile)
    }

    /// Active calibration, if `configure` has succeeded.
    pub fn calibration(&self) -> Option<&CalibrationProfile> {
        self.calibration.as_ref()
    }

    /// Bus voltage in volts.
    pub fn read_bus_voltage(&mut self) -> Result<f32, DriverError> {
        let raw = self.read_register(Register::BusVoltage)?;
        Ok(f32::from(raw >> BUS_VOLTAGE_STATUS_BITS) * BUS_VOLTAGE_LSB_V)
    }

    /// Shunt voltage in volts (signed).
    pub fn read_shunt_voltage(&mut self) -> Result<f32, DriverError> {
        let raw = self.read_register_signed(Register::ShuntVoltage)?;
        Ok(f32::from(raw) * SHUNT_VOLTAGE_LSB_V)
    }

    /// Load current in amps (signed).
    pub fn read_current(&mut self) -> Result<f32, DriverError> {
        let lsb = self.require_calibration()?.current_lsb;
        let raw = self.read_register_signed(Register::Current)?;
        Ok(f32::from(raw) * lsb)
    }

    /// Load power in watts.
    pub fn read_power(&mut self) -> Result<f32, DriverError> {
        let lsb = self.require_calibration()?.power_lsb;
        let raw = self.read_register(Register::Power)?;
        Ok(f32::from(raw) * lsb)
    }

    /// Read all four quantities.  The first failure aborts the whole read.
    pub fn read_all(&mut self) -> Result<PowerSample, DriverError> {
        // Fail before touching the bus so an uncalibrated chip costs nothing.
        self.require_calibration()?;
        Ok(PowerSample {
            shunt_v: self.read_shunt_voltage()?,
            bus_v: self.read_bus_voltage()?,
            current_a: self.read_current()?,
            power_w: self.read_power()?,
        })
    }

    /// Give the bus back (e.g. to share it with the display after shutdown).
    pub fn release(self) -> I {
        self.i2c
    }

    // ── Internal ──────────────────────────────────────────────────

    fn require_calibration(&self) -> Result<&CalibrationProfile, DriverError> {
        self.calibration.as_ref().ok_or_else(|| {
            error!("INA219@0x{:02x}: current/power requested before calibration", self.address);
            DriverError::Uncalibrated
        })
    }

    fn read_register(&mut self, reg: Register) -> Result<u16, DriverError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[reg as u8], &mut buf)
            .map_err(|e| {
                warn!("INA219@0x{:02x}: read {:?} failed: {:?}", self.address, reg, e.kind());
                DriverError::Bus
            })?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read_register_signed(&mut self, reg: Register) -> Result<i16, DriverError> {
        // Two's complement: reinterpret the raw bits.
        self.read_register(reg).map(|raw| raw as i16)
    }

    fn write_register(&mut self, reg: Register, value: u16) -> Result<(), DriverError> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c
            .write(self.address, &[reg as u8, hi, lo])
            .map_err(|e| {
                warn!("INA219@0x{:02x}: write {:?} failed: {:?}", self.address, reg, e.kind());
                DriverError::Bus
            })
    }
}
