//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`], the INA219 [`PowerMeterDriver`] and the
//! [`ActuatorBank`], exposing them through [`SensorPort`] and
//! [`ActuatorPort`].  This is the only module in the system that touches
//! actual hardware; everything is generic over `embedded-hal` traits so the
//! same adapter runs against mocks on the host.

use chrono::{DateTime, Utc};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use log::{error, warn};

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::config::GuardConfig;
use crate::drivers::actuators::{ActuatorBank, Bank, BeepPattern, Channel};
use crate::drivers::ina219::{CalibrationProfile, PowerMeterDriver};
use crate::drivers::output::OutputState;
use crate::error::{DriverError, Error};
use crate::sensors::{AdcChannel, AmbientSensor, SensorHub, SensorReading};

/// Pause between startup calibration attempts.
const CALIBRATION_RETRY_MS: u32 = 200;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<I, S, A, P, D> {
    sensors: SensorHub<S, A>,
    meter: PowerMeterDriver<I>,
    outputs: ActuatorBank<P, D>,
    bus_failures: u32,
}

impl<I, S, A, P, D> HardwareAdapter<I, S, A, P, D>
where
    I: I2c,
    S: AmbientSensor,
    A: AdcChannel,
    P: OutputPin,
    D: DelayNs,
{
    pub fn new(sensors: SensorHub<S, A>, meter: PowerMeterDriver<I>, outputs: ActuatorBank<P, D>) -> Self {
        Self {
            sensors,
            meter,
            outputs,
            bus_failures: 0,
        }
    }

    /// Write the INA219 calibration, retrying up to
    /// `startup_calibration_attempts` times.  Failure here is fatal for
    /// the firmware: current and power would be unavailable forever.
    pub fn calibrate(
        &mut self,
        config: &GuardConfig,
        delay: &mut impl DelayNs,
    ) -> Result<CalibrationProfile, Error> {
        let attempts = config.startup_calibration_attempts.max(1);
        let mut last = DriverError::Bus;
        for attempt in 1..=attempts {
            match self.meter.configure(config.calibration_value, config.shunt_ohm) {
                Ok(profile) => return Ok(profile),
                // Bad parameters will not improve with retries.
                Err(DriverError::InvalidCalibration) => {
                    return Err(DriverError::InvalidCalibration.into());
                }
                Err(e) => {
                    warn!("INA219 calibration attempt {attempt}/{attempts} failed: {e}");
                    last = e;
                    if attempt < attempts {
                        delay.delay_ms(CALIBRATION_RETRY_MS);
                    }
                }
            }
        }
        error!("INA219 never acknowledged calibration");
        Err(last.into())
    }

    pub fn meter(&self) -> &PowerMeterDriver<I> {
        &self.meter
    }

    pub fn outputs(&self) -> &ActuatorBank<P, D> {
        &self.outputs
    }

    pub fn sensors(&self) -> &SensorHub<S, A> {
        &self.sensors
    }

    /// Power-meter reads that failed since startup.
    pub fn bus_failures(&self) -> u32 {
        self.bus_failures
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<I, S, A, P, D> SensorPort for HardwareAdapter<I, S, A, P, D>
where
    I: I2c,
    S: AmbientSensor,
    A: AdcChannel,
    P: OutputPin,
    D: DelayNs,
{
    fn read_all(&mut self, now: DateTime<Utc>) -> SensorReading {
        let env = self.sensors.read_all();
        let mut reading = SensorReading::empty(now);
        reading.temperature_env = env.temperature_env;
        reading.humidity_env = env.humidity_env;
        reading.temperature_analog = env.temperature_analog;

        match self.meter.read_all() {
            Ok(s) => {
                reading.bus_voltage_v = Some(s.bus_v);
                reading.current_a = Some(s.current_a);
                reading.power_w = Some(s.power_w);
            }
            Err(DriverError::Uncalibrated) => {
                // Bus voltage needs no calibration; keep overvoltage
                // protection alive.
                reading.bus_voltage_v = self.meter.read_bus_voltage().ok();
            }
            Err(e) => {
                self.bus_failures = self.bus_failures.saturating_add(1);
                warn!("power meter unavailable this cycle: {e}");
            }
        }
        reading
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<I, S, A, P, D> ActuatorPort for HardwareAdapter<I, S, A, P, D>
where
    I: I2c,
    S: AmbientSensor,
    A: AdcChannel,
    P: OutputPin,
    D: DelayNs,
{
    fn set_relay(&mut self, bank: Bank, channel: Channel, on: bool) {
        self.outputs.set(bank, channel, on);
    }

    fn relay_state(&self, bank: Bank, channel: Channel) -> OutputState {
        self.outputs.get_state(bank, channel)
    }

    fn all_relays_off(&mut self) {
        for bank in Bank::ALL {
            self.outputs.all_off(bank);
        }
    }

    fn set_fan(&mut self, on: bool) {
        self.outputs.fan_set(on);
    }

    fn fan_state(&self) -> OutputState {
        self.outputs.fan_state()
    }

    fn beep(&mut self, pattern: BeepPattern) {
        self.outputs.beep(pattern);
    }

    fn reassert_outputs(&mut self) {
        let retried = self.outputs.reassert_failed();
        if retried > 0 {
            warn!("re-driving {retried} output(s) after failed writes");
        }
    }
}
