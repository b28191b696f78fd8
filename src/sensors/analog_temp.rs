//! Analog temperature probe (LM35 / TMP36) on a 12-bit ADC channel.
//!
//! The ADC is configured for the full 0 – 3.3 V range (11 dB attenuation),
//! so `V = raw / 4095 × 3.3`.  Both supported probes are 10 mV/°C; the
//! TMP36 adds a 500 mV offset.

use embedded_hal::delay::DelayNs;

use super::AdcChannel;
use crate::config::AnalogSensorKind;
use crate::error::SensorError;

const ADC_MAX: f32 = 4095.0;
const V_REF: f32 = 3.3;
const VOLTS_PER_DEGREE: f32 = 0.01;
const TMP36_OFFSET_V: f32 = 0.5;

/// Plausibility window; anything outside is treated as a wiring fault.
const MIN_PLAUSIBLE_C: f32 = -40.0;
const MAX_PLAUSIBLE_C: f32 = 150.0;

pub struct AnalogTempSensor<A> {
    adc: A,
    kind: AnalogSensorKind,
    last_c: Option<f32>,
}

impl<A: AdcChannel> AnalogTempSensor<A> {
    pub fn new(adc: A, kind: AnalogSensorKind) -> Self {
        Self {
            adc,
            kind,
            last_c: None,
        }
    }

    /// Probe output voltage.
    pub fn read_voltage(&mut self) -> Result<f32, SensorError> {
        let raw = self.adc.read_raw()?;
        Ok(f32::from(raw) / ADC_MAX * V_REF)
    }

    /// One conversion in °C.
    pub fn read_temperature(&mut self) -> Result<f32, SensorError> {
        let volts = self.read_voltage()?;
        let celsius = match self.kind {
            AnalogSensorKind::Lm35 => volts / VOLTS_PER_DEGREE,
            AnalogSensorKind::Tmp36 => (volts - TMP36_OFFSET_V) / VOLTS_PER_DEGREE,
        };
        if !(MIN_PLAUSIBLE_C..=MAX_PLAUSIBLE_C).contains(&celsius) {
            return Err(SensorError::OutOfRange);
        }
        self.last_c = Some(celsius);
        Ok(celsius)
    }

    /// Mean of `samples` conversions spaced `spacing_ms` apart.  Any failed
    /// conversion fails the whole average.
    pub fn read_average(
        &mut self,
        samples: u16,
        spacing_ms: u32,
        delay: &mut impl DelayNs,
    ) -> Result<f32, SensorError> {
        let samples = samples.max(1);
        let mut total = 0.0;
        for i in 0..samples {
            total += self.read_temperature()?;
            if i + 1 < samples {
                delay.delay_ms(spacing_ms);
            }
        }
        let avg = total / f32::from(samples);
        self.last_c = Some(avg);
        Ok(avg)
    }

    /// Last good reading (diagnostics only).
    pub fn last_temperature(&self) -> Option<f32> {
        self.last_c
    }
}

pub fn celsius_to_fahrenheit(c: f32) -> f32 {
    c * 9.0 / 5.0 + 32.0
}
