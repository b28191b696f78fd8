//! Polarity-aware digital output.
//!
//! Relay boards, fan drivers and buzzers come in both active-high and
//! active-low variants.  [`PolarityOutput`] hides the difference: callers
//! deal in logical ON/OFF, the line level is derived as
//! `active_high ? on : !on`.
//!
//! The logical state is recorded even when the pin write fails.  The
//! output remembers the failure and [`PolarityOutput::reassert`] re-drives
//! the intended level; the control loop calls it once per cycle.

use core::fmt;

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::error::ActuatorError;

/// Logical output state as reported to callers and in telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    On,
    Off,
}

impl OutputState {
    /// Telemetry spelling: `"ON"` / `"OFF"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }
}

impl From<bool> for OutputState {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

impl fmt::Display for OutputState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct PolarityOutput<P> {
    pin: P,
    active_high: bool,
    on: bool,
    /// Last write did not reach the line.
    write_failed: bool,
    label: &'static str,
}

impl<P: OutputPin> PolarityOutput<P> {
    /// Take ownership of `pin` and drive it to the logical OFF level.
    pub fn new(pin: P, active_high: bool, label: &'static str) -> Self {
        let mut out = Self {
            pin,
            active_high,
            on: false,
            write_failed: false,
            label,
        };
        // Logged inside; the recorded state is already OFF.
        let _ = out.set(false);
        out
    }

    /// Drive the output to the logical state `on`.
    pub fn set(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.on = on;
        let level_high = on == self.active_high;
        let res = if level_high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        self.write_failed = res.is_err();
        res.map_err(|e| {
            warn!("{}: GPIO write failed: {:?}", self.label, e);
            ActuatorError::GpioWriteFailed
        })
    }

    /// Retry the recorded state if the last write failed.  Returns `true`
    /// when a retry was made.
    pub fn reassert(&mut self) -> bool {
        if !self.write_failed {
            return false;
        }
        let _ = self.set(self.on);
        true
    }


    pub fn state(&self) -> OutputState {
        OutputState::from(self.on)
    }

}
