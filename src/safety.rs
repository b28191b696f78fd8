//! Safety controller.
//!
//! The controller runs **every cycle right after the sensor read** and
//! drives the actuators directly through [`ActuatorPort`].  Checks are
//! evaluated in priority order:
//!
//! 1. Overcurrent: cut every relay, alarm, skip the remaining checks.
//! 2. Overvoltage: cut every relay, force the fan on, alarm.
//! 3. Ambient over-temperature: cut every relay, ambient alarm.
//! 4. Analog-fan hysteresis: fan on at `on_level`, off at `off_level`,
//!    untouched in between.
//!
//! ## Trip lifecycle
//!
//! Emergency conditions are **level-triggered**.  Each cycle starts from a
//! clean slate; a trip bit is set only while its reading is over the limit.
//! Nothing latches, so relays that were cut stay cut only until something
//! else (a remote command) switches them back on.
//!
//! A reading that is absent this cycle never satisfies its check.

use core::fmt;

use log::{error, info, warn};

use crate::app::ports::ActuatorPort;
use crate::config::GuardConfig;
use crate::drivers::actuators::BeepPattern;
use crate::sensors::SensorReading;

// ── Thresholds ────────────────────────────────────────────────

/// On/off pair with `off_level < on_level`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisThreshold {
    on_level: f32,
    off_level: f32,
}

impl HysteresisThreshold {
    /// `None` unless both levels are finite and `off < on`.
    pub fn new(on_level: f32, off_level: f32) -> Option<Self> {
        if on_level.is_finite() && off_level.is_finite() && off_level < on_level {
            Some(Self {
                on_level,
                off_level,
            })
        } else {
            None
        }
    }

    pub fn on_level(&self) -> f32 {
        self.on_level
    }

    pub fn off_level(&self) -> f32 {
        self.off_level
    }

    /// Next output given the current `value` and the previous output.
    pub fn decide(&self, value: f32, previous: bool) -> bool {
        if value >= self.on_level {
            true
        } else if value <= self.off_level {
            false
        } else {
            previous
        }
    }
}

// ── Mode and trips ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyMode {
    Normal,
    FanActive,
    Emergency,
}

impl fmt::Display for SafetyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "NORMAL"),
            Self::FanActive => write!(f, "FAN_ACTIVE"),
            Self::Emergency => write!(f, "EMERGENCY"),
        }
    }
}

/// Individual conditions, one bit each in [`SafetyOutcome::trips`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SafetyTrip {
    Overcurrent = 0b0000_0001,
    Overvoltage = 0b0000_0010,
    AmbientOverTemp = 0b0000_0100,
    /// Not an emergency: the analog rule has the fan engaged.
    FanEngaged = 0b0000_1000,
}

impl SafetyTrip {
    pub const ALL: [SafetyTrip; 4] = [
        SafetyTrip::Overcurrent,
        SafetyTrip::Overvoltage,
        SafetyTrip::AmbientOverTemp,
        SafetyTrip::FanEngaged,
    ];

    /// Bits that put the controller in [`SafetyMode::Emergency`].
    pub const EMERGENCY_MASK: u8 = Self::Overcurrent.mask()
        | Self::Overvoltage.mask()
        | Self::AmbientOverTemp.mask();

    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SafetyTrip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overcurrent => write!(f, "overcurrent"),
            Self::Overvoltage => write!(f, "overvoltage"),
            Self::AmbientOverTemp => write!(f, "ambient over-temperature"),
            Self::FanEngaged => write!(f, "fan engaged"),
        }
    }
}

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyOutcome {
    pub mode: SafetyMode,
    pub trips: u8,
}

impl SafetyOutcome {
    pub fn has(&self, trip: SafetyTrip) -> bool {
        self.trips & trip.mask() != 0
    }
}

// ── Controller ────────────────────────────────────────────────

pub struct SafetyController {
    fan: HysteresisThreshold,
    ambient_shutoff_c: f32,
    overvoltage_v: f32,
    overcurrent_ma: f32,
    mode: SafetyMode,
    /// Last analog-fan decision, the only state carried between cycles.
    fan_on: bool,
    /// Trip bits from the previous cycle, for set/cleared logging.
    trips: u8,
}

impl SafetyController {
    /// Build from a validated config.  Inverted fan thresholds are rejected
    /// by [`GuardConfig::validate`]; if one slips through, the defaults are
    /// used and the fault is logged.
    pub fn new(config: &GuardConfig) -> Self {
        let fan = config.fan_threshold().unwrap_or_else(|e| {
            error!("safety: {e}; using default fan thresholds");
            let d = GuardConfig::default();
            HysteresisThreshold {
                on_level: d.fan_on_temp_c,
                off_level: d.fan_off_temp_c,
            }
        });
        Self {
            fan,
            ambient_shutoff_c: config.ambient_shutoff_temp_c,
            overvoltage_v: config.overvoltage_v,
            overcurrent_ma: config.overcurrent_ma,
            mode: SafetyMode::Normal,
            fan_on: false,
            trips: 0,
        }
    }

    /// Evaluate one reading and drive the outputs accordingly.
    pub fn evaluate(
        &mut self,
        reading: &SensorReading,
        hw: &mut impl ActuatorPort,
    ) -> SafetyOutcome {
        let mut trips = 0u8;

        // ── 1. Overcurrent ────────────────────────────────────
        if reading
            .current_ma()
            .is_some_and(|ma| ma >= self.overcurrent_ma)
        {
            hw.all_relays_off();
            hw.beep(BeepPattern::ALARM);
            trips |= SafetyTrip::Overcurrent.mask();
            if self.fan_on {
                trips |= SafetyTrip::FanEngaged.mask();
            }
            return self.finish(trips);
        }

        // ── 2. Overvoltage ────────────────────────────────────
        let overvoltage = reading
            .bus_voltage_v
            .is_some_and(|v| v >= self.overvoltage_v);
        if overvoltage {
            hw.all_relays_off();
            hw.set_fan(true);
            hw.beep(BeepPattern::ALARM);
            trips |= SafetyTrip::Overvoltage.mask();
        }

        // ── 3. Ambient over-temperature ───────────────────────
        if reading
            .temperature_env
            .is_some_and(|t| t >= self.ambient_shutoff_c)
        {
            hw.all_relays_off();
            hw.beep(BeepPattern::AMBIENT);
            trips |= SafetyTrip::AmbientOverTemp.mask();
        }

        // ── 4. Analog fan (hysteresis) ────────────────────────
        if let Some(t) = reading.temperature_analog {
            let next = self.fan.decide(t, self.fan_on);
            if next && !self.fan_on {
                info!("safety: analog {t:.1}\u{00b0}C >= {:.1}, fan on", self.fan.on_level);
                hw.beep(BeepPattern::NOTICE);
            } else if !next && self.fan_on {
                info!("safety: analog {t:.1}\u{00b0}C <= {:.1}, fan off", self.fan.off_level);
            }
            self.fan_on = next;

            if t >= self.fan.on_level {
                hw.set_fan(true);
            } else if t <= self.fan.off_level && !overvoltage {
                hw.set_fan(false);
            }
        }
        if self.fan_on {
            trips |= SafetyTrip::FanEngaged.mask();
        }

        self.finish(trips)
    }

    /// Current mode (as of the last evaluation).
    pub fn mode(&self) -> SafetyMode {
        self.mode
    }

    /// Last analog-fan decision.
    pub fn fan_decision(&self) -> bool {
        self.fan_on
    }

    /// A remote fan command overrode the output; align the hysteresis
    /// memory so the next in-band reading does not fight it.
    pub fn note_fan_override(&mut self, on: bool) {
        if self.fan_on != on {
            info!("safety: fan decision overridden -> {}", if on { "ON" } else { "OFF" });
        }
        self.fan_on = on;
    }

    pub fn fan_threshold(&self) -> HysteresisThreshold {
        self.fan
    }

    // ── Internal ──────────────────────────────────────────────

    fn finish(&mut self, trips: u8) -> SafetyOutcome {
        for trip in SafetyTrip::ALL {
            self.log_transition(trip, trips);
        }
        self.trips = trips;

        let mode = if trips & SafetyTrip::EMERGENCY_MASK != 0 {
            SafetyMode::Emergency
        } else if trips & SafetyTrip::FanEngaged.mask() != 0 {
            SafetyMode::FanActive
        } else {
            SafetyMode::Normal
        };
        if mode != self.mode {
            warn!("SAFETY MODE: {} -> {}", self.mode, mode);
            self.mode = mode;
        }
        SafetyOutcome { mode, trips }
    }

    fn log_transition(&self, trip: SafetyTrip, now: u8) {
        let was = self.trips & trip.mask() != 0;
        let is = now & trip.mask() != 0;
        if trip == SafetyTrip::FanEngaged {
            return;
        }
        if is && !was {
            error!("SAFETY TRIP SET: {trip}");
        } else if was && !is {
            info!("SAFETY TRIP CLEARED: {trip}");
        }
    }
}
