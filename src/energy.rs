//! Energy cost accumulator.
//!
//! Integrates measured power over the control period and prices it at a
//! flat per-kWh tariff.  Cycles with no power reading add nothing.

use log::info;

const SECS_PER_HOUR: f32 = 3600.0;

/// Cost of running `avg_power_w` for `duration_s` at `price_per_kwh`.
pub fn calculate_price(price_per_kwh: f32, duration_s: f32, avg_power_w: f32) -> f32 {
    let kwh = avg_power_w / 1000.0 * (duration_s / SECS_PER_HOUR);
    kwh * price_per_kwh
}

pub struct EnergyMeter {
    rate_per_kwh: f32,
    recording: bool,
    energy_wh: f64,
    cost: f64,
}

impl EnergyMeter {
    /// Recording starts enabled.
    pub fn new(rate_per_kwh: f32) -> Self {
        Self {
            rate_per_kwh,
            recording: true,
            energy_wh: 0.0,
            cost: 0.0,
        }
    }

    /// Add one cycle of `dt_s` seconds at `power_w`.
    pub fn accumulate(&mut self, power_w: Option<f32>, dt_s: f32) {
        if !self.recording {
            return;
        }
        let Some(p) = power_w else { return };
        if !p.is_finite() || p < 0.0 {
            return;
        }
        self.energy_wh += f64::from(p) * f64::from(dt_s) / f64::from(SECS_PER_HOUR);
        self.cost += f64::from(calculate_price(self.rate_per_kwh, dt_s, p));
    }

    pub fn set_recording(&mut self, enabled: bool) {
        if self.recording != enabled {
            info!("energy: price recording {}", if enabled { "resumed" } else { "paused" });
        }
        self.recording = enabled;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Accumulated cost in currency units.
    pub fn cost(&self) -> f32 {
        self.cost as f32
    }

    /// Accumulated energy in watt-hours.
    pub fn energy_wh(&self) -> f32 {
        self.energy_wh as f32
    }
}
