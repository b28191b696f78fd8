//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::GuardEvent;
use crate::app::ports::EventSink;

/// Render an optional reading, `NA` when absent.
struct Opt(Option<f32>, usize);

impl core::fmt::Display for Opt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{:.*}", self.1, v),
            None => f.write_str("NA"),
        }
    }
}

/// Adapter that logs every [`GuardEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &GuardEvent) {
        match event {
            GuardEvent::Telemetry(t) => {
                info!(
                    "TELEM | mode={} | dht={}\u{00b0}C/{}% analog={}\u{00b0}C | \
                     V={}V I={}mA P={}mW | cost={:.4} | relays={} {} {} {} fan={}",
                    t.mode,
                    Opt(t.dht_temperature_c, 1),
                    Opt(t.dht_humidity_pct, 0),
                    Opt(t.analog_temperature_c, 1),
                    Opt(t.bus_voltage_v, 3),
                    Opt(t.current_ma, 1),
                    Opt(t.power_mw, 1),
                    t.price,
                    t.relay_1,
                    t.relay_2,
                    t.relay_3,
                    t.relay_4,
                    t.fan,
                );
            }
            GuardEvent::ModeChanged { from, to } => {
                info!("MODE | {} -> {}", from, to);
            }
            GuardEvent::Tripped(flags) => {
                warn!("TRIP | flags=0b{:08b}", flags);
            }
            GuardEvent::CommandApplied(name) => {
                info!("CMD | applied {}", name);
            }
            GuardEvent::CommandRejected(e) => {
                warn!("CMD | rejected: {}", e);
            }
            GuardEvent::CommandRefused(name) => {
                warn!("CMD | refused {}", name);
            }
            GuardEvent::PublishFailed { error, total } => {
                warn!("PUB | failed ({}), {} total", error, total);
            }
            GuardEvent::Started { device_id } => {
                info!("START | device_id={}", device_id);
            }
        }
    }
}
