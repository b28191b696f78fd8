//! Status display adapter.
//!
//! The board has room for a 128×32 panel: three 16-column lines.
//! [`LogDisplay`] lays the screen out exactly as the panel would and writes
//! it through the log facade, so the layout can be checked without the
//! panel fitted.

use core::fmt::Write;

use heapless::String;
use log::info;

use crate::app::events::TelemetryData;
use crate::app::ports::DisplayPort;

/// Characters per panel line.
pub const LINE_WIDTH: usize = 16;

pub type Line = String<32>;

fn na(v: Option<f32>, prec: usize) -> String<12> {
    let mut s = String::new();
    let _ = match v {
        Some(x) => write!(s, "{:.*}", prec, x),
        None => s.write_str("NA"),
    };
    s
}

/// The three status lines for `t`.
pub fn status_lines(t: &TelemetryData) -> [Line; 3] {
    let mut l1 = Line::new();
    let mut l2 = Line::new();
    let mut l3 = Line::new();
    let _ = write!(
        l1,
        "T:{}C H:{}%",
        na(t.dht_temperature_c, 0),
        na(t.dht_humidity_pct, 0)
    );
    let _ = write!(l2, "V:{} I:{}", na(t.bus_voltage_v, 2), na(t.current_ma, 0));
    let _ = write!(l3, "Fan:{} Price:{:.2}", t.fan, t.price);
    [l1, l2, l3]
}

/// Panel stand-in that logs each refresh.
#[derive(Default)]
pub struct LogDisplay {
    last: [Line; 3],
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// What the panel currently shows.
    pub fn lines(&self) -> &[Line; 3] {
        &self.last
    }
}

impl DisplayPort for LogDisplay {
    fn show_status(&mut self, data: &TelemetryData) {
        self.last = status_lines(data);
        info!("OLED | {} | {} | {}", self.last[0], self.last[1], self.last[2]);
    }

    fn show_warning(&mut self, text: &str) {
        let mut l1 = Line::new();
        let mut l2 = Line::new();
        let _ = l1.push_str("WARN:");
        for ch in text.chars().take(LINE_WIDTH) {
            let _ = l2.push(ch);
        }
        self.last = [l1, l2, Line::new()];
        info!("OLED | {} {}", self.last[0], self.last[1]);
    }
}
