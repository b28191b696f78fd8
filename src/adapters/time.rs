//! Clock adapter.
//!
//! Wall-clock timestamps for telemetry plus monotonic uptime.
//!
//! - **`target_os = "espidf"`**: uptime from `esp_timer_get_time()`;
//!   wall clock from the IDF `gettimeofday`, which reads 1970 until SNTP
//!   has synced.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` and the host
//!   clock.

use chrono::{DateTime, TimeZone, Utc};

/// Anything before 2020-01-01 means the clock has not been set.
const EPOCH_2020: i64 = 1_577_836_800;

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Current UTC time.
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Whether the wall clock looks synced.
    pub fn is_synced(&self) -> bool {
        is_plausible(&self.now())
    }

    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

pub fn is_plausible(ts: &DateTime<Utc>) -> bool {
    ts.timestamp() >= EPOCH_2020
}

/// Timestamp from Unix seconds, `None` when out of range.
pub fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}
