//! Telemetry publisher adapter.
//!
//! Encodes each record as JSON and writes it to the console under the
//! topic the pub/sub client would use.  A broker-backed client implements
//! the same [`TelemetryPublisher`] port.

use log::info;

use crate::app::events::TelemetryData;
use crate::app::ports::TelemetryPublisher;
use crate::error::PublishError;

pub type Topic = heapless::String<64>;

/// `powerguard/<device_id>/telemetry`
pub fn telemetry_topic(device_id: &str) -> Topic {
    let mut t = Topic::new();
    let _ = t.push_str("powerguard/");
    for ch in device_id.chars() {
        if t.push(ch).is_err() {
            break;
        }
    }
    let _ = t.push_str("/telemetry");
    t
}

pub struct LogTelemetryPublisher {
    topic: Topic,
    published: u64,
}

impl LogTelemetryPublisher {
    pub fn new(device_id: &str) -> Self {
        Self {
            topic: telemetry_topic(device_id),
            published: 0,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn published(&self) -> u64 {
        self.published
    }
}

impl TelemetryPublisher for LogTelemetryPublisher {
    fn publish(&mut self, data: &TelemetryData) -> Result<(), PublishError> {
        let json = data.to_json()?;
        info!("PUB | {} {}", self.topic, json);
        self.published += 1;
        Ok(())
    }
}
