//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements          | Connects to                  |
//! |--------------|---------------------|------------------------------|
//! | `hardware`   | SensorPort          | DHT11, ADC probe, INA219     |
//! |              | ActuatorPort        | Relays, fan, buzzer GPIO     |
//! | `log_sink`   | EventSink           | Serial log output            |
//! | `publisher`  | TelemetryPublisher  | Serial log (JSON records)    |
//! | `display`    | DisplayPort         | Serial log (panel layout)    |
//! | `time`       | -                   | System clock / esp_timer     |
//! | `device_id`  | -                   | eFuse MAC                    |

pub mod device_id;
pub mod display;
pub mod hardware;
pub mod log_sink;
pub mod publisher;
pub mod time;
