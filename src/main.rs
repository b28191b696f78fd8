//! PowerGuard Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter    LogEventSink   LogTelemetryPublisher       │
//! │  (Sensor+Actuator)  (EventSink)    (TelemetryPublisher)        │
//! │  LogDisplay         CommandInbox   SystemClock                 │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │             GuardService (pure logic)                  │    │
//! │  │  Safety · Energy · Commands · Telemetry                │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_svc::hal::delay::{Ets, FreeRtos};
use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, OutputPin, PinDriver};
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::units::Hertz;

use powerguard::adapters::device_id;
use powerguard::adapters::display::LogDisplay;
use powerguard::adapters::hardware::HardwareAdapter;
use powerguard::adapters::log_sink::LogEventSink;
use powerguard::adapters::publisher::LogTelemetryPublisher;
use powerguard::adapters::time::SystemClock;
use powerguard::app::ports::NullTransport;
use powerguard::app::service::GuardService;
use powerguard::config::GuardConfig;
use powerguard::drivers::actuators::{ActuatorBank, Buzzer, RelayBank};
use powerguard::drivers::hw_init::{BoundedI2c, HwInitError, OneshotAdc};
use powerguard::drivers::ina219::PowerMeterDriver;
use powerguard::drivers::output::PolarityOutput;
use powerguard::drivers::watchdog::{self, Watchdog};
use powerguard::inbox::CommandInbox;
use powerguard::pins;
use powerguard::sensors::analog_temp::AnalogTempSensor;
use powerguard::sensors::dht11::Dht11;
use powerguard::sensors::SensorHub;

/// Optional compile-time JSON override for [`GuardConfig`].
const CONFIG_OVERRIDE: Option<&str> = option_env!("POWERGUARD_CONFIG_JSON");

fn load_config() -> GuardConfig {
    let Some(json) = CONFIG_OVERRIDE else {
        info!("Config: defaults");
        return GuardConfig::default();
    };
    match GuardConfig::from_json(json.as_bytes()) {
        Ok(cfg) => {
            info!("Config: build-time override applied");
            cfg
        }
        Err(e) => {
            warn!("Config override rejected ({}), using defaults", e);
            GuardConfig::default()
        }
    }
}

fn output(pin: AnyOutputPin) -> Result<PinDriver<'static, AnyOutputPin, Output>> {
    PinDriver::output(pin).map_err(|e| HwInitError::GpioConfigFailed(e.code()).into())
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PowerGuard v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration + identity ───────────────────────────
    let config = load_config();
    let mac = device_id::read_mac();
    let id = device_id::resolve(&config.device_id, &mac);
    info!("Device ID: {}", id);

    // ── 3. Outputs first, so every load is OFF before anything else ──
    let p = Peripherals::take()?;
    info!("Outputs on GPIO {:?}", pins::OUTPUT_GPIOS);

    let bank1 = RelayBank::new(
        output(p.pins.gpio26.downgrade_output())?,
        output(p.pins.gpio27.downgrade_output())?,
        config.relay_active_high,
    );
    let bank2 = RelayBank::new(
        output(p.pins.gpio32.downgrade_output())?,
        output(p.pins.gpio33.downgrade_output())?,
        config.relay_active_high,
    );
    let fan = PolarityOutput::new(
        output(p.pins.gpio25.downgrade_output())?,
        config.fan_active_high,
        "fan",
    );
    let buzzer = Buzzer::new(
        output(p.pins.gpio13.downgrade_output())?,
        config.buzzer_active_high,
        FreeRtos,
    );
    let outputs = ActuatorBank::new(bank1, bank2, fan, buzzer);

    // ── 4. Sensors ────────────────────────────────────────────
    let dht_pin = PinDriver::input_output_od(p.pins.gpio14)
        .map_err(|e| HwInitError::GpioConfigFailed(e.code()))?;
    let dht = Dht11::new(dht_pin, Ets);
    let adc = OneshotAdc::init()?;
    let analog = AnalogTempSensor::new(adc, config.analog_sensor);
    let sensors = SensorHub::new(dht, analog);

    // ── 5. Power meter ────────────────────────────────────────
    let i2c_cfg = I2cConfig::new().baudrate(Hertz(pins::I2C_BAUDRATE_HZ));
    let i2c = I2cDriver::new(p.i2c0, p.pins.gpio21, p.pins.gpio22, &i2c_cfg)
        .map_err(|e| HwInitError::I2cInitFailed(e.code()))?;
    let bus = BoundedI2c::new(i2c, config.bus_timeout_ms);
    let meter = PowerMeterDriver::new(bus, config.ina219_address);

    let mut hw = HardwareAdapter::new(sensors, meter, outputs);
    if let Err(e) = hw.calibrate(&config, &mut FreeRtos) {
        error!("Power meter calibration failed: {}; halting", e);
        return Err(e.into());
    }

    // ── 6. Service + collaborators ────────────────────────────
    let watchdog = Watchdog::new(watchdog::timeout_for(config.poll_interval_ms));
    let clock = SystemClock::new();
    let inbox = CommandInbox::new();
    let mut transport = NullTransport;
    let mut display = LogDisplay::new();
    let mut publisher = LogTelemetryPublisher::new(&id);
    let mut sink = LogEventSink::new();

    let mut service = GuardService::new(&config, &id);
    service.start(&mut sink);
    if !clock.is_synced() {
        warn!("Wall clock not synced; timestamps will read 1970 until SNTP completes");
    }

    // ── 7. Control loop ───────────────────────────────────────
    loop {
        let started_us = clock.uptime_us();

        service.tick(
            clock.now(),
            &mut hw,
            &mut transport,
            &inbox,
            &mut display,
            &mut publisher,
            &mut sink,
        );
        watchdog.feed();

        let elapsed_ms = (clock.uptime_us().saturating_sub(started_us) / 1000) as u32;
        FreeRtos::delay_ms(config.poll_interval_ms.saturating_sub(elapsed_ms));
    }
}
