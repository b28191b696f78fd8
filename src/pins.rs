//! GPIO / peripheral pin assignments for the PowerGuard board (ESP32).
//!
//! Single source of truth: `main` takes its pins from here rather than
//! hard-coding numbers.

// ---------------------------------------------------------------------------
// I2C0: INA219 power meter
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
/// Bus clock.
pub const I2C_BAUDRATE_HZ: u32 = 400_000;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// DHT11 data line (open-drain, external pull-up).
pub const DHT11_GPIO: i32 = 14;

/// Analog temperature probe.  GPIO 35 is ADC1 channel 7 on the ESP32.
pub const ANALOG_TEMP_GPIO: i32 = 35;
pub const ANALOG_TEMP_ADC_CHANNEL: u32 = 7;

// ---------------------------------------------------------------------------
// Relay boards (two dual-channel modules)
// ---------------------------------------------------------------------------

pub const RELAY_BANK1_CH1_GPIO: i32 = 26;
pub const RELAY_BANK1_CH2_GPIO: i32 = 27;
pub const RELAY_BANK2_CH1_GPIO: i32 = 32;
pub const RELAY_BANK2_CH2_GPIO: i32 = 33;

// ---------------------------------------------------------------------------
// Fan and buzzer
// ---------------------------------------------------------------------------

/// DC fan driver (relay or MOSFET).
pub const FAN_GPIO: i32 = 25;
/// Active buzzer.
pub const BUZZER_GPIO: i32 = 13;

/// Every digital output, for bring-up logging.
pub const OUTPUT_GPIOS: [i32; 6] = [
    RELAY_BANK1_CH1_GPIO,
    RELAY_BANK1_CH2_GPIO,
    RELAY_BANK2_CH1_GPIO,
    RELAY_BANK2_CH2_GPIO,
    FAN_GPIO,
    BUZZER_GPIO,
];
