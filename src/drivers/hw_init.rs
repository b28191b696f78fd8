//! Target peripheral glue.
//!
//! - The analog probe is read through the ESP-IDF oneshot ADC API using
//!   raw sys calls, configured once from `main()` before the loop starts.
//! - [`BoundedI2c`] wraps the IDF I2C driver so every transaction carries
//!   the configured timeout instead of blocking forever.
//!
//! On the host these types do not exist; tests use `embedded-hal` mocks.

use core::fmt;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    I2cInitFailed(i32),
    GpioConfigFailed(i32),
}

impl fmt::Display for HwInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::I2cInitFailed(rc) => write!(f, "I2C init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        match e {
            HwInitError::AdcInitFailed(_) => Self::Init("ADC1"),
            HwInitError::I2cInitFailed(_) => Self::Init("I2C0"),
            HwInitError::GpioConfigFailed(_) => Self::Init("GPIO"),
        }
    }
}

#[cfg(target_os = "espidf")]
pub use target::*;

#[cfg(target_os = "espidf")]
mod target {
    use esp_idf_svc::hal::delay::TickType;
    use esp_idf_svc::hal::i2c::I2cDriver;
    use esp_idf_svc::sys::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
    use log::info;

    use super::HwInitError;
    use crate::error::SensorError;
    use crate::pins;
    use crate::sensors::AdcChannel;

    // ── ADC (oneshot) ─────────────────────────────────────────

    /// One configured ADC1 channel.
    pub struct OneshotAdc {
        handle: adc_oneshot_unit_handle_t,
        channel: adc_channel_t,
    }

    impl OneshotAdc {
        /// Create ADC1 and configure the analog probe channel (12-bit,
        /// full-scale attenuation).  Call once.
        pub fn init() -> Result<Self, HwInitError> {
            let init_cfg = adc_oneshot_unit_init_cfg_t {
                unit_id: adc_unit_t_ADC_UNIT_1,
                ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..Default::default()
            };
            let mut handle: adc_oneshot_unit_handle_t = core::ptr::null_mut();
            // SAFETY: called once from main() before the control loop.
            let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &mut handle) };
            if ret != ESP_OK as i32 {
                return Err(HwInitError::AdcInitFailed(ret));
            }

            let chan_cfg = adc_oneshot_chan_cfg_t {
                atten: adc_atten_t_ADC_ATTEN_DB_12,
                bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
            };
            let channel = pins::ANALOG_TEMP_ADC_CHANNEL;
            // SAFETY: handle was just created above.
            let ret = unsafe { adc_oneshot_config_channel(handle, channel, &chan_cfg) };
            if ret != ESP_OK as i32 {
                return Err(HwInitError::AdcInitFailed(ret));
            }

            info!("hw_init: ADC1 CH{} configured (analog temp)", channel);
            Ok(Self { handle, channel })
        }
    }

    impl AdcChannel for OneshotAdc {
        fn read_raw(&mut self) -> Result<u16, SensorError> {
            let mut raw: i32 = 0;
            // SAFETY: handle is valid for the program lifetime; the main
            // loop is the only reader.
            let ret = unsafe { adc_oneshot_read(self.handle, self.channel, &mut raw) };
            if ret != ESP_OK as i32 {
                return Err(SensorError::AdcReadFailed);
            }
            Ok(raw.clamp(0, 4095) as u16)
        }
    }

    // ── I2C with a per-transaction bound ──────────────────────

    #[derive(Debug)]
    pub struct BusFault(pub i32);

    impl embedded_hal::i2c::Error for BusFault {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    pub struct BoundedI2c<'d> {
        driver: I2cDriver<'d>,
        timeout: TickType_t,
    }

    impl<'d> BoundedI2c<'d> {
        pub fn new(driver: I2cDriver<'d>, timeout_ms: u32) -> Self {
            Self {
                driver,
                timeout: TickType::new_millis(u64::from(timeout_ms)).ticks(),
            }
        }
    }

    impl ErrorType for BoundedI2c<'_> {
        type Error = BusFault;
    }

    impl I2c for BoundedI2c<'_> {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            self.driver
                .transaction(address, operations, self.timeout)
                .map_err(|e| BusFault(e.code()))
        }
    }
}
