//! DHT11 humidity / temperature sensor (single-wire protocol).
//!
//! The line idles HIGH through a pull-up.  A read is:
//!
//! 1. Host pulls LOW for ≥ 18 ms, then releases.
//! 2. Sensor answers LOW ~80 µs, HIGH ~80 µs.
//! 3. 40 data bits follow.  Each bit is ~50 µs LOW then HIGH for ~27 µs
//!    (`0`) or ~70 µs (`1`), MSB first.
//! 4. Frame = `[RH int, RH dec, T int, T dec, checksum]`, checksum being
//!    the low byte of the sum of the first four.
//!
//! The bit value is taken by sampling the line 30 µs after each rising
//! edge.  The pin must be open-drain (readable while driven).
//!
//! The sensor tolerates one read per second at most, which matches the
//! control period.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use super::{AmbientSample, AmbientSensor};
use crate::error::SensorError;

const START_LOW_MS: u32 = 20;
/// Generous bound on any single protocol phase.
const PHASE_TIMEOUT_US: u32 = 100;
const BIT_SAMPLE_US: u32 = 30;
const FRAME_BITS: usize = 40;

pub struct Dht11<P, D> {
    pin: P,
    delay: D,
    last: Option<AmbientSample>,
}

impl<P, D> Dht11<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    /// Take the data line and leave it released (HIGH).
    pub fn new(mut pin: P, delay: D) -> Self {
        let _ = pin.set_high();
        Self {
            pin,
            delay,
            last: None,
        }
    }

    /// Last successfully decoded sample, kept for diagnostics only.
    /// The control loop never substitutes it for a failed read.
    pub fn last_sample(&self) -> Option<AmbientSample> {
        self.last
    }

    fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        // Start signal.
        self.pin.set_low().map_err(|_| SensorError::GpioFailed)?;
        self.delay.delay_ms(START_LOW_MS);
        self.pin.set_high().map_err(|_| SensorError::GpioFailed)?;

        // Response: wait for the sensor to pull low, then its 80 µs high.
        self.wait_for(false)?;
        self.wait_for(true)?;
        self.wait_for(false)?;

        let mut frame = [0u8; 5];
        for bit in 0..FRAME_BITS {
            self.wait_for(true)?;
            self.delay.delay_us(BIT_SAMPLE_US);
            let one = self.pin.is_high().map_err(|_| SensorError::GpioFailed)?;
            if one {
                frame[bit / 8] |= 1 << (7 - bit % 8);
                self.wait_for(false)?;
            }
        }
        Ok(frame)
    }

    /// Spin until the line reaches `high`, or time out.
    fn wait_for(&mut self, high: bool) -> Result<(), SensorError> {
        for _ in 0..PHASE_TIMEOUT_US {
            if self.pin.is_high().map_err(|_| SensorError::GpioFailed)? == high {
                return Ok(());
            }
            self.delay.delay_us(1);
        }
        Err(SensorError::Timeout)
    }
}

impl<P, D> AmbientSensor for Dht11<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn measure(&mut self) -> Result<AmbientSample, SensorError> {
        let result = self.read_frame();
        // Release the line whatever happened.
        let _ = self.pin.set_high();
        let sample = decode_frame(result?)?;
        self.last = Some(sample);
        Ok(sample)
    }
}

/// Validate and decode a raw 5-byte DHT11 frame.
pub fn decode_frame(frame: [u8; 5]) -> Result<AmbientSample, SensorError> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(SensorError::Checksum);
    }

    let humidity = f32::from(frame[0]) + f32::from(frame[1]) / 10.0;
    // Later DHT11 revisions flag sub-zero readings in bit 7 of the decimal byte.
    let magnitude = f32::from(frame[2]) + f32::from(frame[3] & 0x7F) / 10.0;
    let temperature = if frame[3] & 0x80 != 0 { -magnitude } else { magnitude };

    if humidity > 100.0 || !(-20.0..=80.0).contains(&temperature) {
        return Err(SensorError::OutOfRange);
    }
    Ok(AmbientSample {
        temperature_c: temperature,
        humidity_pct: humidity,
    })
}
