//! Unified error types for the PowerGuard firmware.
//!
//! Each subsystem owns a small `Copy` error enum; all of them convert into
//! the top-level [`Error`] so the control loop can log any failure through
//! one path.  None of these are fatal on their own: the loop folds sensor
//! and driver failures into absent readings, drops bad commands, and counts
//! publish failures.  Only startup calibration failure stops the firmware.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The power-meter driver failed (bus fault or missing calibration).
    Driver(DriverError),
    /// An ambient or analog sensor could not produce a value.
    Sensor(SensorError),
    /// A digital output could not be driven.
    Actuator(ActuatorError),
    /// An inbound command could not be decoded.
    Parse(ParseError),
    /// Telemetry could not be handed to the publisher.
    Publish(PublishError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Driver(e) => write!(f, "power meter: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Parse(e) => write!(f, "command: {e}"),
            Self::Publish(e) => write!(f, "publish: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Power-meter driver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// A register read or write did not complete (NACK, arbitration loss,
    /// bus timeout).  The reading is absent for this cycle.
    Bus,
    /// Current or power was requested before `configure()` succeeded.
    Uncalibrated,
    /// `configure()` was given a zero calibration value or a non-positive
    /// shunt resistance.
    InvalidCalibration,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "bus transfer failed"),
            Self::Uncalibrated => write!(f, "not calibrated"),
            Self::InvalidCalibration => write!(f, "invalid calibration parameters"),
        }
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error.
    AdcReadFailed,
    /// GPIO read or write on the sensor line failed.
    GpioFailed,
    /// The sensor did not answer within the protocol window.
    Timeout,
    /// The received frame failed its checksum.
    Checksum,
    /// Reading is outside the physically plausible range.
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::GpioFailed => write!(f, "GPIO access failed"),
            Self::Timeout => write!(f, "sensor timed out"),
            Self::Checksum => write!(f, "checksum mismatch"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed.
    GpioWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Command decode errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Payload is not a JSON object.
    Malformed,
    /// The object has no string `cmd` field.
    MissingCommand,
    /// A known command carried a field of the wrong type or range.
    InvalidField(&'static str),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed payload"),
            Self::MissingCommand => write!(f, "missing cmd field"),
            Self::InvalidField(field) => write!(f, "invalid field '{field}'"),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// Publish errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// Telemetry could not be serialised.
    Encode,
    /// The pub/sub client is not connected.
    NotConnected,
    /// The pub/sub client rejected or failed the publish.
    Rejected,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode => write!(f, "telemetry encode failed"),
            Self::NotConnected => write!(f, "not connected"),
            Self::Rejected => write!(f, "publish rejected"),
        }
    }
}

impl From<PublishError> for Error {
    fn from(e: PublishError) -> Self {
        Self::Publish(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
