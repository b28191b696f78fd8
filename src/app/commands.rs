//! Remote commands.
//!
//! Payloads arrive as JSON objects with a `cmd` discriminator:
//!
//! ```json
//! {"cmd": "beep", "times": 2}
//! {"cmd": "warning", "text": "High voltage predicted"}
//! {"cmd": "relay", "relay": 3, "state": true}
//! ```
//!
//! [`decode`] never has side effects.  An unrecognised `cmd` decodes to
//! [`Command::Unknown`]; anything structurally wrong is a [`ParseError`].
//! [`apply`] runs a command to completion against the outputs.

use log::{info, warn};
use serde_json::{Map, Value};

use crate::drivers::actuators::{relay_slot, BeepPattern};
use crate::energy::EnergyMeter;
use crate::error::ParseError;
use crate::safety::{SafetyController, SafetyMode};

use super::events::{truncate_warning, WarningText};
use super::ports::{ActuatorPort, DisplayPort};

/// Upper bound on a remote `beep` request; the buzzer blocks the loop.
pub const MAX_REMOTE_BEEPS: u32 = 20;

const DEFAULT_WARNING: &str = "Warning";

/// Commands accepted from the pub/sub channel and dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    RelaysOff,
    Shutdown,
    FanOn,
    FanOff,
    Beep { times: u32 },
    Warning { text: WarningText },
    /// Dashboard relay override, `relay` in 1..=4.
    SetRelay { relay: u8, on: bool },
    /// Pause or resume cost accumulation.
    PriceRecording { enabled: bool },
    Unknown,
}

impl Command {
    /// Short tag for logs and events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RelaysOff => "relays_off",
            Self::Shutdown => "shutdown",
            Self::FanOn => "fan_on",
            Self::FanOff => "fan_off",
            Self::Beep { .. } => "beep",
            Self::Warning { .. } => "warning",
            Self::SetRelay { .. } => "relay",
            Self::PriceRecording { .. } => "price_recording",
            Self::Unknown => "unknown",
        }
    }
}

/// What applying a command changed, for the service to fold into the
/// next telemetry record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutcome {
    pub warning: Option<WarningText>,
    /// The command was recognised but not carried out.
    pub refused: bool,
}

/// Decode one raw payload.
pub fn decode(raw: &[u8]) -> Result<Command, ParseError> {
    let value: Value = serde_json::from_slice(raw).map_err(|_| ParseError::Malformed)?;
    let obj = value.as_object().ok_or(ParseError::Malformed)?;
    let cmd = obj
        .get("cmd")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingCommand)?;

    let command = match cmd {
        "relays_off" => Command::RelaysOff,
        "shutdown" => Command::Shutdown,
        "fan_on" => Command::FanOn,
        "fan_off" => Command::FanOff,
        "beep" => {
            let times = match obj.get("times") {
                None | Some(Value::Null) => 1,
                Some(v) => v.as_u64().ok_or(ParseError::InvalidField("times"))?,
            };
            Command::Beep {
                times: times.min(u64::from(MAX_REMOTE_BEEPS)) as u32,
            }
        }
        "warning" => {
            let text = match obj.get("text") {
                None | Some(Value::Null) => DEFAULT_WARNING,
                Some(v) => v.as_str().ok_or(ParseError::InvalidField("text"))?,
            };
            Command::Warning {
                text: truncate_warning(text),
            }
        }
        "relay" => {
            let relay = obj
                .get("relay")
                .and_then(Value::as_u64)
                .filter(|n| (1..=4).contains(n))
                .ok_or(ParseError::InvalidField("relay"))?;
            Command::SetRelay {
                relay: relay as u8,
                on: flag(obj, "state")?,
            }
        }
        "price_recording" => Command::PriceRecording {
            enabled: flag(obj, "enabled")?,
        },
        _ => Command::Unknown,
    };
    Ok(command)
}

/// Accept `true`/`false` as well as the dashboard's `1`/`0`.
fn flag(obj: &Map<String, Value>, field: &'static str) -> Result<bool, ParseError> {
    match obj.get(field) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(ParseError::InvalidField(field)),
        },
        _ => Err(ParseError::InvalidField(field)),
    }
}

/// Execute `cmd` synchronously.
pub fn apply(
    cmd: &Command,
    hw: &mut impl ActuatorPort,
    safety: &mut SafetyController,
    energy: &mut EnergyMeter,
    display: &mut impl DisplayPort,
) -> CommandOutcome {
    let mut outcome = CommandOutcome::default();
    match cmd {
        Command::RelaysOff | Command::Shutdown => {
            warn!("CMD | {}: cutting all relays", cmd.name());
            hw.all_relays_off();
            hw.set_fan(true);
            safety.note_fan_override(true);
            display.show_warning("CLOUD SHUTDOWN");
            hw.beep(BeepPattern::ALARM);
        }
        Command::FanOn => {
            hw.set_fan(true);
            safety.note_fan_override(true);
            display.show_warning("FAN ON (CLOUD)");
        }
        Command::FanOff => {
            hw.set_fan(false);
            safety.note_fan_override(false);
        }
        Command::Beep { times } => {
            hw.beep(BeepPattern::pulses(*times));
        }
        Command::Warning { text } => {
            display.show_warning(text);
            hw.beep(BeepPattern::NOTICE);
            outcome.warning = Some(text.clone());
        }
        Command::SetRelay { relay, on } => match relay_slot(*relay) {
            // The emergency cut holds until a clean evaluation.
            Some(_) if *on && safety.mode() == SafetyMode::Emergency => {
                warn!("CMD | relay {relay} ON refused: {}", SafetyMode::Emergency);
                outcome.refused = true;
            }
            Some((bank, channel)) => hw.set_relay(bank, channel, *on),
            None => warn!("CMD | relay {relay} out of range"),
        },
        Command::PriceRecording { enabled } => energy.set_recording(*enabled),
        Command::Unknown => {
            info!("CMD | unknown command ignored");
        }
    }
    outcome
}
