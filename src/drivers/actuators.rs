//! Relay banks, fan and buzzer.
//!
//! Two dual-channel relay boards switch the protected loads, a third relay
//! drives the cooling fan, and an active buzzer gives audible alarms.  Every
//! output is a [`PolarityOutput`], so polarity is fixed per output at
//! construction and never leaks to callers.
//!
//! All writes are synchronous: the state returned by [`ActuatorBank::get_state`]
//! and [`ActuatorBank::fan_state`] reflects the last write immediately.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::debug;

use super::output::{OutputState, PolarityOutput};

/// Relay board selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    First,
    Second,
}

impl Bank {
    pub const ALL: [Bank; 2] = [Bank::First, Bank::Second];

    fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

/// Channel selector within a relay board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    One,
    Two,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::One, Channel::Two];
}

/// Map a dashboard relay number (1–4) onto bank/channel.
/// Relays 1–2 are the first board, 3–4 the second.
pub fn relay_slot(number: u8) -> Option<(Bank, Channel)> {
    match number {
        1 => Some((Bank::First, Channel::One)),
        2 => Some((Bank::First, Channel::Two)),
        3 => Some((Bank::Second, Channel::One)),
        4 => Some((Bank::Second, Channel::Two)),
        _ => None,
    }
}

/// A buzzer pulse train.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeepPattern {
    pub count: u32,
    pub on_ms: u32,
    pub gap_ms: u32,
}

impl BeepPattern {
    const ON_MS: u32 = 100;
    const GAP_MS: u32 = 50;

    /// Pattern A: electrical fault or remote shutdown.
    pub const ALARM: Self = Self::pulses(3);
    /// Pattern B: ambient over-temperature.
    pub const AMBIENT: Self = Self::pulses(4);
    /// Pattern C: fan engaged, remote warning.
    pub const NOTICE: Self = Self::pulses(2);

    /// `count` pulses with the default timing.
    pub const fn pulses(count: u32) -> Self {
        Self {
            count,
            on_ms: Self::ON_MS,
            gap_ms: Self::GAP_MS,
        }
    }
}

// ---------------------------------------------------------------------------
// Relay board
// ---------------------------------------------------------------------------

pub struct RelayBank<P> {
    channels: [PolarityOutput<P>; 2],
}

impl<P: OutputPin> RelayBank<P> {
    /// Both channels start OFF.
    pub fn new(ch1: P, ch2: P, active_high: bool) -> Self {
        Self {
            channels: [
                PolarityOutput::new(ch1, active_high, "relay.ch1"),
                PolarityOutput::new(ch2, active_high, "relay.ch2"),
            ],
        }
    }

    fn output(&mut self, channel: Channel) -> &mut PolarityOutput<P> {
        match channel {
            Channel::One => &mut self.channels[0],
            Channel::Two => &mut self.channels[1],
        }
    }

    pub fn set(&mut self, channel: Channel, on: bool) {
        // Failures are logged by the output; its recorded state still
        // reflects the request.
        let _ = self.output(channel).set(on);
    }

    pub fn state(&self, channel: Channel) -> OutputState {
        match channel {
            Channel::One => self.channels[0].state(),
            Channel::Two => self.channels[1].state(),
        }
    }

    pub fn all_off(&mut self) {
        for out in &mut self.channels {
            let _ = out.set(false);
        }
    }

    fn reassert(&mut self) -> usize {
        self.channels.iter_mut().map(|out| usize::from(out.reassert())).sum()
    }
}

// ---------------------------------------------------------------------------
// Buzzer
// ---------------------------------------------------------------------------

pub struct Buzzer<P, D> {
    out: PolarityOutput<P>,
    delay: D,
    total_pulses: u64,
}

impl<P: OutputPin, D: DelayNs> Buzzer<P, D> {
    pub fn new(pin: P, active_high: bool, delay: D) -> Self {
        Self {
            out: PolarityOutput::new(pin, active_high, "buzzer"),
            delay,
            total_pulses: 0,
        }
    }

    /// Blocking pulse train: `count` × (on `duration_ms`, off `interval_ms`).
    pub fn pulse(&mut self, duration_ms: u32, count: u32, interval_ms: u32) {
        for _ in 0..count {
            let _ = self.out.set(true);
            self.delay.delay_ms(duration_ms);
            let _ = self.out.set(false);
            self.delay.delay_ms(interval_ms);
            self.total_pulses = self.total_pulses.saturating_add(1);
        }
    }

    /// Pulses emitted since construction.
    pub fn total_pulses(&self) -> u64 {
        self.total_pulses
    }

    fn reassert(&mut self) -> bool {
        self.out.reassert()
    }
}

// ---------------------------------------------------------------------------
// ActuatorBank
// ---------------------------------------------------------------------------

/// Every output the guard drives.
pub struct ActuatorBank<P, D> {
    banks: [RelayBank<P>; 2],
    fan: PolarityOutput<P>,
    buzzer: Buzzer<P, D>,
}

impl<P: OutputPin, D: DelayNs> ActuatorBank<P, D> {
    pub fn new(first: RelayBank<P>, second: RelayBank<P>, fan: PolarityOutput<P>, buzzer: Buzzer<P, D>) -> Self {
        Self {
            banks: [first, second],
            fan,
            buzzer,
        }
    }

    pub fn set(&mut self, bank: Bank, channel: Channel, on: bool) {
        debug!("relay {:?}/{:?} -> {}", bank, channel, OutputState::from(on));
        self.banks[bank.index()].set(channel, on);
    }

    pub fn get_state(&self, bank: Bank, channel: Channel) -> OutputState {
        self.banks[bank.index()].state(channel)
    }

    pub fn all_off(&mut self, bank: Bank) {
        self.banks[bank.index()].all_off();
    }

    pub fn fan_set(&mut self, on: bool) {
        let _ = self.fan.set(on);
    }

    pub fn fan_state(&self) -> OutputState {
        self.fan.state()
    }

    pub fn buzzer_pulse(&mut self, duration_ms: u32, count: u32, interval_ms: u32) {
        self.buzzer.pulse(duration_ms, count, interval_ms);
    }

    pub fn beep(&mut self, pattern: BeepPattern) {
        self.buzzer_pulse(pattern.on_ms, pattern.count, pattern.gap_ms);
    }

    pub fn buzzer_total_pulses(&self) -> u64 {
        self.buzzer.total_pulses()
    }

    /// Re-drive every output whose last write failed; returns how many
    /// were retried.
    pub fn reassert_failed(&mut self) -> usize {
        let relays: usize = self.banks.iter_mut().map(RelayBank::reassert).sum();
        relays + usize::from(self.fan.reassert()) + usize::from(self.buzzer.reassert())
    }
}
