//! Narrow interfaces to the bench instruments.
//!
//! Drivers live outside this crate; the coordinator only needs these calls.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output state of a supply channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputState {
    On,
    Off,
}

impl fmt::Display for OutputState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputState::On => f.write_str("on"),
            OutputState::Off => f.write_str("off"),
        }
    }
}

impl FromStr for OutputState {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            other => Err(BenchError::ConfigError(format!(
                "output state must be 'on' or 'off', got '{}'",
                other
            ))),
        }
    }
}

/// A multi-channel bias power supply.
pub trait BiasSupply: Send {
    /// Identification string of the instrument.
    fn idn(&mut self) -> Result<String>;
    fn set_voltage(&mut self, channel: u32, volts: f64) -> Result<()>;
    /// Measured output voltage.
    fn voltage(&mut self, channel: u32) -> Result<f64>;
    /// Measured output current.
    fn current(&mut self, channel: u32) -> Result<f64>;
    fn is_ramping(&mut self, channel: u32) -> Result<bool>;
    fn set_current_compliance(&mut self, channel: u32, amperes: f64) -> Result<()>;
    fn current_compliance(&mut self, channel: u32) -> Result<f64>;
    fn set_output(&mut self, channel: u32, state: OutputState) -> Result<()>;
}

/// One acquired trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    pub time_s: Vec<f64>,
    pub amplitude_v: Vec<f64>,
}

/// The signal-acquisition chain (digitizer plus any multiplexer in front of it).
pub trait SignalDigitizer: Send {
    fn idn(&mut self) -> Result<String>;
    /// Vertical scale of a channel, in volts per division.
    fn set_vdiv(&mut self, channel: u32, vdiv: f64) -> Result<()>;
    /// Threshold of the current trigger source.
    fn set_trigger_level(&mut self, level: f64) -> Result<()>;
    /// Arm a single acquisition and block until it triggers.
    fn wait_for_trigger(&mut self) -> Result<()>;
    fn waveform(&mut self, channel: u32) -> Result<Waveform>;
}
