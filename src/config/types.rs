//! Configuration types and defaults for benchlock.

use serde::{Deserialize, Serialize};

/// One measurement slot: a device under test wired to one supply channel
/// and, optionally, one digitizer channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    /// Slot number; its bias lock is named `slot_<n>`.
    pub slot: u32,

    /// Human-readable name of the device mounted in the slot.
    #[serde(default)]
    pub device_name: String,

    /// Serial number of the power supply feeding this slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supply_serial: Option<String>,

    /// Channel of that supply.
    #[serde(default)]
    pub supply_channel: u32,

    /// Digitizer channel reading this slot's signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digitizer_channel: Option<u32>,
}

pub(crate) fn default_signal_acquisition() -> String {
    "signal_acquisition".to_string()
}

pub(crate) fn default_poll_interval_ms() -> u64 {
    50
}

pub(crate) fn default_lock_stale_minutes() -> u32 {
    120
}

pub(crate) fn default_ramp_start_delay_ms() -> u64 {
    1000
}

pub(crate) fn default_ramp_poll_ms() -> u64 {
    1000
}

pub(crate) fn default_ramp_settle_ms() -> u64 {
    3000
}
