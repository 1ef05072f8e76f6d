//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a shared measurement bench.
///
/// This struct represents the contents of `benchlock.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Directory holding lock and owner files. Must be writable by every
    /// cooperating process. `None` means `<home>/.benchlock/locks`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_dir: Option<PathBuf>,

    /// Resource name of the signal-acquisition lock (digitizer + multiplexer).
    #[serde(default = "default_signal_acquisition")]
    pub signal_acquisition: String,

    /// Retry interval for bounded waits.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Minutes after which an owner record is flagged as possibly stale.
    #[serde(default = "default_lock_stale_minutes")]
    pub lock_stale_minutes: u32,

    // =========================================================================
    // Bias ramp settings
    // =========================================================================
    /// Delay before the supply starts reporting a ramp after a new setpoint.
    #[serde(default = "default_ramp_start_delay_ms")]
    pub ramp_start_delay_ms: u64,

    /// Interval between "still ramping?" queries.
    #[serde(default = "default_ramp_poll_ms")]
    pub ramp_poll_ms: u64,

    /// Extra wait after the supply reports the ramp finished.
    #[serde(default = "default_ramp_settle_ms")]
    pub ramp_settle_ms: u64,

    // =========================================================================
    // Slots
    // =========================================================================
    /// Measurement slots; each gets its own bias lock.
    #[serde(default)]
    pub slots: Vec<SlotConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_dir: None,
            signal_acquisition: default_signal_acquisition(),
            poll_interval_ms: default_poll_interval_ms(),
            lock_stale_minutes: default_lock_stale_minutes(),
            ramp_start_delay_ms: default_ramp_start_delay_ms(),
            ramp_poll_ms: default_ramp_poll_ms(),
            ramp_settle_ms: default_ramp_settle_ms(),
            slots: Vec::new(),
        }
    }
}
