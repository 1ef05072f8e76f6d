//! Owner records: who currently holds a lock.
//!
//! The OS lock only knows that *someone* holds it. The owner side file turns
//! that into a caller-chosen identity string for humans and monitoring tools.
//! The record is advisory: a holder killed mid-section leaves its record
//! behind until the next successful acquire overwrites it.

use crate::error::{BenchError, Result};
use crate::fs::{atomic_write, remove_if_exists};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Contents of an owner side file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRecord {
    /// Identity supplied by the holder, stored verbatim.
    pub owner: String,

    /// Process ID of the writer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Host name of the writer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// When the OS lock was granted.
    pub acquired_at: DateTime<Utc>,
}

impl OwnerRecord {
    /// Create a record for the current process with the current timestamp.
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            pid: Some(std::process::id()),
            host: hostname::get()
                .ok()
                .map(|h| h.to_string_lossy().into_owned()),
            acquired_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            BenchError::io("failed to serialize owner record", e.into())
        })
    }

    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.acquired_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let seconds = age.num_seconds().max(0);
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m", minutes)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Check if the record is older than the given threshold in minutes.
    pub fn is_stale(&self, stale_minutes: u32) -> bool {
        self.age().num_minutes() > stale_minutes as i64
    }
}

/// Reads and writes the owner side file of one lock.
///
/// Only the current holder of the OS lock may call [`OwnerRegistry::record`]
/// or [`OwnerRegistry::clear`]; anyone may call [`OwnerRegistry::read`].
#[derive(Debug, Clone)]
pub struct OwnerRegistry {
    path: PathBuf,
}

impl OwnerRegistry {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace whatever record is on disk, stale or not, with one naming `owner`.
    pub fn record(&self, owner: &str) -> Result<OwnerRecord> {
        let record = OwnerRecord::new(owner);
        atomic_write(&self.path, record.to_json()?.as_bytes())?;
        Ok(record)
    }

    /// Read the last recorded owner.
    ///
    /// A missing or unparsable record is reported as `None`; readers must
    /// tolerate the record lagging behind the OS lock state.
    pub fn read(&self) -> Option<OwnerRecord> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read owner record");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unparsable owner record");
                None
            }
        }
    }

    pub fn clear(&self) -> Result<()> {
        remove_if_exists(&self.path)
    }
}

/// Default owner identity for this process: `user@host:pid`.
///
/// Stable for the whole life of the process, so every module of one
/// measurement script reports the same holder.
pub fn default_identity() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}:{}", user, host, std::process::id())
}
