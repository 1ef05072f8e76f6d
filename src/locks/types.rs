//! Resource names and lock status snapshots.

use super::metadata::OwnerRecord;
use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest accepted resource name, in bytes.
pub const MAX_NAME_LEN: usize = 64;

/// Identifier of one exclusively-ownable resource.
///
/// Names map 1:1 onto lock files, so they are validated instead of
/// sanitized: two different names can never share a file. Upper case is
/// rejected because macOS and Windows file systems fold case by default.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceName(String);

impl ResourceName {
    /// Validate and wrap a resource name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let valid = !name.is_empty()
            && name.len() <= MAX_NAME_LEN
            && !name.starts_with('.')
            && name.chars().all(|c| {
                c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.')
            });

        if valid {
            Ok(Self(name))
        } else {
            Err(BenchError::InvalidResourceName(name))
        }
    }

    /// Name for the bias lock of a numbered slot (`slot_<n>`).
    pub fn slot(number: u32) -> Self {
        Self(format!("slot_{}", number))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the OS-level lock file.
    pub fn lock_file_name(&self) -> String {
        format!("{}.lock", self.0)
    }

    /// File name of the owner side file.
    pub fn owner_file_name(&self) -> String {
        format!("{}.owner", self.0)
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceName {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ResourceName {
    type Error = BenchError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ResourceName {
    type Error = BenchError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ResourceName> for String {
    fn from(value: ResourceName) -> Self {
        value.0
    }
}

/// Point-in-time view of one lock, as reported to monitoring tools.
///
/// `held` comes from the OS and is authoritative. `owner` comes from the
/// side file and may briefly lag behind it.
#[derive(Debug, Clone, Serialize)]
pub struct LockStatus {
    pub name: ResourceName,
    pub held: bool,
    pub owner: Option<OwnerRecord>,
}

impl LockStatus {
    /// Whether the owner record is older than the given threshold.
    pub fn is_stale(&self, stale_minutes: u32) -> bool {
        self.owner
            .as_ref()
            .is_some_and(|owner| owner.is_stale(stale_minutes))
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.held, &self.owner) {
            (false, _) => write!(f, "{}: free", self.name),
            (true, None) => write!(f, "{}: locked (owner unknown)", self.name),
            (true, Some(owner)) => write!(
                f,
                "{}: locked by {} ({} ago)",
                self.name,
                owner.owner,
                owner.age_string()
            ),
        }
    }
}
