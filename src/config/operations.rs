//! Config loading, validation, and utility operations.

use super::model::Config;
use super::types::SlotConfig;
use crate::error::{BenchError, Result};
use crate::locks::ResourceName;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(BenchError::ConfigError)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            BenchError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| BenchError::ConfigError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            BenchError::ConfigError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `poll_interval_ms` and `lock_stale_minutes` must be positive
    /// - slot numbers must be unique
    /// - `signal_acquisition` must be a valid resource name distinct from every slot lock
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(BenchError::ConfigError(
                "config validation failed: poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.lock_stale_minutes == 0 {
            return Err(BenchError::ConfigError(
                "config validation failed: lock_stale_minutes must be greater than 0".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for slot in &self.slots {
            if !seen.insert(slot.slot) {
                return Err(BenchError::ConfigError(format!(
                    "config validation failed: slot {} is defined more than once",
                    slot.slot
                )));
            }
        }

        let signal = ResourceName::new(self.signal_acquisition.as_str()).map_err(|_| {
            BenchError::ConfigError(format!(
                "config validation failed: signal_acquisition '{}' is not a valid resource name",
                self.signal_acquisition
            ))
        })?;
        if self.slots.iter().any(|s| ResourceName::slot(s.slot) == signal) {
            return Err(BenchError::ConfigError(format!(
                "config validation failed: signal_acquisition '{}' collides with a slot lock",
                signal
            )));
        }

        Ok(())
    }

    /// Every lock this configuration defines: slot locks in slot order, then
    /// the signal-acquisition lock.
    pub fn resource_names(&self) -> Result<Vec<ResourceName>> {
        let mut names: Vec<ResourceName> = self
            .slots
            .iter()
            .map(|s| ResourceName::slot(s.slot))
            .collect();
        names.push(self.signal_acquisition_name()?);
        Ok(names)
    }

    pub fn signal_acquisition_name(&self) -> Result<ResourceName> {
        ResourceName::new(self.signal_acquisition.as_str())
    }

    pub fn slot(&self, number: u32) -> Option<&SlotConfig> {
        self.slots.iter().find(|s| s.slot == number)
    }

    /// Device name configured for the slot locked by `name`, if any.
    pub fn device_for(&self, name: &ResourceName) -> Option<&str> {
        self.slots
            .iter()
            .find(|s| &ResourceName::slot(s.slot) == name)
            .map(|s| s.device_name.as_str())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
