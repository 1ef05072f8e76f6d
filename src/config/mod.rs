//! Configuration model for benchlock.
//!
//! This module defines the Config struct that represents `benchlock.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, and validation of config values.

mod model;
mod operations;
pub mod types;

#[cfg(test)]
mod tests;

pub use model::Config;
pub use types::SlotConfig;
