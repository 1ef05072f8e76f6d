//! Benchlock: named locks that serialize access to shared lab hardware
//! across independent processes.
//!
//! Each resource (a bias-supply slot, the signal-acquisition chain) maps to
//! one lock file in a shared directory. The OS advisory lock on that file is
//! the source of truth for "held", so a crashed holder never leaves a lock
//! behind. A side file records who holds it for monitoring.
//!
//! ```no_run
//! use benchlock::locks::{NamedFileLock, ResourceName};
//!
//! let lock = NamedFileLock::new(ResourceName::slot(3), "/var/lock/bench");
//! lock.hold("scan.py@lab-pc:4312", |_guard| {
//!     // talk to the instrument
//!     Ok(())
//! })?;
//! # Ok::<(), benchlock::error::BenchError>(())
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod locks;
pub mod setup;
