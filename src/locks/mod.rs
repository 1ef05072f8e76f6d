//! Cross-process named locks for shared lab hardware.
//!
//! This module implements the locking core:
//! - [`NamedFileLock`]: one exclusive lock per resource name, backed by an
//!   OS advisory lock on `<lock_dir>/<name>.lock`
//! - [`OwnerRegistry`]: the `<lock_dir>/<name>.owner` side file naming the
//!   current holder
//! - [`LockTable`]: resource name to lock, one instance per name
//! - [`LockGuard`]: the scoped token; dropping it releases the lock
//!
//! # Owner Records
//!
//! Each owner file contains JSON metadata:
//! - `owner`: the identity passed to `acquire`
//! - `pid`, `host`: the writing process
//! - `acquired_at`: RFC3339 timestamp
//!
//! The OS lock is authoritative for "is it held". The owner file is advisory
//! for "by whom" and may briefly disagree with it.

mod guard;
mod metadata;
mod named;
mod table;
mod types;


pub use guard::LockGuard;
pub use metadata::{OwnerRecord, OwnerRegistry, default_identity};
pub use named::{DEFAULT_POLL_INTERVAL, NamedFileLock};
pub use table::{LockTable, TableMode};
pub use types::{LockStatus, MAX_NAME_LEN, ResourceName};
