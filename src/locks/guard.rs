//! RAII lock guard implementation.

use super::named::LockShared;
use super::types::ResourceName;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

/// Proof of ownership of one named lock.
///
/// While the guard lives, this process holds the OS-level lock and the
/// owner record names [`LockGuard::identity`]. When dropped, the owner
/// record is cleared and the lock is released, including during panic
/// unwind. If release fails during drop a warning is logged but no panic
/// occurs. Nested guards from a re-entrant lock only release the lock when
/// the outermost one goes away.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    shared: Arc<LockShared>,
    identity: String,
    acquired_at: DateTime<Utc>,
    active: bool,
}

impl LockGuard {
    pub(super) fn new(shared: Arc<LockShared>, identity: String, acquired_at: DateTime<Utc>) -> Self {
        Self {
            shared,
            identity,
            acquired_at,
            active: true,
        }
    }

    pub fn name(&self) -> &ResourceName {
        self.shared.name()
    }

    /// Identity recorded as the owner while this guard lives.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// When the OS lock was granted (the outermost acquire for nested guards).
    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    /// Release now and report any error.
    ///
    /// Consumes the guard, so a second release cannot be expressed; the
    /// drop that follows is a no-op.
    pub fn release(mut self) -> Result<()> {
        self.active = false;
        self.shared.release_one()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Err(e) = self.shared.release_one() {
            warn!(name = %self.shared.name(), owner = %self.identity, error = %e, "failed to release lock cleanly");
        }
    }
}
