//! The set of named locks known to one process.

use super::guard::LockGuard;
use super::metadata::OwnerRecord;
use super::named::{DEFAULT_POLL_INTERVAL, NamedFileLock};
use super::types::{LockStatus, ResourceName};
use crate::config::Config;
use crate::error::{BenchError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// How the table treats names it has not seen before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMode {
    /// Only pre-registered names resolve; others are configuration errors.
    Strict,
    /// Any valid name resolves, creating its lock on first reference.
    Lazy,
}

/// Maps resource names to their locks.
///
/// The same name always resolves to the same [`NamedFileLock`] instance.
/// The internal map is only locked while looking up or inserting an entry,
/// never while waiting on a file lock, so threads acquiring different
/// names never serialize against each other.
#[derive(Debug)]
pub struct LockTable {
    lock_dir: PathBuf,
    poll_interval: Duration,
    reentrant: bool,
    mode: TableMode,
    locks: Mutex<BTreeMap<ResourceName, Arc<NamedFileLock>>>,
}

impl LockTable {
    pub fn new(lock_dir: impl Into<PathBuf>, mode: TableMode) -> Self {
        Self {
            lock_dir: lock_dir.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            reentrant: false,
            mode,
            locks: Mutex::new(BTreeMap::new()),
        }
    }

    /// A table that creates locks on first reference.
    pub fn lazy(lock_dir: impl Into<PathBuf>) -> Self {
        Self::new(lock_dir, TableMode::Lazy)
    }

    /// A table holding exactly `names`; anything else is rejected.
    pub fn strict<I>(lock_dir: impl Into<PathBuf>, names: I) -> Self
    where
        I: IntoIterator<Item = ResourceName>,
    {
        Self::new(lock_dir, TableMode::Strict).register_all(names)
    }

    /// Build a table from configuration: one lock per slot plus the
    /// signal-acquisition lock. `mode` decides whether other names resolve.
    pub fn from_config(config: &Config, lock_dir: &Path, mode: TableMode) -> Result<Self> {
        let table = Self::new(lock_dir, mode)
            .with_poll_interval(config.poll_interval())
            .register_all(config.resource_names()?);
        debug!(lock_dir = %lock_dir.display(), resources = table.len(), ?mode, "lock table ready");
        Ok(table)
    }

    /// Retry interval for bounded waits of locks registered from now on.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Make locks registered from now on re-entrant per identity.
    pub fn with_reentrancy(mut self, reentrant: bool) -> Self {
        self.reentrant = reentrant;
        self
    }

    pub fn register_all<I>(self, names: I) -> Self
    where
        I: IntoIterator<Item = ResourceName>,
    {
        for name in names {
            self.register(name);
        }
        self
    }

    pub fn mode(&self) -> TableMode {
        self.mode
    }

    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    /// Register a name ahead of time. Returns the (possibly existing) lock.
    pub fn register(&self, name: ResourceName) -> Arc<NamedFileLock> {
        let mut locks = self.entries();
        Arc::clone(locks.entry(name.clone()).or_insert_with(|| {
            Arc::new(
                NamedFileLock::new(name, self.lock_dir.clone())
                    .with_poll_interval(self.poll_interval)
                    .reentrant(self.reentrant),
            )
        }))
    }

    /// Look up the lock for `name`.
    pub fn lock_for(&self, name: &str) -> Result<Arc<NamedFileLock>> {
        let name = ResourceName::new(name)?;
        if let Some(lock) = self.entries().get(&name) {
            return Ok(Arc::clone(lock));
        }

        match self.mode {
            TableMode::Strict => Err(BenchError::UnknownResource(name.to_string())),
            TableMode::Lazy => Ok(self.register(name)),
        }
    }

    pub fn is_held(&self, name: &str) -> Result<bool> {
        self.lock_for(name)?.is_locked()
    }

    pub fn owner_of(&self, name: &str) -> Result<Option<OwnerRecord>> {
        self.lock_for(name)?.current_owner()
    }

    /// Scoped acquisition of the lock for `name`.
    pub fn hold<T, F>(&self, name: &str, identity: &str, f: F) -> Result<T>
    where
        F: FnOnce(&LockGuard) -> Result<T>,
    {
        self.lock_for(name)?.hold(identity, f)
    }

    /// Register every lock file already present in the lock directory, so
    /// monitoring tools also see names other processes created lazily.
    /// Does nothing in strict mode. Returns the number of new entries.
    pub fn discover(&self) -> Result<usize> {
        if self.mode == TableMode::Strict || !self.lock_dir.is_dir() {
            return Ok(0);
        }

        let entries = fs::read_dir(&self.lock_dir).map_err(|e| {
            BenchError::io(
                format!("failed to read lock directory '{}'", self.lock_dir.display()),
                e,
            )
        })?;

        let before = self.len();
        for entry in entries {
            let entry = entry
                .map_err(|e| BenchError::io("failed to read lock directory entry", e))?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some("lock") {
                continue;
            }
            // Files that do not form a valid name were not created by us.
            let Some(name) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| ResourceName::new(s).ok())
            else {
                continue;
            };
            self.register(name);
        }
        Ok(self.len() - before)
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<ResourceName> {
        self.entries().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Status of every registered lock, sorted by name.
    pub fn statuses(&self) -> Result<Vec<LockStatus>> {
        let locks: Vec<_> = self.entries().values().cloned().collect();
        locks.iter().map(|lock| lock.status()).collect()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<ResourceName, Arc<NamedFileLock>>> {
        // The map is always left consistent, so a poisoned mutex is still usable.
        self.locks.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}
