//! Cross-process named lock backed by an OS advisory file lock.
//!
//! Every resource name owns one `<name>.lock` file. Holding the exclusive
//! lock on that file (flock on Unix, LockFileEx on Windows, via `fs2`) is
//! the only thing that grants ownership. The kernel drops the lock when the
//! holding process exits, however it exits.
//!
//! Locks belong to the open file handle, not the process: every acquisition
//! opens its own handle, so two threads of one process contend exactly like
//! two processes do. By default, acquiring a lock the caller already holds
//! blocks forever. [`NamedFileLock::reentrant`] layers a per-identity
//! counter on top: a second acquire with the identity that currently holds
//! the lock in this process nests instead of waiting, and the OS lock is
//! released when the outermost guard goes away.

use super::guard::LockGuard;
use super::metadata::{OwnerRecord, OwnerRegistry};
use super::types::{LockStatus, ResourceName};
use crate::error::{BenchError, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Default interval between attempts for bounded waits.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// An exclusive lock for one named resource, shared by every process that
/// uses the same lock directory.
#[derive(Debug)]
pub struct NamedFileLock {
    shared: Arc<LockShared>,
    poll_interval: Duration,
    reentrant: bool,
}

/// State shared between a lock and the guards it hands out.
#[derive(Debug)]
pub(super) struct LockShared {
    name: ResourceName,
    lock_dir: PathBuf,
    lock_path: PathBuf,
    registry: OwnerRegistry,
    /// The in-process holder, if this process holds the OS lock.
    held: Mutex<Option<Held>>,
}

#[derive(Debug)]
struct Held {
    identity: String,
    depth: usize,
    acquired_at: DateTime<Utc>,
    file: File,
}

impl NamedFileLock {
    /// Bind a lock to `name` inside `lock_dir`. No I/O happens until the
    /// lock is first used.
    pub fn new(name: ResourceName, lock_dir: impl Into<PathBuf>) -> Self {
        let lock_dir = lock_dir.into();
        let lock_path = lock_dir.join(name.lock_file_name());
        let registry = OwnerRegistry::new(lock_dir.join(name.owner_file_name()));
        Self {
            shared: Arc::new(LockShared {
                name,
                lock_dir,
                lock_path,
                registry,
                held: Mutex::new(None),
            }),
            poll_interval: DEFAULT_POLL_INTERVAL,
            reentrant: false,
        }
    }

    /// Set the retry interval used by [`NamedFileLock::acquire_timeout`].
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    /// Let the identity currently holding the lock in this process acquire
    /// it again without waiting.
    pub fn reentrant(mut self, reentrant: bool) -> Self {
        self.reentrant = reentrant;
        self
    }

    pub fn name(&self) -> &ResourceName {
        &self.shared.name
    }

    pub fn lock_path(&self) -> &Path {
        &self.shared.lock_path
    }

    pub fn owner_path(&self) -> &Path {
        self.shared.registry.path()
    }

    pub fn is_reentrant(&self) -> bool {
        self.reentrant
    }

    /// Block until the lock is granted, then record `identity` as owner.
    pub fn acquire(&self, identity: &str) -> Result<LockGuard> {
        validate_identity(identity)?;
        if let Some(guard) = self.reenter(identity) {
            return Ok(guard);
        }
        let file = self.shared.open_lock_file()?;

        debug!(name = %self.name(), owner = identity, "waiting for lock");
        loop {
            match file.lock_exclusive() {
                Ok(()) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(BenchError::io(
                        format!("failed to lock '{}'", self.lock_path().display()),
                        e,
                    ));
                }
            }
        }

        self.grant(file, identity)
    }

    /// Like [`NamedFileLock::acquire`], but give up with
    /// [`BenchError::Timeout`] once `timeout` has elapsed.
    pub fn acquire_timeout(&self, identity: &str, timeout: Duration) -> Result<LockGuard> {
        validate_identity(identity)?;
        if let Some(guard) = self.reenter(identity) {
            return Ok(guard);
        }
        let file = self.shared.open_lock_file()?;
        let started = Instant::now();

        debug!(
            name = %self.name(),
            owner = identity,
            timeout_ms = timeout.as_millis() as u64,
            "waiting for lock"
        );
        loop {
            if self.shared.try_lock(&file)? {
                return self.grant(file, identity);
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(BenchError::Timeout {
                    name: self.name().to_string(),
                    waited,
                });
            }
            thread::sleep(self.poll_interval.min(timeout - waited));
        }
    }

    /// Acquire with an optional bound: `None` waits forever.
    pub fn acquire_with(&self, identity: &str, timeout: Option<Duration>) -> Result<LockGuard> {
        match timeout {
            Some(timeout) => self.acquire_timeout(identity, timeout),
            None => self.acquire(identity),
        }
    }

    /// Single non-blocking attempt. `Ok(None)` means someone else holds it.
    ///
    /// [`NamedFileLock::is_locked`] briefly takes the lock to probe it, so an
    /// attempt that coincides with a probe from any process (for example
    /// `benchlock status --watch`) can report contention on a free lock.
    /// Callers that must not miss a free lock should use a bounded wait.
    pub fn try_acquire(&self, identity: &str) -> Result<Option<LockGuard>> {
        validate_identity(identity)?;
        if let Some(guard) = self.reenter(identity) {
            return Ok(Some(guard));
        }
        let file = self.shared.open_lock_file()?;

        if self.shared.try_lock(&file)? {
            self.grant(file, identity).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Hold the lock for the duration of `f`.
    ///
    /// The lock is released on every exit path: normal return, an error
    /// from `f`, or a panic unwinding through it. An error from `f` takes
    /// precedence over an error from the release itself.
    pub fn hold<T, F>(&self, identity: &str, f: F) -> Result<T>
    where
        F: FnOnce(&LockGuard) -> Result<T>,
    {
        let guard = self.acquire(identity)?;
        let outcome = f(&guard);
        let released = guard.release();
        let value = outcome?;
        released?;
        Ok(value)
    }

    /// Whether anyone, in any process, holds the lock right now.
    ///
    /// Probes with a non-blocking try-lock on a fresh handle that is
    /// released immediately. Never waits and never creates files. For that
    /// instant the lock looks taken to a concurrent
    /// [`NamedFileLock::try_acquire`].
    pub fn is_locked(&self) -> Result<bool> {
        let file = match OpenOptions::new().read(true).open(self.lock_path()) {
            Ok(file) => file,
            // Nobody can hold a lock whose file was never created.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(BenchError::io(
                    format!("failed to open lock file '{}'", self.lock_path().display()),
                    e,
                ));
            }
        };

        let held = !self.shared.try_lock(&file)?;
        if !held {
            let _ = FileExt::unlock(&file);
        }
        trace!(name = %self.name(), held, "probed lock");
        Ok(held)
    }

    /// Last recorded owner, reported only while the lock is held.
    ///
    /// Best effort: right after a grant the record may not be written yet,
    /// and a holder that died may have left an old one behind until the
    /// next acquire replaces it.
    pub fn current_owner(&self) -> Result<Option<OwnerRecord>> {
        if self.is_locked()? {
            Ok(self.shared.registry.read())
        } else {
            Ok(None)
        }
    }

    /// Held flag and owner in one snapshot.
    pub fn status(&self) -> Result<LockStatus> {
        let held = self.is_locked()?;
        let owner = if held {
            self.shared.registry.read()
        } else {
            None
        };
        Ok(LockStatus {
            name: self.name().clone(),
            held,
            owner,
        })
    }

    fn reenter(&self, identity: &str) -> Option<LockGuard> {
        if !self.reentrant {
            return None;
        }

        let mut held = self.shared.state();
        let current = held.as_mut().filter(|h| h.identity == identity)?;
        current.depth += 1;
        trace!(name = %self.name(), owner = identity, depth = current.depth, "re-entered lock");
        Some(LockGuard::new(
            Arc::clone(&self.shared),
            identity.to_string(),
            current.acquired_at,
        ))
    }

    /// Record ownership for a freshly locked file. If the record cannot be
    /// written the lock is given back, so no partial state survives.
    fn grant(&self, file: File, identity: &str) -> Result<LockGuard> {
        let record = match self.shared.registry.record(identity) {
            Ok(record) => record,
            Err(e) => {
                let _ = FileExt::unlock(&file);
                return Err(e);
            }
        };

        *self.shared.state() = Some(Held {
            identity: identity.to_string(),
            depth: 1,
            acquired_at: record.acquired_at,
            file,
        });

        debug!(name = %self.name(), owner = identity, "acquired lock");
        Ok(LockGuard::new(
            Arc::clone(&self.shared),
            identity.to_string(),
            record.acquired_at,
        ))
    }
}

impl LockShared {
    pub(super) fn name(&self) -> &ResourceName {
        &self.name
    }

    /// Drop one level of ownership. The outermost release clears the owner
    /// record and then unlocks. The order matters: once the OS lock is gone
    /// the next holder may already be writing its own record.
    pub(super) fn release_one(&self) -> Result<()> {
        let mut state = self.state();
        let Some(held) = state.as_mut() else {
            return Ok(());
        };

        held.depth -= 1;
        if held.depth > 0 {
            trace!(name = %self.name, depth = held.depth, "left nested hold");
            return Ok(());
        }

        let Some(held) = state.take() else {
            return Ok(());
        };
        let cleared = self.registry.clear();
        let unlocked = FileExt::unlock(&held.file)
            .map_err(|e| BenchError::io(format!("failed to unlock '{}'", self.name), e));
        // Closing the handle releases the lock even if unlock failed.
        drop(held);

        debug!(name = %self.name, "released lock");
        cleared.and(unlocked)
    }

    fn state(&self) -> MutexGuard<'_, Option<Held>> {
        self.held.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    fn open_lock_file(&self) -> Result<File> {
        fs::create_dir_all(&self.lock_dir).map_err(|e| {
            BenchError::io(
                format!("failed to create lock directory '{}'", self.lock_dir.display()),
                e,
            )
        })?;

        // Never truncated or deleted: the content is irrelevant, and removing
        // the file would race with a concurrent acquirer recreating it.
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| {
                BenchError::io(
                    format!("failed to open lock file '{}'", self.lock_path.display()),
                    e,
                )
            })
    }

    fn try_lock(&self, file: &File) -> Result<bool> {
        match file.try_lock_exclusive() {
            Ok(()) => Ok(true),
            Err(e) if is_contended(&e) => Ok(false),
            Err(e) => Err(BenchError::io(
                format!("failed to probe lock '{}'", self.lock_path.display()),
                e,
            )),
        }
    }
}

fn validate_identity(identity: &str) -> Result<()> {
    if identity.is_empty() {
        return Err(BenchError::InvalidIdentity);
    }
    Ok(())
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
