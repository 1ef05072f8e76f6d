//! Atomic filesystem operations for benchlock.
//!
//! All atomic writes follow this pattern:
//! 1. Write content to a temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Rename it over the target
//!
//! `std::fs::rename` replaces an existing destination on both POSIX and
//! Windows, so readers see either the old record or the new one.
//! On crash, a temporary file named `.{filename}.tmp` may remain; it is
//! truncated by the next write.

use crate::error::{BenchError, Result};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file.
///
/// # Returns
///
/// * `Ok(())` - On successful atomic write
/// * `Err(BenchError::Io)` - On write or rename failure
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            BenchError::io(
                format!("failed to create directory '{}'", parent.display()),
                e,
            )
        })?;
    }

    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        BenchError::io(
            format!("failed to atomically replace '{}'", path.display()),
            e,
        )
    })
}

/// Remove a file, treating "already gone" as success.
pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BenchError::io(
            format!("failed to remove '{}'", path.display()),
            e,
        )),
    }
}

fn generate_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
        BenchError::io(
            format!("invalid file path '{}'", target.display()),
            ErrorKind::InvalidInput.into(),
        )
    })?;

    Ok(parent.join(format!(".{}.tmp", filename)))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        BenchError::io(
            format!("failed to create temporary file '{}'", path.display()),
            e,
        )
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        BenchError::io("failed to write to temporary file", e)
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        BenchError::io("failed to sync temporary file to disk", e)
    })
}
