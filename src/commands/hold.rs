//! Implementation of the `benchlock hold` command.
//!
//! Acquires one named lock, runs a command (or sleeps) while holding it,
//! and releases it afterwards whatever the command's outcome. If this
//! process dies instead, the OS releases the lock with the file handle.

use super::build_table;
use crate::cli::HoldArgs;
use benchlock::context::LockContext;
use benchlock::error::{BenchError, Result};
use benchlock::exit_codes;
use benchlock::locks::{LockGuard, NamedFileLock, TableMode, default_identity};
use std::process::{Command, ExitStatus};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Exit codes above this report a child terminated by a signal.
const SIGNAL_EXIT_BASE: i32 = 128;

pub fn cmd_hold(ctx: &LockContext, mode: TableMode, args: HoldArgs) -> Result<i32> {
    let table = build_table(ctx, mode)?;
    let lock = table.lock_for(&args.name)?;
    let identity = args.who.clone().unwrap_or_else(default_identity);

    let guard = acquire(&lock, &identity, &args)?;
    eprintln!("Holding '{}' as {}", guard.name(), guard.identity());

    let outcome = if args.command.is_empty() {
        let duration = Duration::from_millis(args.duration_ms.unwrap_or(0));
        debug!(name = %guard.name(), ?duration, "holding without a command");
        thread::sleep(duration);
        Ok(exit_codes::SUCCESS)
    } else {
        run_command(&args.command)
    };

    // Release before reporting a spawn failure so the lock is never kept.
    guard.release()?;
    outcome
}

fn acquire(lock: &NamedFileLock, identity: &str, args: &HoldArgs) -> Result<LockGuard> {
    if args.no_wait {
        return match lock.try_acquire(identity)? {
            Some(guard) => Ok(guard),
            None => Err(BenchError::LockHeld {
                name: lock.name().to_string(),
                owner: lock.current_owner()?.map(|record| record.owner),
            }),
        };
    }

    if let Some(holder) = lock.current_owner()? {
        info!(name = %lock.name(), owner = %holder.owner, "waiting for lock");
    }
    lock.acquire_with(identity, args.timeout_ms.map(Duration::from_millis))
}

/// Run `argv` with inherited stdio and return its exit code. A child
/// killed by a signal reports `128 + signal`, as shells do.
fn run_command(argv: &[String]) -> Result<i32> {
    let (program, rest) = argv
        .split_first()
        .ok_or_else(|| BenchError::ConfigError("no command given".to_string()))?;

    info!(command = %argv.join(" "), "running command under lock");
    let status = Command::new(program)
        .args(rest)
        .status()
        .map_err(|e| BenchError::io(format!("failed to run '{}'", program), e))?;

    Ok(child_exit_code(status))
}

fn child_exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return SIGNAL_EXIT_BASE + signal;
        }
    }

    SIGNAL_EXIT_BASE
}
