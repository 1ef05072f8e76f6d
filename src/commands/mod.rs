//! Command implementations for benchlock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Every command resolves the lock directory the same way
//! so that cooperating processes agree on where the lock files live.

mod hold;
mod show_config;
mod status;
mod who;

use crate::cli::{Cli, Command};
use benchlock::context::LockContext;
use benchlock::error::Result;
use benchlock::locks::{LockTable, TableMode};

/// Dispatch a command to its implementation.
///
/// Returns the process exit code on success; `hold` passes through the
/// exit code of the command it ran.
pub fn dispatch(cli: Cli) -> Result<i32> {
    let ctx = LockContext::resolve(cli.config.as_deref(), cli.lock_dir.as_deref())?;
    let mode = if cli.strict {
        TableMode::Strict
    } else {
        TableMode::Lazy
    };

    match cli.command {
        Command::Status(args) => status::cmd_status(&ctx, mode, &args),
        Command::Who(args) => who::cmd_who(&ctx, mode, &args),
        Command::Hold(args) => hold::cmd_hold(&ctx, mode, args),
        Command::Config => show_config::cmd_config(&ctx),
    }
}

fn build_table(ctx: &LockContext, mode: TableMode) -> Result<LockTable> {
    LockTable::from_config(&ctx.config, &ctx.lock_dir, mode)
}
