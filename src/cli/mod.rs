//! CLI argument parsing for benchlock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Benchlock: cross-process locks for lab hardware shared by measurement scripts.
///
/// Each resource (a bias slot, the signal-acquisition chain) has one lock
/// file in a shared directory. Any process can see who holds what without
/// waiting for it.
#[derive(Parser, Debug)]
#[command(name = "benchlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (default: $BENCHLOCK_CONFIG, then ./benchlock.yaml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Lock directory (default: $BENCHLOCK_LOCK_DIR, then the config, then ~/.benchlock/locks).
    #[arg(long, global = true)]
    pub lock_dir: Option<PathBuf>,

    /// Only accept resource names defined in the configuration.
    #[arg(long, global = true)]
    pub strict: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Available commands for benchlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show every known lock, whether it is held, and by whom.
    ///
    /// Never waits for any lock.
    Status(StatusArgs),

    /// Print who holds one lock.
    Who(WhoArgs),

    /// Hold a lock while running a command (or for a fixed time).
    ///
    /// The lock is released when the command exits, whatever its outcome.
    Hold(HoldArgs),

    /// Print the effective configuration and lock directory.
    Config,
}

/// Arguments for the `status` command.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Keep refreshing until interrupted.
    #[arg(long)]
    pub watch: bool,

    /// Refresh interval in milliseconds (with --watch).
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// Clear the screen between refreshes (with --watch).
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub clear: bool,

    /// Print JSON instead of a table.
    #[arg(long, conflicts_with = "watch")]
    pub json: bool,
}

/// Arguments for the `who` command.
#[derive(Parser, Debug)]
pub struct WhoArgs {
    /// Resource name (e.g. slot_3, signal_acquisition).
    pub name: String,
}

/// Arguments for the `hold` command.
#[derive(Parser, Debug)]
pub struct HoldArgs {
    /// Resource name (e.g. slot_3, signal_acquisition).
    pub name: String,

    /// Owner identity to record (default: user@host:pid).
    #[arg(long)]
    pub who: Option<String>,

    /// Give up after this many milliseconds instead of waiting forever.
    #[arg(long, conflicts_with = "no_wait")]
    pub timeout_ms: Option<u64>,

    /// Fail immediately if the lock is held.
    ///
    /// May also fail on a free lock if another process is probing it at that
    /// moment (e.g. `status --watch`); prefer --timeout-ms for scripts.
    #[arg(long)]
    pub no_wait: bool,

    /// Hold for this many milliseconds when no command is given.
    #[arg(long, required_unless_present = "command", conflicts_with = "command")]
    pub duration_ms: Option<u64>,

    /// Command to run while holding the lock.
    #[arg(last = true)]
    pub command: Vec<String>,
}
