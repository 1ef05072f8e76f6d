//! Implementation of the `benchlock status` command.
//!
//! Lists every known lock with its holder. Probing never waits, so the
//! command is safe to run while measurements are in progress. With
//! `--watch` it becomes a refresh-based dashboard using ANSI escapes.

use super::build_table;
use crate::cli::StatusArgs;
use benchlock::context::LockContext;
use benchlock::error::{BenchError, Result};
use benchlock::exit_codes;
use benchlock::locks::{LockStatus, LockTable, TableMode};
use chrono::Utc;
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

/// Lower bound on the refresh interval.
const MIN_INTERVAL_MS: u64 = 50;

pub fn cmd_status(ctx: &LockContext, mode: TableMode, args: &StatusArgs) -> Result<i32> {
    let table = build_table(ctx, mode)?;

    if args.json {
        table.discover()?;
        let statuses = table.statuses()?;
        let json = serde_json::to_string_pretty(&statuses)
            .map_err(|e| BenchError::io("failed to serialize lock status", e.into()))?;
        println!("{}", json);
        return Ok(exit_codes::SUCCESS);
    }

    loop {
        if args.watch && args.clear {
            clear_screen();
        }

        // Names created by other processes may appear between refreshes.
        table.discover()?;
        render_once(ctx, &table, args.watch)?;

        if !args.watch {
            break;
        }

        thread::sleep(Duration::from_millis(args.interval_ms.max(MIN_INTERVAL_MS)));
    }

    Ok(exit_codes::SUCCESS)
}

fn render_once(ctx: &LockContext, table: &LockTable, watching: bool) -> Result<()> {
    let statuses = table.statuses()?;

    if watching {
        println!("Benchlock Status  (Ctrl+C to exit)");
        println!("Updated: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
        println!();
    }
    println!("Lock dir: {}", ctx.lock_dir.display());
    println!();

    if statuses.is_empty() {
        println!("No locks known. Configure slots or run `benchlock hold <name>` first.");
        return Ok(());
    }

    let rows: Vec<[String; 4]> = statuses
        .iter()
        .map(|status| status_row(ctx, status))
        .collect();

    let name_width = rows.iter().map(|r| r[0].len()).max().unwrap_or(0).max(4);
    let device_width = rows.iter().map(|r| r[1].len()).max().unwrap_or(0).max(6);

    println!(
        "  {:name_width$}  {:device_width$}  {:6}  OWNER",
        "NAME", "DEVICE", "STATE"
    );
    for [name, device, state, owner] in &rows {
        println!(
            "  {:name_width$}  {:device_width$}  {:6}  {}",
            name, device, state, owner
        );
    }

    let held = statuses.iter().filter(|s| s.held).count();
    let stale = statuses
        .iter()
        .filter(|s| s.held && s.is_stale(ctx.config.lock_stale_minutes))
        .count();
    println!();
    println!("{} of {} lock(s) held", held, statuses.len());
    if stale > 0 {
        println!(
            "{} lock(s) held longer than {} minutes",
            stale, ctx.config.lock_stale_minutes
        );
    }

    Ok(())
}

/// Columns for one lock: name, device, state, owner description.
fn status_row(ctx: &LockContext, status: &LockStatus) -> [String; 4] {
    let device = ctx
        .config
        .device_for(&status.name)
        .unwrap_or("-")
        .to_string();

    let (state, owner) = match (status.held, &status.owner) {
        (false, _) => ("free", String::new()),
        (true, None) => ("held", "(unknown)".to_string()),
        (true, Some(record)) => {
            let mut owner = format!("{} ({} ago", record.owner, record.age_string());
            if let Some(pid) = record.pid {
                owner.push_str(&format!(", pid {}", pid));
            }
            if let Some(host) = &record.host {
                owner.push_str(&format!(" on {}", host));
            }
            owner.push(')');
            if record.is_stale(ctx.config.lock_stale_minutes) {
                owner.push_str(" [STALE]");
            }
            ("held", owner)
        }
    };

    [status.name.to_string(), device, state.to_string(), owner]
}

fn clear_screen() {
    print!("\x1b[2J\x1b[H");
    let _ = io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchlock::config::Config;
    use benchlock::locks::{NamedFileLock, ResourceName};
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> LockContext {
        let config = Config::from_yaml(
            "slots:\n  - slot: 1\n    device_name: \"W3-A\"\n    supply_serial: \"13398\"\n",
        )
        .unwrap();
        LockContext::with_config(dir.path(), config)
    }

    #[test]
    fn free_lock_row_has_no_owner() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let status = LockStatus {
            name: ResourceName::slot(1),
            held: false,
            owner: None,
        };

        let [name, device, state, owner] = status_row(&ctx, &status);
        assert_eq!(name, "slot_1");
        assert_eq!(device, "W3-A");
        assert_eq!(state, "free");
        assert!(owner.is_empty());
    }

    #[test]
    fn held_lock_row_names_owner() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let lock = NamedFileLock::new(ResourceName::slot(1), dir.path());
        let _guard = lock.acquire("proc-A").unwrap();

        let status = lock.status().unwrap();
        let [_, _, state, owner] = status_row(&ctx, &status);
        assert_eq!(state, "held");
        assert!(owner.starts_with("proc-A ("));
        assert!(owner.contains(&format!("pid {}", std::process::id())));
        assert!(!owner.contains("[STALE]"));
    }

    #[test]
    fn unconfigured_name_has_no_device() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let status = LockStatus {
            name: ResourceName::new("furnace").unwrap(),
            held: true,
            owner: None,
        };

        let [_, device, state, owner] = status_row(&ctx, &status);
        assert_eq!(device, "-");
        assert_eq!(state, "held");
        assert_eq!(owner, "(unknown)");
    }

    #[test]
    fn status_lists_discovered_locks() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let other = NamedFileLock::new(ResourceName::new("furnace").unwrap(), dir.path());
        let _guard = other.acquire("proc-B").unwrap();

        let args = StatusArgs {
            watch: false,
            interval_ms: 1000,
            clear: false,
            json: false,
        };
        assert_eq!(cmd_status(&ctx, TableMode::Lazy, &args).unwrap(), 0);

        let table = build_table(&ctx, TableMode::Lazy).unwrap();
        assert_eq!(table.discover().unwrap(), 1);
        assert!(table.is_held("furnace").unwrap());
    }
}
