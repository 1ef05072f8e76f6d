//! Implementation of the `benchlock who` command.

use super::build_table;
use crate::cli::WhoArgs;
use benchlock::context::LockContext;
use benchlock::error::Result;
use benchlock::exit_codes;
use benchlock::locks::TableMode;

/// Print the holder of one lock without waiting for it.
pub fn cmd_who(ctx: &LockContext, mode: TableMode, args: &WhoArgs) -> Result<i32> {
    let table = build_table(ctx, mode)?;
    let status = table.lock_for(&args.name)?.status()?;

    println!("{}", status);
    if let Some(owner) = status.owner.as_ref().filter(|_| status.held) {
        if let Some(pid) = owner.pid {
            println!("  pid:   {}", pid);
        }
        if let Some(host) = &owner.host {
            println!("  host:  {}", host);
        }
        println!("  since: {}", owner.acquired_at.format("%Y-%m-%d %H:%M:%S UTC"));
        if owner.is_stale(ctx.config.lock_stale_minutes) {
            println!(
                "  warning: held longer than {} minutes",
                ctx.config.lock_stale_minutes
            );
        }
    }

    Ok(exit_codes::SUCCESS)
}
