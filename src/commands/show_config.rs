//! Implementation of the `benchlock config` command.

use benchlock::context::LockContext;
use benchlock::error::Result;
use benchlock::exit_codes;

/// Print where the configuration came from, the lock directory every
/// cooperating process must share, and the effective settings.
pub fn cmd_config(ctx: &LockContext) -> Result<i32> {
    match &ctx.config_path {
        Some(path) => println!("# config:   {}", path.display()),
        None => println!("# config:   (built-in defaults)"),
    }
    println!("# lock dir: {}", ctx.lock_dir.display());
    print!("{}", ctx.config.to_yaml()?);
    Ok(exit_codes::SUCCESS)
}
