//! Lock directory and configuration file resolution for benchlock.
//!
//! Every cooperating process must agree on one lock directory, so this
//! module is the single place that decides where it lives. Precedence is
//! explicit flag, then environment, then configuration, then the default
//! under the user's home directory.

use crate::config::Config;
use crate::error::{BenchError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable overriding the lock directory.
pub const LOCK_DIR_ENV: &str = "BENCHLOCK_LOCK_DIR";

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "BENCHLOCK_CONFIG";

/// Configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "benchlock.yaml";

/// Default lock directory relative to the home directory.
pub const DEFAULT_LOCK_SUBDIR: &str = ".benchlock/locks";

/// Resolved locations for one benchlock invocation.
#[derive(Debug, Clone)]
pub struct LockContext {
    /// Directory holding `<name>.lock` and `<name>.owner` files.
    pub lock_dir: PathBuf,

    /// Configuration file that was loaded, if any.
    pub config_path: Option<PathBuf>,

    pub config: Config,
}

impl LockContext {
    /// Load configuration and resolve the lock directory.
    pub fn resolve(cli_config: Option<&Path>, cli_lock_dir: Option<&Path>) -> Result<Self> {
        let config_path = resolve_config_path(cli_config);
        let config = match &config_path {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        let lock_dir = resolve_lock_dir(cli_lock_dir, &config)?;

        Ok(Self {
            lock_dir,
            config_path,
            config,
        })
    }

    /// Context with an explicit directory and configuration.
    pub fn with_config(lock_dir: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            lock_dir: lock_dir.into(),
            config_path: None,
            config,
        }
    }
}

/// Pick the configuration file: flag, then `BENCHLOCK_CONFIG`, then
/// `./benchlock.yaml` if it exists. `None` means built-in defaults.
pub fn resolve_config_path(cli_config: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_config {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.is_file().then_some(local)
}

/// Pick the lock directory: flag, then `BENCHLOCK_LOCK_DIR`, then config,
/// then `<home>/.benchlock/locks`.
pub fn resolve_lock_dir(cli_lock_dir: Option<&Path>, config: &Config) -> Result<PathBuf> {
    if let Some(dir) = cli_lock_dir {
        return Ok(dir.to_path_buf());
    }

    if let Some(dir) = env::var_os(LOCK_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    if let Some(dir) = &config.lock_dir {
        return Ok(dir.clone());
    }

    dirs::home_dir()
        .map(|home| home.join(DEFAULT_LOCK_SUBDIR))
        .ok_or_else(|| {
            BenchError::ConfigError(format!(
                "cannot determine a home directory; set {} or lock_dir in the config",
                LOCK_DIR_ENV
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    struct EnvGuard {
        key: &'static str,
        original: Option<std::ffi::OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &Path) -> Self {
            let original = env::var_os(key);
            // SAFETY: every test touching the environment is #[serial].
            unsafe { env::set_var(key, value) };
            Self { key, original }
        }

        fn unset(key: &'static str) -> Self {
            let original = env::var_os(key);
            // SAFETY: every test touching the environment is #[serial].
            unsafe { env::remove_var(key) };
            Self { key, original }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            // SAFETY: every test touching the environment is #[serial].
            unsafe {
                match &self.original {
                    Some(value) => env::set_var(self.key, value),
                    None => env::remove_var(self.key),
                }
            }
        }
    }

    #[test]
    #[serial]
    fn cli_flag_wins_over_everything() {
        let temp_dir = TempDir::new().unwrap();
        let _env = EnvGuard::set(LOCK_DIR_ENV, &temp_dir.path().join("env"));
        let config = Config {
            lock_dir: Some(temp_dir.path().join("config")),
            ..Config::default()
        };

        let dir = resolve_lock_dir(Some(&temp_dir.path().join("flag")), &config).unwrap();
        assert_eq!(dir, temp_dir.path().join("flag"));
    }

    #[test]
    #[serial]
    fn env_wins_over_config() {
        let temp_dir = TempDir::new().unwrap();
        let _env = EnvGuard::set(LOCK_DIR_ENV, &temp_dir.path().join("env"));
        let config = Config {
            lock_dir: Some(temp_dir.path().join("config")),
            ..Config::default()
        };

        let dir = resolve_lock_dir(None, &config).unwrap();
        assert_eq!(dir, temp_dir.path().join("env"));
    }

    #[test]
    #[serial]
    fn config_wins_over_home_default() {
        let temp_dir = TempDir::new().unwrap();
        let _env = EnvGuard::unset(LOCK_DIR_ENV);
        let config = Config {
            lock_dir: Some(temp_dir.path().join("config")),
            ..Config::default()
        };

        let dir = resolve_lock_dir(None, &config).unwrap();
        assert_eq!(dir, temp_dir.path().join("config"));
    }

    #[test]
    #[serial]
    fn default_lives_under_home() {
        let _env = EnvGuard::unset(LOCK_DIR_ENV);

        if let Some(home) = dirs::home_dir() {
            let dir = resolve_lock_dir(None, &Config::default()).unwrap();
            assert_eq!(dir, home.join(DEFAULT_LOCK_SUBDIR));
        }
    }

    #[test]
    #[serial]
    fn config_path_from_env() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bench.yaml");
        let _env = EnvGuard::set(CONFIG_ENV, &path);

        assert_eq!(resolve_config_path(None), Some(path.clone()));
        assert_eq!(
            resolve_config_path(Some(Path::new("other.yaml"))),
            Some(PathBuf::from("other.yaml"))
        );
    }

    #[test]
    #[serial]
    fn resolve_loads_config_and_lock_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bench.yaml");
        let lock_dir = temp_dir.path().join("locks");
        std::fs::write(
            &config_path,
            format!("lock_dir: {}\nslots:\n  - slot: 2\n", lock_dir.display()),
        )
        .unwrap();
        let _env = EnvGuard::unset(LOCK_DIR_ENV);

        let ctx = LockContext::resolve(Some(&config_path), None).unwrap();
        assert_eq!(ctx.lock_dir, lock_dir);
        assert_eq!(ctx.config_path, Some(config_path));
        assert_eq!(ctx.config.slots.len(), 1);
    }
}
