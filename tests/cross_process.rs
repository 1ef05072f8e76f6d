//! End-to-end checks with real separate processes contending for one lock.

use benchlock::exit_codes;
use benchlock::locks::{NamedFileLock, ResourceName};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn benchlock(lock_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_benchlock"));
    cmd.current_dir(lock_dir)
        .env_remove("BENCHLOCK_CONFIG")
        .env_remove("BENCHLOCK_LOCK_DIR")
        .env_remove("RUST_LOG")
        .arg("--lock-dir")
        .arg(lock_dir);
    cmd
}

fn spawn_holder(lock_dir: &Path, name: &str, who: &str, duration_ms: u64) -> Child {
    benchlock(lock_dir)
        .args(["hold", name, "--who", who, "--duration-ms"])
        .arg(duration_ms.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn benchlock")
}

fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[test]
fn holder_process_is_visible_and_exclusive() {
    let dir = TempDir::new().unwrap();
    let lock = NamedFileLock::new(ResourceName::slot(3), dir.path());
    let mut child = spawn_holder(dir.path(), "slot_3", "proc-A", 10_000);

    assert!(wait_for(Duration::from_secs(10), || {
        lock.current_owner().unwrap().is_some()
    }));
    let owner = lock.current_owner().unwrap().unwrap();
    assert_eq!(owner.owner, "proc-A");
    assert_eq!(owner.pid, Some(child.id()));

    let who = benchlock(dir.path()).args(["who", "slot_3"]).output().unwrap();
    assert!(who.status.success());
    assert!(String::from_utf8_lossy(&who.stdout).contains("slot_3: locked by proc-A"));

    let contender = benchlock(dir.path())
        .args(["hold", "slot_3", "--who", "proc-B", "--no-wait", "--duration-ms", "1"])
        .output()
        .unwrap();
    assert_eq!(contender.status.code(), Some(exit_codes::LOCK_FAILURE));
    assert!(String::from_utf8_lossy(&contender.stderr).contains("held by proc-A"));

    child.kill().unwrap();
    child.wait().unwrap();

    // The OS drops the lock with the dead process; the leftover owner
    // record is no longer reported.
    assert!(wait_for(Duration::from_secs(5), || !lock.is_locked().unwrap()));
    assert!(lock.current_owner().unwrap().is_none());

    let mut guard = lock.try_acquire("proc-C").unwrap();
    assert!(guard.is_some());
    assert_eq!(lock.current_owner().unwrap().unwrap().owner, "proc-C");
    guard.take().unwrap().release().unwrap();
}

#[test]
fn waiting_process_gets_lock_after_release() {
    let dir = TempDir::new().unwrap();
    let lock = NamedFileLock::new(ResourceName::new("scope").unwrap(), dir.path());
    let mut first = spawn_holder(dir.path(), "scope", "proc-A", 1000);

    assert!(wait_for(Duration::from_secs(10), || lock.is_locked().unwrap()));

    let second = benchlock(dir.path())
        .args(["hold", "scope", "--who", "proc-B", "--timeout-ms", "10000", "--duration-ms", "1"])
        .output()
        .unwrap();
    assert!(second.status.success());

    assert!(first.wait().unwrap().success());
    assert!(!lock.is_locked().unwrap());
}

#[test]
fn command_runs_while_lock_is_held() {
    let dir = TempDir::new().unwrap();
    let inner = env!("CARGO_BIN_EXE_benchlock");

    let output = benchlock(dir.path())
        .args(["hold", "scope", "--who", "outer", "--", inner, "--lock-dir"])
        .arg(dir.path())
        .args(["who", "scope"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("scope: locked by outer"));

    let lock = NamedFileLock::new(ResourceName::new("scope").unwrap(), dir.path());
    assert!(!lock.is_locked().unwrap());
    assert!(!lock.owner_path().exists());
}

#[test]
fn strict_mode_rejects_unconfigured_names() {
    let dir = TempDir::new().unwrap();

    let output = benchlock(dir.path())
        .args(["--strict", "who", "furnace"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(exit_codes::USER_ERROR));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no such resource: 'furnace'"));
}
