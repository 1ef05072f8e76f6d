//! Exit code constants for the benchlock CLI.
//!
//! - 0: Success
//! - 1: User or configuration error (unknown resource, bad name, bad config)
//! - 2: I/O failure on the lock directory
//! - 3: Lock not obtained (timeout or `--no-wait` contention)
//! - 4: Instrument failure reported by a hardware collaborator

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unknown resource, or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// Filesystem failure while creating, opening, or locking a lock file.
pub const IO_FAILURE: i32 = 2;

/// The lock could not be obtained in the allowed time.
pub const LOCK_FAILURE: i32 = 3;

/// A hardware collaborator reported an error.
pub const INSTRUMENT_FAILURE: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, IO_FAILURE, LOCK_FAILURE, INSTRUMENT_FAILURE];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }
}
