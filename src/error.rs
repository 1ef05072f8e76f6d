//! Error types for benchlock.
//!
//! Uses thiserror for derive macros. Contention is not an error: probes report
//! it as a boolean or an owner record, and `acquire` simply waits.

use crate::exit_codes;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Main error type for benchlock operations.
#[derive(Error, Debug)]
pub enum BenchError {
    /// The configuration file is unreadable or fails validation.
    #[error("{0}")]
    ConfigError(String),

    /// A resource name that the lock table does not know about.
    #[error("no such resource: '{0}'")]
    UnknownResource(String),

    /// A resource name that cannot be mapped to a lock file.
    #[error("invalid resource name '{0}': use 1-64 characters from [a-z0-9_.-], not starting with '.'")]
    InvalidResourceName(String),

    /// An empty owner identity was supplied.
    #[error("owner identity must not be empty")]
    InvalidIdentity,

    /// Filesystem failure on a lock file, owner record, or lock directory.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A bounded wait expired before the lock was granted.
    #[error("timed out after {}ms waiting for lock '{name}'", waited.as_millis())]
    Timeout { name: String, waited: Duration },

    /// The lock is held and the caller asked not to wait.
    #[error("lock '{name}' is held by {}", owner.as_deref().unwrap_or("an unknown owner"))]
    LockHeld { name: String, owner: Option<String> },

    /// A hardware collaborator failed.
    #[error("instrument error: {0}")]
    Instrument(String),
}

impl BenchError {
    /// Wrap an I/O error with a description of what was being attempted.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        BenchError::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            BenchError::ConfigError(_)
            | BenchError::UnknownResource(_)
            | BenchError::InvalidResourceName(_)
            | BenchError::InvalidIdentity => exit_codes::USER_ERROR,
            BenchError::Io { .. } => exit_codes::IO_FAILURE,
            BenchError::Timeout { .. } | BenchError::LockHeld { .. } => exit_codes::LOCK_FAILURE,
            BenchError::Instrument(_) => exit_codes::INSTRUMENT_FAILURE,
        }
    }
}

/// Result type alias for benchlock operations.
pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_user_errors() {
        assert_eq!(
            BenchError::UnknownResource("slot_9".into()).exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(
            BenchError::ConfigError("bad".into()).exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(BenchError::InvalidIdentity.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn io_error_has_correct_exit_code() {
        let err = BenchError::io(
            "failed to open lock file",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.exit_code(), exit_codes::IO_FAILURE);
        assert_eq!(err.to_string(), "failed to open lock file: denied");
    }

    #[test]
    fn timeout_and_contention_map_to_lock_failure() {
        let err = BenchError::Timeout {
            name: "scope".into(),
            waited: Duration::from_millis(250),
        };
        assert_eq!(err.exit_code(), exit_codes::LOCK_FAILURE);
        assert_eq!(err.to_string(), "timed out after 250ms waiting for lock 'scope'");

        let err = BenchError::LockHeld {
            name: "slot_3".into(),
            owner: Some("proc-A".into()),
        };
        assert_eq!(err.exit_code(), exit_codes::LOCK_FAILURE);
        assert_eq!(err.to_string(), "lock 'slot_3' is held by proc-A");

        let err = BenchError::LockHeld {
            name: "slot_3".into(),
            owner: None,
        };
        assert!(err.to_string().contains("an unknown owner"));
    }

    #[test]
    fn instrument_error_has_correct_exit_code() {
        let err = BenchError::Instrument("supply offline".into());
        assert_eq!(err.exit_code(), exit_codes::INSTRUMENT_FAILURE);
        assert_eq!(err.to_string(), "instrument error: supply offline");
    }
}
