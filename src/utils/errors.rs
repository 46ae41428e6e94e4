//! Error types for adshell
//!
//! All error types use thiserror for clean error handling.
//! SECURITY: Error messages MUST NOT contain passwords or sensitive data;
//! the executor redacts the session password before errors propagate.

use std::time::Duration;

/// Top-level error type for directory operations
#[derive(Debug, thiserror::Error)]
pub enum AdError {
    /// Caller-side validation failure, raised before any process is spawned
    #[error("Validation error: {0}")]
    Validation(String),

    /// Kerberos-only mode precondition failure (no usable ticket)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The external process failed to run to a clean exit
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// The process exited cleanly but its output signalled failure
    #[error("{0}")]
    Semantic(String),

    /// Query output could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors from the process executor
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("{message}")]
    NonZeroExit { code: Option<i32>, message: String },
}

/// Errors from credential construction and validation
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Invalid username format: {0}")]
    InvalidUsername(String),
}

impl AdError {
    /// True when the failure happened before any external command ran.
    ///
    /// The UI uses this to distinguish "fix your input/settings" from
    /// "the directory said no".
    pub fn is_pre_dispatch(&self) -> bool {
        matches!(self, AdError::Validation(_) | AdError::Precondition(_))
    }
}
