//! Error types for the migration library.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::schema::ObjectKind;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source object disappeared between listing and definition fetch.
    #[error("{kind} {name} not found in source catalog")]
    ObjectNotFound { kind: ObjectKind, name: String },

    /// A statement was rejected by a backend.
    #[error("Backend error: {0}")]
    Backend(BackendError),

    /// Connection-level failure against source or target.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Assisted DDL generation failed. Always recovered by the deterministic generator.
    #[error("DDL generator failure: {0}")]
    Generator(String),

    /// Data transfer failed for a specific table
    #[error("Transfer failed for table {table}: {message}")]
    Transfer { table: String, message: String },

    /// A backend call did not finish in time.
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Migration was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Transfer error
    pub fn transfer(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Transfer {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a Timeout error.
    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        MigrateError::Timeout {
            operation: operation.into(),
            seconds,
        }
    }

    /// The backend error carried by this error, if any.
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            MigrateError::Backend(e) => Some(e),
            _ => None,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) | MigrateError::Json(_) => 1,
            MigrateError::Transport(_) | MigrateError::Backend(_) | MigrateError::Timeout { .. } => 2,
            MigrateError::Transfer { .. } => 3,
            MigrateError::Cancelled => 4,
            MigrateError::Generator(_) | MigrateError::ObjectNotFound { .. } => 5,
            MigrateError::Io(_) => 7,
        }
    }
}

/// Error reported by a backend for a single statement.
///
/// `code` is the vendor's native error number (ORA-00955 is `955`), `sqlstate`
/// the five character ODBC state when the driver provides one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendError {
    pub code: Option<i32>,
    pub sqlstate: Option<String>,
    pub message: String,
}

impl BackendError {
    pub fn new(code: Option<i32>, sqlstate: Option<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            sqlstate,
            message: message.into(),
        }
    }

    /// Backend error with only a native code.
    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self::new(Some(code), None, message)
    }

    /// SQLSTATE class (first two characters).
    pub fn sqlstate_class(&self) -> Option<&str> {
        self.sqlstate.as_deref().and_then(|s| s.get(..2))
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.sqlstate) {
            (Some(code), Some(state)) => write!(f, "[{} / {}] {}", code, state, self.message),
            (Some(code), None) => write!(f, "[{}] {}", code, self.message),
            (None, Some(state)) => write!(f, "[{}] {}", state, self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl From<BackendError> for MigrateError {
    fn from(e: BackendError) -> Self {
        MigrateError::Backend(e)
    }
}

/// Object-scoped failure classes produced by an error classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Target object name collision. Recorded as skipped, never as a failure.
    AlreadyExists,
    /// A referenced object is absent on the target.
    DependencyMissing,
    /// Connection lost or unreachable.
    Transport,
    /// Anything else the backend rejected.
    Other,
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
