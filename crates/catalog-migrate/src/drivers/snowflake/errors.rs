//! Snowflake error classification.

use crate::core::traits::ErrorClassifier;
use crate::error::{BackendError, FailureKind};

/// Object already exists.
const ALREADY_EXISTS: &[i32] = &[2002];

/// Object does not exist or is not authorized.
const DEPENDENCY_MISSING: &[i32] = &[2003, 2043];

/// Driver-side connection errors.
const TRANSPORT: &[i32] = &[250001, 250003, 390114];

/// Classifies Snowflake errors by error number, then SQLSTATE.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnowflakeErrorClassifier;

impl ErrorClassifier for SnowflakeErrorClassifier {
    fn name(&self) -> &str {
        "snowflake"
    }

    fn classify(&self, error: &BackendError) -> FailureKind {
        if let Some(code) = error.code {
            if ALREADY_EXISTS.contains(&code) {
                return FailureKind::AlreadyExists;
            }
            if DEPENDENCY_MISSING.contains(&code) {
                return FailureKind::DependencyMissing;
            }
            if TRANSPORT.contains(&code) {
                return FailureKind::Transport;
            }
        }
        match error.sqlstate.as_deref() {
            Some("42710") | Some("42S01") => FailureKind::AlreadyExists,
            Some("42S02") | Some("02000") => FailureKind::DependencyMissing,
            Some(state) if state.starts_with("08") => FailureKind::Transport,
            _ => FailureKind::Other,
        }
    }
}
