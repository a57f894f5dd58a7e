//! Oracle error classification.

use std::sync::OnceLock;

use regex::Regex;

use crate::core::traits::ErrorClassifier;
use crate::error::{BackendError, FailureKind};

/// Name already used by an existing object, or an equivalent index/constraint.
const ALREADY_EXISTS: &[i32] = &[
    955,  // name is already used by an existing object
    1408, // such column list already indexed
    2260, // table can have only one primary key
    2261, // such unique or primary key already exists
    2264, // name already used by an existing constraint
    2275, // such a referential constraint already exists
];

/// A referenced object is absent on the target.
const DEPENDENCY_MISSING: &[i32] = &[
    942,  // table or view does not exist
    2270, // no matching unique or primary key for this column-list
    4043, // object does not exist
];

/// Connection lost or listener unreachable.
const TRANSPORT: &[i32] = &[
    1012, 3113, 3114, 3135, 12170, 12514, 12537, 12541, 12547,
];

/// Object does not exist in DBMS_METADATA.
pub const METADATA_NOT_FOUND: i32 = 31603;

fn ora_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ORA-(\d{5})").expect("valid ORA pattern"))
}

/// The ORA number of an error: the native code when set, otherwise the first
/// `ORA-nnnnn` in the message.
pub fn ora_number(error: &BackendError) -> Option<i32> {
    error.code.filter(|c| *c != 0).or_else(|| {
        ora_code()
            .captures(&error.message)
            .and_then(|c| c[1].parse().ok())
    })
}

/// Classifies Oracle errors by ORA number.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleErrorClassifier;

impl ErrorClassifier for OracleErrorClassifier {
    fn name(&self) -> &str {
        "oracle"
    }

    fn classify(&self, error: &BackendError) -> FailureKind {
        if error.sqlstate_class() == Some("08") {
            return FailureKind::Transport;
        }
        match ora_number(error) {
            Some(code) if ALREADY_EXISTS.contains(&code) => FailureKind::AlreadyExists,
            Some(code) if DEPENDENCY_MISSING.contains(&code) => FailureKind::DependencyMissing,
            Some(code) if TRANSPORT.contains(&code) => FailureKind::Transport,
            _ => FailureKind::Other,
        }
    }
}
