//! Migration phases, in execution order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A step of the migration state machine.
///
/// Each phase finishes, with its commits, before the next one starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Connect,
    ListTables,
    CreateTables,
    CreateSequences,
    LoadData,
    ApplyNonReferentialConstraints,
    ApplyReferentialConstraints,
    CreateIndexes,
    CreateViews,
    CreateCodeObjects,
    Done,
}

impl Phase {
    pub const ALL: [Phase; 11] = [
        Phase::Connect,
        Phase::ListTables,
        Phase::CreateTables,
        Phase::CreateSequences,
        Phase::LoadData,
        Phase::ApplyNonReferentialConstraints,
        Phase::ApplyReferentialConstraints,
        Phase::CreateIndexes,
        Phase::CreateViews,
        Phase::CreateCodeObjects,
        Phase::Done,
    ];

    /// 1-based position, used in log lines.
    pub fn number(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).map_or(0, |i| i + 1)
    }

    /// The phase that follows, or `None` after `Done`.
    pub fn next(&self) -> Option<Phase> {
        Self::ALL.get(self.number()).copied()
    }

    pub fn description(&self) -> &'static str {
        match self {
            Phase::Connect => "Connecting to source and target",
            Phase::ListTables => "Listing tables",
            Phase::CreateTables => "Creating tables",
            Phase::CreateSequences => "Creating sequences",
            Phase::LoadData => "Loading data",
            Phase::ApplyNonReferentialConstraints => "Applying primary key, unique and check constraints",
            Phase::ApplyReferentialConstraints => "Applying foreign keys",
            Phase::CreateIndexes => "Creating indexes",
            Phase::CreateViews => "Creating views",
            Phase::CreateCodeObjects => "Creating code objects",
            Phase::Done => "Done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Connect => "CONNECT",
            Phase::ListTables => "LIST_TABLES",
            Phase::CreateTables => "CREATE_TABLES",
            Phase::CreateSequences => "CREATE_SEQUENCES",
            Phase::LoadData => "LOAD_DATA",
            Phase::ApplyNonReferentialConstraints => "APPLY_NON_REFERENTIAL_CONSTRAINTS",
            Phase::ApplyReferentialConstraints => "APPLY_REFERENTIAL_CONSTRAINTS",
            Phase::CreateIndexes => "CREATE_INDEXES",
            Phase::CreateViews => "CREATE_VIEWS",
            Phase::CreateCodeObjects => "CREATE_CODE_OBJECTS",
            Phase::Done => "DONE",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_sequence() {
        let mut phase = Phase::Connect;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            seen.push(next);
            phase = next;
        }
        assert_eq!(seen, Phase::ALL.to_vec());
        assert!(Phase::LoadData < Phase::ApplyNonReferentialConstraints);
        assert!(Phase::ApplyReferentialConstraints < Phase::CreateIndexes);
    }

    #[test]
    fn test_phase_numbers_and_names() {
        assert_eq!(Phase::Connect.number(), 1);
        assert_eq!(Phase::Done.number(), 11);
        assert_eq!(Phase::ApplyReferentialConstraints.to_string(), "APPLY_REFERENTIAL_CONSTRAINTS");
        assert_eq!(
            serde_json::to_string(&Phase::CreateCodeObjects).unwrap(),
            "\"CREATE_CODE_OBJECTS\""
        );
    }
}
