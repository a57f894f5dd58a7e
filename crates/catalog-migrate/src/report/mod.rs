//! Run reports: per-object outcomes, integrity warnings and aggregates.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::schema::{ObjectKind, SchemaObject};
use crate::error::Result;
use crate::orchestrator::phase::Phase;

/// Result of applying one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Created,
    SkippedExists,
    Failed,
}

/// One entry of the append-only outcome log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOutcome {
    pub phase: Phase,
    pub object: SchemaObject,
    pub status: OutcomeStatus,

    /// Backend message for failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Rows copied, for `LOAD_DATA` outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows_loaded: Option<u64>,
}

impl MigrationOutcome {
    pub fn new(phase: Phase, object: SchemaObject, status: OutcomeStatus) -> Self {
        Self {
            phase,
            object,
            status,
            detail: None,
            rows_loaded: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_rows(mut self, rows: u64) -> Self {
        self.rows_loaded = Some(rows);
        self
    }
}

/// Category of a run warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Source and target row counts differ after a load.
    RowCountMismatch,
    /// A row count could not be read.
    RowCountUnavailable,
    /// An object listing failed; the objects it would have produced were skipped.
    ListingFailed,
}

/// A non-fatal problem recorded alongside the outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunWarning {
    pub kind: WarningKind,
    /// Table or listing the warning is about.
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_rows: Option<u64>,
    pub message: String,
}

impl RunWarning {
    pub fn row_count_mismatch(table: &str, source_rows: u64, target_rows: u64) -> Self {
        Self {
            kind: WarningKind::RowCountMismatch,
            object: table.to_string(),
            source_rows: Some(source_rows),
            target_rows: Some(target_rows),
            message: format!(
                "row count mismatch: source={} target={}",
                source_rows, target_rows
            ),
        }
    }

    pub fn row_count_unavailable(table: &str, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::RowCountUnavailable,
            object: table.to_string(),
            source_rows: None,
            target_rows: None,
            message: message.into(),
        }
    }

    pub fn listing_failed(listing: &str, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ListingFailed,
            object: listing.to_string(),
            source_rows: None,
            target_rows: None,
            message: message.into(),
        }
    }
}

/// Overall run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    CompletedWithErrors,
    Cancelled,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: RunStatus,

    pub source_schema: String,
    pub target_schema: String,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    pub created: usize,
    pub skipped_exists: usize,
    pub failed: usize,

    /// Tables with a `LOAD_DATA` outcome of `CREATED`.
    pub tables_loaded: usize,

    /// Total rows copied.
    pub rows_loaded: u64,

    /// Outcomes in the order they were produced.
    pub outcomes: Vec<MigrationOutcome>,

    /// Row-count and listing warnings.
    pub warnings: Vec<RunWarning>,
}

impl MigrationReport {
    /// Aggregate outcomes into a report.
    pub fn build(
        run_id: String,
        source_schema: String,
        target_schema: String,
        started_at: DateTime<Utc>,
        outcomes: Vec<MigrationOutcome>,
        warnings: Vec<RunWarning>,
        cancelled: bool,
    ) -> Self {
        let completed_at = Utc::now();
        let duration_seconds = (completed_at - started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
            .as_secs_f64();

        let count = |s: OutcomeStatus| outcomes.iter().filter(|o| o.status == s).count();
        let created = count(OutcomeStatus::Created);
        let skipped_exists = count(OutcomeStatus::SkippedExists);
        let failed = count(OutcomeStatus::Failed);

        let loads = outcomes
            .iter()
            .filter(|o| o.phase == Phase::LoadData && o.status == OutcomeStatus::Created);
        let tables_loaded = loads.clone().count();
        let rows_loaded = loads.filter_map(|o| o.rows_loaded).sum();

        let status = if cancelled {
            RunStatus::Cancelled
        } else if failed > 0 {
            RunStatus::CompletedWithErrors
        } else {
            RunStatus::Completed
        };

        Self {
            run_id,
            status,
            source_schema,
            target_schema,
            started_at,
            completed_at,
            duration_seconds,
            created,
            skipped_exists,
            failed,
            tables_loaded,
            rows_loaded,
            outcomes,
            warnings,
        }
    }

    /// Outcomes for one object, in the order they were recorded.
    pub fn outcomes_for(&self, kind: ObjectKind, name: &str) -> Vec<&MigrationOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.object.kind == kind && o.object.name == name)
            .collect()
    }

    /// Outcomes recorded in one phase.
    pub fn phase_outcomes(&self, phase: Phase) -> Vec<&MigrationOutcome> {
        self.outcomes.iter().filter(|o| o.phase == phase).collect()
    }

    /// All failed outcomes.
    pub fn failures(&self) -> Vec<&MigrationOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Failed)
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Whether any loaded table ended with a different row count than its source.
    pub fn has_row_count_mismatch(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| w.kind == WarningKind::RowCountMismatch)
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Objects a run would touch, per phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub source_schema: String,
    pub target_schema: String,
    /// `catalog` or `generate`.
    pub table_ddl: String,
    pub phases: Vec<PlannedPhase>,
    pub warnings: Vec<RunWarning>,
}

/// Objects scheduled in one phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedPhase {
    pub phase: Phase,
    pub objects: Vec<SchemaObject>,
}

impl MigrationPlan {
    /// Number of objects scheduled in a phase.
    pub fn count(&self, phase: Phase) -> usize {
        self.phases
            .iter()
            .find(|p| p.phase == phase)
            .map_or(0, |p| p.objects.len())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Source and target row counts for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCountCheck {
    pub table: String,
    pub source_rows: u64,
    /// `None` when the target table could not be counted.
    pub target_rows: Option<u64>,
}

impl RowCountCheck {
    pub fn matches(&self) -> bool {
        self.target_rows == Some(self.source_rows)
    }
}

/// Connectivity of one endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointHealth {
    pub healthy: bool,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub source: EndpointHealth,
    pub target: EndpointHealth,
}

impl HealthCheckResult {
    pub fn healthy(&self) -> bool {
        self.source.healthy && self.target.healthy
    }
}
