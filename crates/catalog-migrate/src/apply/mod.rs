//! Statement applier: one definition, one transaction, one classified outcome.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::core::identifier::IdentStyle;
use crate::core::schema::ObjectKind;
use crate::core::traits::{ErrorClassifier, TargetCatalog};
use crate::error::{FailureKind, MigrateError, Result};
use crate::report::OutcomeStatus;

/// Classified result of applying one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyResult {
    pub status: OutcomeStatus,
    pub detail: Option<String>,
    /// Failure class when the backend rejected the statement.
    pub failure: Option<FailureKind>,
}

impl ApplyResult {
    fn created() -> Self {
        Self {
            status: OutcomeStatus::Created,
            detail: None,
            failure: None,
        }
    }

    fn skipped(detail: String) -> Self {
        Self {
            status: OutcomeStatus::SkippedExists,
            detail: Some(detail),
            failure: Some(FailureKind::AlreadyExists),
        }
    }

    fn failed(detail: String, failure: FailureKind) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            detail: Some(detail),
            failure: Some(failure),
        }
    }

    /// True when the target connection itself is gone.
    pub fn is_transport_failure(&self) -> bool {
        self.failure == Some(FailureKind::Transport)
    }
}

/// Executes definitions against the target and classifies the outcome.
///
/// Never aborts the run: every error becomes an [`ApplyResult`].
pub struct Applier {
    target: Arc<dyn TargetCatalog>,
    classifier: Arc<dyn ErrorClassifier>,
    timeout: Duration,
}

impl Applier {
    pub fn new(
        target: Arc<dyn TargetCatalog>,
        classifier: Arc<dyn ErrorClassifier>,
        timeout: Duration,
    ) -> Self {
        Self {
            target,
            classifier,
            timeout,
        }
    }

    /// Apply one statement. Success commits; failure rolls back.
    pub async fn apply(&self, statement: &str) -> ApplyResult {
        let statement = statement.trim();
        if statement.is_empty() {
            return ApplyResult::failed("empty definition".into(), FailureKind::Other);
        }

        match self.run(statement).await {
            Ok(()) => match self.with_timeout("commit", self.target.commit()).await {
                Ok(()) => ApplyResult::created(),
                Err(e) => {
                    let failure = self.classify(&e);
                    self.rollback().await;
                    ApplyResult::failed(e.to_string(), failure)
                }
            },
            Err(e) => {
                self.rollback().await;
                match self.classify(&e) {
                    FailureKind::AlreadyExists => ApplyResult::skipped(e.to_string()),
                    failure => ApplyResult::failed(e.to_string(), failure),
                }
            }
        }
    }

    /// Best-effort drop. Errors are logged at debug level and ignored.
    pub async fn drop_best_effort(&self, kind: ObjectKind, name: &str, style: IdentStyle) {
        let Some(sql) = self.target.drop_statement(kind, name, style) else {
            return;
        };
        match self.run(&sql).await {
            Ok(()) => {
                if let Err(e) = self.target.commit().await {
                    debug!("commit after drop of {} {} failed: {}", kind, name, e);
                }
            }
            Err(e) => {
                debug!("drop of {} {} ignored: {}", kind, name, e);
                self.rollback().await;
            }
        }
    }

    async fn run(&self, statement: &str) -> Result<()> {
        self.with_timeout("execute", self.target.execute(statement))
            .await
    }

    async fn rollback(&self) {
        if let Err(e) = self.with_timeout("rollback", self.target.rollback()).await {
            debug!("rollback failed: {}", e);
        }
    }

    async fn with_timeout<F>(&self, operation: &str, fut: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(MigrateError::timeout(operation, self.timeout.as_secs())),
        }
    }

    fn classify(&self, error: &MigrateError) -> FailureKind {
        match error {
            MigrateError::Backend(e) => self.classifier.classify(e),
            MigrateError::Transport(_) => FailureKind::Transport,
            _ => FailureKind::Other,
        }
    }
}
