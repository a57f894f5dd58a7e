//! Data transfer engine: streams one table from source to target in bounded batches.
//!
//! The source reader fills a bounded channel from a background task while the
//! engine writes each batch with a positional, parameter-bound insert. At most
//! a few batches are in memory at any time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::core::identifier::IdentStyle;
use crate::core::traits::{ReadOptions, SourceCatalog, TargetCatalog};
use crate::error::{MigrateError, Result};

/// Transfer engine configuration.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Rows per fetch and insert.
    pub batch_size: usize,

    /// Commit after each batch; otherwise once at the end of the table.
    pub commit_every_batch: bool,

    /// Limit for each fetch, insert and commit.
    pub timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            batch_size: 5000,
            commit_every_batch: true,
            timeout: Duration::from_secs(300),
        }
    }
}

/// Transfer job for a single table.
#[derive(Debug, Clone)]
pub struct TransferJob {
    /// Table name as listed by the source.
    pub table: String,

    /// Source columns to select, in order.
    pub select_columns: Vec<String>,

    /// Target columns receiving the values, positionally.
    pub insert_columns: Vec<String>,

    /// Spelling of the target table and columns in the INSERT.
    pub ident_style: IdentStyle,
}

/// Statistics from a transfer job.
#[derive(Debug, Clone, Default)]
pub struct TransferStats {
    /// Total rows transferred.
    pub rows: u64,

    /// Non-empty batches written.
    pub batches: usize,

    /// Time spent waiting for the source.
    pub read_time: Duration,

    /// Time spent inserting and committing.
    pub write_time: Duration,
}

/// Copies table data between one source and one target connection.
pub struct TransferEngine {
    source: Arc<dyn SourceCatalog>,
    target: Arc<dyn TargetCatalog>,
    config: TransferConfig,
}

impl TransferEngine {
    pub fn new(
        source: Arc<dyn SourceCatalog>,
        target: Arc<dyn TargetCatalog>,
        config: TransferConfig,
    ) -> Self {
        Self {
            source,
            target,
            config,
        }
    }

    /// Copy every row of `job.table`. On error the open transaction is rolled
    /// back; batches committed earlier stay in place.
    pub async fn execute(&self, job: TransferJob) -> Result<TransferStats> {
        if job.select_columns.len() != job.insert_columns.len() {
            return Err(MigrateError::transfer(
                &job.table,
                format!(
                    "{} source columns but {} target columns",
                    job.select_columns.len(),
                    job.insert_columns.len()
                ),
            ));
        }

        let started = Instant::now();
        let result = self.copy(&job).await;
        match result {
            Ok(stats) => {
                let secs = started.elapsed().as_secs_f64();
                let rate = if secs > 0.0 { stats.rows as f64 / secs } else { 0.0 };
                info!(
                    "{}: {} rows in {} batches ({:.0} rows/s)",
                    job.table, stats.rows, stats.batches, rate
                );
                Ok(stats)
            }
            Err(e) => {
                if let Err(rb) = self.target.rollback().await {
                    debug!("{}: rollback after failed load also failed: {}", job.table, rb);
                }
                warn!("{}: load failed: {}", job.table, e);
                Err(match e {
                    e @ MigrateError::Transfer { .. } => e,
                    other => MigrateError::transfer(&job.table, other.to_string()),
                })
            }
        }
    }

    async fn copy(&self, job: &TransferJob) -> Result<TransferStats> {
        let timeout = self.config.timeout;
        let secs = timeout.as_secs();
        let mut stats = TransferStats::default();

        let mut rx = self.source.read_table(ReadOptions {
            table: job.table.clone(),
            columns: job.select_columns.clone(),
            batch_size: self.config.batch_size.max(1),
        });

        loop {
            let read_start = Instant::now();
            let next = tokio::time::timeout(timeout, rx.recv())
                .await
                .map_err(|_| MigrateError::timeout(format!("fetch from {}", job.table), secs))?;
            stats.read_time += read_start.elapsed();

            let batch = match next {
                None => break,
                Some(batch) => batch?,
            };
            if batch.is_empty() {
                break;
            }

            let write_start = Instant::now();
            let expected = batch.len() as u64;
            let written = tokio::time::timeout(
                timeout,
                self.target
                    .write_batch(&job.table, &job.insert_columns, job.ident_style, batch),
            )
            .await
            .map_err(|_| MigrateError::timeout(format!("insert into {}", job.table), secs))??;
            if written != expected {
                return Err(MigrateError::transfer(
                    &job.table,
                    format!("target accepted {} of {} rows", written, expected),
                ));
            }

            if self.config.commit_every_batch {
                self.commit(&job.table).await?;
            }
            stats.write_time += write_start.elapsed();
            stats.rows += written;
            stats.batches += 1;
            debug!("{}: batch {} ({} rows total)", job.table, stats.batches, stats.rows);
        }

        if !self.config.commit_every_batch {
            let commit_start = Instant::now();
            self.commit(&job.table).await?;
            stats.write_time += commit_start.elapsed();
        }

        Ok(stats)
    }

    async fn commit(&self, table: &str) -> Result<()> {
        tokio::time::timeout(self.config.timeout, self.target.commit())
            .await
            .map_err(|_| {
                MigrateError::timeout(format!("commit on {}", table), self.config.timeout.as_secs())
            })?
    }
}
