//! # catalog-migrate
//!
//! Schema and data migration from an Oracle source catalog to an Oracle or
//! Snowflake target.
//!
//! This library provides:
//!
//! - **Catalog discovery** of tables, sequences, views, indexes, constraints
//!   and code objects
//! - **Dependency-ordered apply** through a fixed phase sequence
//! - **Idempotent re-runs**: existing target objects are skipped, not failed
//! - **Bounded-memory data transfer** with optional parallel workers
//! - **Type mapping** for cross-dialect table definitions, with an optional
//!   assisted generator that falls back to the deterministic one
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use catalog_migrate::{drivers, Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> catalog_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let factory = drivers::connection_factory(&config)?;
//!     let report = Orchestrator::new(config, factory).run().await?;
//!     println!("Loaded {} rows", report.rows_loaded);
//!     Ok(())
//! }
//! ```

pub mod apply;
pub mod config;
pub mod core;
pub mod ddl;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod report;
pub mod transfer;
pub mod typemap;

// Re-exports for convenient access
pub use apply::{Applier, ApplyResult};
pub use config::{AssistConfig, Config, ConfigOverrides, MigrationConfig, SourceConfig, TargetConfig};
pub use core::{
    Batch, ColumnDescriptor, ConnectionFactory, ConstraintClass, Dialect, ErrorClassifier,
    IdentStyle, ObjectKind, ReadOptions, Row, SchemaObject, SourceCatalog, TableDefinition, TargetCatalog,
    TypeMapper,
};
pub use ddl::{DdlGenerator, DeterministicGenerator, GeneratedDdl, TableDdlGenerator};
pub use error::{BackendError, FailureKind, MigrateError, Result};
pub use orchestrator::{Orchestrator, Phase};
pub use report::{
    HealthCheckResult, MigrationOutcome, MigrationPlan, MigrationReport, OutcomeStatus,
    RowCountCheck, RunStatus, RunWarning, WarningKind,
};
pub use transfer::{TransferConfig, TransferEngine, TransferJob, TransferStats};
