//! Core traits for catalog-to-catalog migration.
//!
//! - [`SourceCatalog`]: enumerates objects, fetches definitions and streams rows
//! - [`TargetCatalog`]: executes statements and bulk inserts rows
//! - [`ErrorClassifier`]: maps backend error codes to [`FailureKind`]
//! - [`ConnectionFactory`]: opens connections for the orchestrator and its workers
//! - [`TypeMapper`]: maps source column descriptors to target types

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{BackendError, FailureKind, Result};

use super::dialect::Dialect;
use super::identifier::IdentStyle;
use super::schema::{ColumnDescriptor, ConstraintClass, ObjectKind, SchemaObject, TableDefinition};
use super::value::Batch;

/// Options for reading rows from a table.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Table name as listed by the catalog.
    pub table: String,
    /// Columns to read, in insert order.
    pub columns: Vec<String>,
    /// Maximum rows per batch.
    pub batch_size: usize,
}

/// Read schema objects and data from a source catalog.
///
/// Every `list_*` method returns names in ascending order so repeated runs
/// visit objects in the same sequence.
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Schema being read.
    fn schema(&self) -> &str;

    /// Dialect of the definitions this catalog returns.
    fn dialect(&self) -> Dialect;

    async fn list_tables(&self) -> Result<Vec<String>>;

    async fn list_sequences(&self) -> Result<Vec<String>>;

    async fn list_views(&self) -> Result<Vec<String>>;

    /// Procedures, functions, packages, package bodies, triggers, types and
    /// type bodies, ordered by kind then name.
    async fn list_code_objects(&self) -> Result<Vec<SchemaObject>>;

    /// Columns of a table ordered by ordinal position.
    async fn columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    /// User-named constraints of one class on a table.
    async fn constraint_names(&self, table: &str, class: ConstraintClass) -> Result<Vec<String>>;

    /// Indexes on a table, excluding LOB indexes.
    async fn index_names(&self, table: &str) -> Result<Vec<String>>;

    /// Definition text for one object.
    ///
    /// Fails with [`MigrateError::ObjectNotFound`](crate::error::MigrateError::ObjectNotFound)
    /// when the object no longer exists.
    async fn definition(&self, object: &SchemaObject) -> Result<String>;

    /// Start streaming rows from a table.
    ///
    /// The receiver yields batches of at most `batch_size` rows until the table
    /// is exhausted; the channel closes after the last batch. An error ends the
    /// stream.
    fn read_table(&self, opts: ReadOptions) -> mpsc::Receiver<Result<Batch>>;

    /// Exact row count of a table.
    async fn row_count(&self, table: &str) -> Result<u64>;

    /// Round-trip check used by health checks.
    async fn ping(&self) -> Result<()>;

    /// Column descriptors packaged for DDL generation.
    async fn table_definition(&self, table: &str) -> Result<TableDefinition> {
        Ok(TableDefinition {
            table: table.to_string(),
            columns: self.columns(table).await?,
        })
    }

    /// Objects of one kind, as a uniform list.
    ///
    /// Tables, sequences and views come from their listing; code objects are
    /// filtered from [`list_code_objects`](Self::list_code_objects). Indexes and
    /// constraints are table-scoped and listed per table instead.
    async fn list(&self, kind: ObjectKind) -> Result<Vec<SchemaObject>> {
        let names = match kind {
            ObjectKind::Table => self.list_tables().await?,
            ObjectKind::Sequence => self.list_sequences().await?,
            ObjectKind::View => self.list_views().await?,
            ObjectKind::Index | ObjectKind::Constraint => Vec::new(),
            code => {
                return Ok(self
                    .list_code_objects()
                    .await?
                    .into_iter()
                    .filter(|o| o.kind == code)
                    .collect())
            }
        };
        Ok(names
            .into_iter()
            .map(|name| SchemaObject::new(kind, name))
            .collect())
    }

    /// Release the connection.
    async fn close(&self);
}

/// Apply statements and write rows to a target catalog.
///
/// Autocommit is off: every change is made durable by [`commit`](Self::commit)
/// or discarded by [`rollback`](Self::rollback).
#[async_trait]
pub trait TargetCatalog: Send + Sync {
    /// Schema written to.
    fn schema(&self) -> &str;

    fn dialect(&self) -> Dialect;

    /// Execute one statement. Rejections surface as `MigrateError::Backend`.
    async fn execute(&self, sql: &str) -> Result<()>;

    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;

    /// Positional bulk insert of one batch. Values are bound as parameters;
    /// `style` spells the table and column names. Returns rows written.
    /// Does not commit.
    async fn write_batch(
        &self,
        table: &str,
        columns: &[String],
        style: IdentStyle,
        batch: Batch,
    ) -> Result<u64>;

    /// Exact row count of a target table.
    async fn row_count(&self, table: &str, style: IdentStyle) -> Result<u64>;

    /// Round-trip check used by health checks.
    async fn ping(&self) -> Result<()>;

    /// Drop statement for an object, if the dialect can drop it directly.
    fn drop_statement(&self, kind: ObjectKind, name: &str, style: IdentStyle) -> Option<String> {
        self.dialect().drop_statement(kind, name, style)
    }

    /// Release the connection.
    async fn close(&self);
}

/// Classify backend errors into object-scoped failure kinds.
pub trait ErrorClassifier: Send + Sync {
    /// Backend this classifier understands.
    fn name(&self) -> &str;

    fn classify(&self, error: &BackendError) -> FailureKind;
}

/// Opens connections. The orchestrator owns one source/target pair; each
/// parallel load worker opens its own.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect_source(&self) -> Result<Arc<dyn SourceCatalog>>;

    async fn connect_target(&self) -> Result<Arc<dyn TargetCatalog>>;

    /// Error classifier for the target backend.
    fn classifier(&self) -> Arc<dyn ErrorClassifier>;
}

/// Result of mapping a column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    /// Target type, e.g. `NUMBER(10,2)`.
    pub target_type: String,
    /// True when values may lose fidelity.
    pub is_lossy: bool,
    /// Explanation for lossy mappings.
    pub warning: Option<String>,
}

impl TypeMapping {
    pub fn lossless(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: false,
            warning: None,
        }
    }

    pub fn lossy(target_type: impl Into<String>, warning: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: true,
            warning: Some(warning.into()),
        }
    }
}

/// Map source column descriptors to target column types. Never fails.
pub trait TypeMapper: Send + Sync {
    fn name(&self) -> &str;

    fn map_column(&self, column: &ColumnDescriptor) -> TypeMapping;
}
