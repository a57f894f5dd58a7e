//! Core abstractions shared by the migration engine and its backends.
//!
//! - [`schema`]: object kinds, column descriptors and table definitions
//! - [`identifier`]: identifier normalization and quoting
//! - [`dialect`]: statement text that differs per target dialect
//! - [`value`]: row batches
//! - [`traits`]: source/target catalogs, error classifiers, type mappers
//!
//! Backends under `drivers/` implement the traits; the orchestrator and the
//! tests only see trait objects.

pub mod dialect;
pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use dialect::Dialect;
pub use identifier::IdentStyle;
pub use schema::{ColumnDescriptor, ConstraintClass, ObjectKind, SchemaObject, TableDefinition};
pub use traits::{
    ConnectionFactory, ErrorClassifier, ReadOptions, SourceCatalog, TargetCatalog, TypeMapper,
    TypeMapping,
};
pub use value::{Batch, Row};
