//! Table definition generators.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::identifier::normalize_ident;
use crate::core::schema::TableDefinition;
use crate::core::traits::TypeMapper;
use crate::error::Result;

/// A generated `CREATE TABLE` and the target column names in insert order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDdl {
    pub sql: String,
    pub columns: Vec<String>,
}

/// Produces a target table definition from column descriptors.
#[async_trait]
pub trait DdlGenerator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn generate(&self, table: &TableDefinition) -> Result<GeneratedDdl>;
}

/// Builds the definition from the type mapper and identifier normalizer.
pub struct DeterministicGenerator {
    mapper: Arc<dyn TypeMapper>,
    create_or_replace: bool,
}

impl DeterministicGenerator {
    pub fn new(mapper: Arc<dyn TypeMapper>, create_or_replace: bool) -> Self {
        Self {
            mapper,
            create_or_replace,
        }
    }

    /// Infallible form of [`DdlGenerator::generate`].
    pub fn build(&self, table: &TableDefinition) -> GeneratedDdl {
        let mut lines = Vec::with_capacity(table.columns.len());
        let mut columns = Vec::with_capacity(table.columns.len());
        for col in &table.columns {
            let mapping = self.mapper.map_column(col);
            if let Some(warning) = &mapping.warning {
                debug!("{}.{}: {}", table.table, col.name, warning);
            }
            let name = normalize_ident(&col.name);
            let null = if col.nullable { "" } else { " NOT NULL" };
            lines.push(format!("  {} {}{}", name, mapping.target_type, null));
            columns.push(col.name.clone());
        }

        let create = if self.create_or_replace {
            "CREATE OR REPLACE TABLE"
        } else {
            "CREATE TABLE"
        };
        GeneratedDdl {
            sql: format!(
                "{} {} (\n{}\n)",
                create,
                normalize_ident(&table.table),
                lines.join(",\n")
            ),
            columns,
        }
    }
}

#[async_trait]
impl DdlGenerator for DeterministicGenerator {
    fn name(&self) -> &str {
        "deterministic"
    }

    async fn generate(&self, table: &TableDefinition) -> Result<GeneratedDdl> {
        Ok(self.build(table))
    }
}

/// Tries an optional assisted generator and falls back to the deterministic one.
pub struct TableDdlGenerator {
    assisted: Option<Arc<dyn DdlGenerator>>,
    deterministic: DeterministicGenerator,
}

impl TableDdlGenerator {
    pub fn new(deterministic: DeterministicGenerator) -> Self {
        Self {
            assisted: None,
            deterministic,
        }
    }

    pub fn with_assisted(mut self, assisted: Arc<dyn DdlGenerator>) -> Self {
        self.assisted = Some(assisted);
        self
    }

    /// Generate a definition. Always succeeds.
    pub async fn generate(&self, table: &TableDefinition) -> GeneratedDdl {
        if let Some(assisted) = &self.assisted {
            match assisted.generate(table).await {
                Ok(ddl) => {
                    debug!("{}: {} definition accepted", table.table, assisted.name());
                    return ddl;
                }
                Err(e) => {
                    warn!(
                        "{}: {} generator failed, using deterministic definition: {}",
                        table.table,
                        assisted.name(),
                        e
                    );
                }
            }
        }
        self.deterministic.build(table)
    }
}
