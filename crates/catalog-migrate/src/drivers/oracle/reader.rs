//! Oracle source catalog.
//!
//! Objects are enumerated from the `ALL_*` dictionary views filtered by
//! owner, so the login user may differ from the migrated schema. Definitions
//! come from `DBMS_METADATA.GET_DDL` with session transforms that strip
//! storage clauses and terminators. Table DDL keeps its inline constraints,
//! so system-named ones travel with the table; referential constraints are
//! left out and applied in their own phase.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::core::dialect::Dialect;
use crate::core::identifier::{escape_literal, qualify_exact, quote_exact};
use crate::core::schema::{ColumnDescriptor, ConstraintClass, ObjectKind, SchemaObject};
use crate::core::traits::{ReadOptions, SourceCatalog};
use crate::core::value::Batch;
use crate::drivers::common::odbc::{parse_count, OdbcSession};
use crate::error::{MigrateError, Result};

use super::errors::{ora_number, METADATA_NOT_FOUND};

/// Session transforms applied before any `GET_DDL` call.
pub const METADATA_TRANSFORMS: &str = "BEGIN
  DBMS_METADATA.SET_TRANSFORM_PARAM(DBMS_METADATA.SESSION_TRANSFORM, 'PRETTY', TRUE);
  DBMS_METADATA.SET_TRANSFORM_PARAM(DBMS_METADATA.SESSION_TRANSFORM, 'SQLTERMINATOR', FALSE);
  DBMS_METADATA.SET_TRANSFORM_PARAM(DBMS_METADATA.SESSION_TRANSFORM, 'SEGMENT_ATTRIBUTES', FALSE);
  DBMS_METADATA.SET_TRANSFORM_PARAM(DBMS_METADATA.SESSION_TRANSFORM, 'STORAGE', FALSE);
  DBMS_METADATA.SET_TRANSFORM_PARAM(DBMS_METADATA.SESSION_TRANSFORM, 'TABLESPACE', FALSE);
  DBMS_METADATA.SET_TRANSFORM_PARAM(DBMS_METADATA.SESSION_TRANSFORM, 'CONSTRAINTS', TRUE);
  DBMS_METADATA.SET_TRANSFORM_PARAM(DBMS_METADATA.SESSION_TRANSFORM, 'REF_CONSTRAINTS', FALSE);
END;";

/// `DBMS_METADATA` object type for a kind. Constraints depend on their class.
pub fn metadata_type(kind: ObjectKind, class: Option<ConstraintClass>) -> &'static str {
    match kind {
        ObjectKind::Table => "TABLE",
        ObjectKind::Sequence => "SEQUENCE",
        ObjectKind::View => "VIEW",
        ObjectKind::Index => "INDEX",
        ObjectKind::Constraint => match class {
            Some(ConstraintClass::Referential) => "REF_CONSTRAINT",
            _ => "CONSTRAINT",
        },
        ObjectKind::Procedure => "PROCEDURE",
        ObjectKind::Function => "FUNCTION",
        ObjectKind::Package => "PACKAGE_SPEC",
        ObjectKind::PackageBody => "PACKAGE_BODY",
        ObjectKind::Trigger => "TRIGGER",
        ObjectKind::Type => "TYPE_SPEC",
        ObjectKind::TypeBody => "TYPE_BODY",
    }
}

fn in_list(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("'{}'", escape_literal(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Oracle schema read through one ODBC session.
pub struct OracleSource {
    session: OdbcSession,
    schema: String,
    max_lob_bytes: usize,
}

impl OracleSource {
    pub fn new(session: OdbcSession, schema: String, max_lob_bytes: usize) -> Self {
        Self {
            session,
            schema,
            max_lob_bytes,
        }
    }

    fn owner(&self) -> String {
        escape_literal(&self.schema)
    }

    async fn constraint_class(&self, name: &str) -> Result<Option<ConstraintClass>> {
        let sql = format!(
            "SELECT constraint_type FROM all_constraints WHERE owner = '{}' AND constraint_name = '{}'",
            self.owner(),
            escape_literal(name)
        );
        Ok(self.session.query_scalar(&sql).await?.map(|t| {
            if t == "R" {
                ConstraintClass::Referential
            } else {
                ConstraintClass::NonReferential
            }
        }))
    }
}

#[async_trait]
impl SourceCatalog for OracleSource {
    fn schema(&self) -> &str {
        &self.schema
    }

    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT table_name FROM all_tables \
             WHERE owner = '{}' AND nested = 'NO' AND secondary = 'N' AND dropped = 'NO' \
             ORDER BY table_name",
            self.owner()
        );
        self.session.query_names(&sql).await
    }

    async fn list_sequences(&self) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT sequence_name FROM all_sequences WHERE sequence_owner = '{}' ORDER BY sequence_name",
            self.owner()
        );
        self.session.query_names(&sql).await
    }

    async fn list_views(&self) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT view_name FROM all_views WHERE owner = '{}' ORDER BY view_name",
            self.owner()
        );
        self.session.query_names(&sql).await
    }

    async fn list_code_objects(&self) -> Result<Vec<SchemaObject>> {
        let types: Vec<&str> = ObjectKind::CODE_OBJECTS
            .iter()
            .map(|k| k.catalog_name())
            .collect();
        let sql = format!(
            "SELECT object_type, object_name FROM all_objects \
             WHERE owner = '{}' AND object_type IN ({}) \
             ORDER BY object_type, object_name",
            self.owner(),
            in_list(&types)
        );
        let rows = self.session.query(&sql).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let mut it = row.into_iter();
                let kind = it.next().flatten().and_then(|t| ObjectKind::from_catalog_name(&t))?;
                let name = it.next().flatten()?;
                Some(SchemaObject::new(kind, name))
            })
            .collect())
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let sql = format!(
            "SELECT column_name, data_type, \
                    CASE WHEN char_length > 0 THEN char_length ELSE data_length END, \
                    data_precision, data_scale, nullable, char_used \
             FROM all_tab_columns WHERE owner = '{}' AND table_name = '{}' \
             ORDER BY column_id",
            self.owner(),
            escape_literal(table)
        );
        let rows = self.session.query(&sql).await?;
        Ok(rows.into_iter().filter_map(column_from_row).collect())
    }

    async fn constraint_names(&self, table: &str, class: ConstraintClass) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT constraint_name FROM all_constraints \
             WHERE owner = '{}' AND table_name = '{}' \
               AND generated = 'USER NAME' AND constraint_type IN ({}) \
             ORDER BY constraint_name",
            self.owner(),
            escape_literal(table),
            in_list(class.type_codes())
        );
        self.session.query_names(&sql).await
    }

    async fn index_names(&self, table: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT index_name FROM all_indexes \
             WHERE owner = '{}' AND table_name = '{}' AND index_type NOT LIKE 'LOB%' \
             ORDER BY index_name",
            self.owner(),
            escape_literal(table)
        );
        self.session.query_names(&sql).await
    }

    async fn definition(&self, object: &SchemaObject) -> Result<String> {
        let not_found = || MigrateError::ObjectNotFound {
            kind: object.kind,
            name: object.name.clone(),
        };

        let class = if object.kind == ObjectKind::Constraint {
            match self.constraint_class(&object.name).await? {
                Some(class) => Some(class),
                None => return Err(not_found()),
            }
        } else {
            None
        };

        let sql = format!(
            "SELECT DBMS_METADATA.GET_DDL('{}', '{}', '{}') FROM DUAL",
            metadata_type(object.kind, class),
            escape_literal(&object.name),
            self.owner()
        );
        debug!("Fetching definition of {}", object);
        match self.session.query_scalar(&sql).await {
            Ok(Some(ddl)) => Ok(ddl),
            Ok(None) => Err(not_found()),
            Err(MigrateError::Backend(e)) if ora_number(&e) == Some(METADATA_NOT_FOUND) => {
                Err(not_found())
            }
            Err(e) => Err(e),
        }
    }

    fn read_table(&self, opts: ReadOptions) -> mpsc::Receiver<Result<Batch>> {
        let cols = opts
            .columns
            .iter()
            .map(|c| quote_exact(c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM {}",
            cols,
            qualify_exact(&self.schema, &opts.table)
        );
        debug!("{}: {}", opts.table, sql);
        self.session
            .stream(sql, opts.batch_size.max(1), self.max_lob_bytes)
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", qualify_exact(&self.schema, table));
        parse_count(self.session.query_scalar(&sql).await?, table)
    }

    async fn ping(&self) -> Result<()> {
        self.session.execute(Dialect::Oracle.ping_statement()).await
    }

    async fn close(&self) {
        if let Err(e) = self.session.rollback().await {
            debug!("Oracle source rollback on close failed: {}", e);
        }
    }
}

/// Build a descriptor from an `ALL_TAB_COLUMNS` row.
fn column_from_row(row: Vec<Option<String>>) -> Option<ColumnDescriptor> {
    let mut it = row.into_iter();
    let name = it.next().flatten()?;
    let source_type = it.next().flatten()?;
    let number = |v: Option<Option<String>>| v.flatten().and_then(|s| s.trim().parse::<i64>().ok());
    let length = number(it.next()).filter(|l| *l > 0).map(|l| l as u32);
    let precision = number(it.next()).map(|p| p as u32);
    let scale = number(it.next()).map(|s| s as i32);
    let nullable = it.next().flatten().map_or(true, |n| n != "N");
    let char_semantics = it.next().flatten().is_some_and(|u| u == "C");

    Some(ColumnDescriptor {
        name,
        source_type,
        length,
        precision,
        scale,
        nullable,
        char_semantics,
    })
}
