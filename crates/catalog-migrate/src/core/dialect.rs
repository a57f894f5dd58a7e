//! Target SQL dialect: statement text that differs between backends.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::identifier::{normalize_ident, IdentStyle};
use super::schema::ObjectKind;

/// Supported catalog dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Oracle,
    Snowflake,
}

impl Dialect {
    /// Parse a config `type` value.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "oracle" => Some(Dialect::Oracle),
            "snowflake" => Some(Dialect::Snowflake),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Oracle => "oracle",
            Dialect::Snowflake => "snowflake",
        }
    }

    /// Statement that removes an existing object before it is recreated.
    ///
    /// Package bodies go with their package spec and constraints with their
    /// table, so neither is dropped directly.
    pub fn drop_statement(&self, kind: ObjectKind, name: &str, style: IdentStyle) -> Option<String> {
        let ident = style.quote(name);
        match (self, kind) {
            (_, ObjectKind::PackageBody | ObjectKind::Constraint) => None,
            (Dialect::Oracle, ObjectKind::Table) => {
                Some(format!("DROP TABLE {} CASCADE CONSTRAINTS PURGE", ident))
            }
            (Dialect::Oracle, ObjectKind::TypeBody) => Some(format!("DROP TYPE BODY {}", ident)),
            (Dialect::Oracle, ObjectKind::Type) => Some(format!("DROP TYPE {} FORCE", ident)),
            (Dialect::Oracle, kind) => Some(format!("DROP {} {}", kind.catalog_name(), ident)),
            (Dialect::Snowflake, ObjectKind::Table) => {
                Some(format!("DROP TABLE IF EXISTS {} CASCADE", ident))
            }
            (Dialect::Snowflake, ObjectKind::Sequence | ObjectKind::View) => Some(format!(
                "DROP {} IF EXISTS {}",
                kind.catalog_name(),
                ident
            )),
            // Procedures and functions need a signature; the rest do not exist.
            (Dialect::Snowflake, _) => None,
        }
    }

    /// Positional INSERT with one `?` marker per column.
    pub fn insert_statement(
        &self,
        schema: &str,
        table: &str,
        columns: &[String],
        style: IdentStyle,
    ) -> String {
        let cols: Vec<String> = columns.iter().map(|c| style.quote(c)).collect();
        let markers = vec!["?"; columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            style.qualify(schema, table),
            cols.join(", "),
            markers
        )
    }

    /// Row count query for a target table.
    pub fn count_statement(&self, schema: &str, table: &str, style: IdentStyle) -> String {
        format!("SELECT COUNT(*) FROM {}", style.qualify(schema, table))
    }

    /// Cheap round-trip used by health checks.
    pub fn ping_statement(&self) -> &'static str {
        match self {
            Dialect::Oracle => "SELECT 1 FROM DUAL",
            Dialect::Snowflake => "SELECT 1",
        }
    }

    /// Session statements run right after connecting to a target.
    pub fn session_setup(
        &self,
        schema: &str,
        warehouse: Option<&str>,
        database: Option<&str>,
    ) -> Vec<String> {
        match self {
            Dialect::Oracle => vec![
                "ALTER SESSION SET NLS_DATE_FORMAT = 'YYYY-MM-DD HH24:MI:SS'".to_string(),
                "ALTER SESSION SET NLS_TIMESTAMP_FORMAT = 'YYYY-MM-DD HH24:MI:SS.FF9'"
                    .to_string(),
                "ALTER SESSION SET NLS_TIMESTAMP_TZ_FORMAT = 'YYYY-MM-DD HH24:MI:SS.FF9 TZH:TZM'"
                    .to_string(),
                "ALTER SESSION SET NLS_NUMERIC_CHARACTERS = '.,'".to_string(),
                format!(
                    "ALTER SESSION SET CURRENT_SCHEMA = {}",
                    normalize_ident(schema)
                ),
            ],
            Dialect::Snowflake => {
                let mut stmts = Vec::new();
                if let Some(wh) = warehouse {
                    stmts.push(format!("USE WAREHOUSE {}", normalize_ident(wh)));
                }
                if let Some(db) = database {
                    stmts.push(format!("USE DATABASE {}", normalize_ident(db)));
                }
                stmts.push(format!(
                    "CREATE SCHEMA IF NOT EXISTS {}",
                    normalize_ident(schema)
                ));
                stmts.push(format!("USE SCHEMA {}", normalize_ident(schema)));
                stmts.push(
                    "ALTER SESSION SET TIMESTAMP_INPUT_FORMAT = 'AUTO'".to_string(),
                );
                stmts
            }
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
