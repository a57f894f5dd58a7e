//! Identifier normalization and quoting.
//!
//! SQL identifiers cannot be bound as parameters, so every identifier that
//! reaches generated SQL goes through this module. Two forms exist:
//!
//! - [`normalize_ident`] folds simple names to upper case and leaves them
//!   unquoted, quoting only names that would not survive case folding. This is
//!   the form used for generated DDL and generated INSERT statements.
//! - [`quote_exact`] always quotes and preserves case. It addresses source
//!   objects exactly as the catalog reports them, and target objects created
//!   from catalog DDL, which keeps source case.
//!
//! [`IdentStyle`] picks between the two for statements against target tables.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{MigrateError, Result};

/// Oracle and Snowflake both cap identifiers at 128 bytes.
const MAX_IDENTIFIER_LENGTH: usize = 128;

fn simple_ident() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z_][A-Z0-9_]*$").expect("valid identifier pattern"))
}

/// Check a configured schema or table name before it reaches any statement.
///
/// Rejects empty names, names containing null bytes and names over the
/// 128-byte limit.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MigrateError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "Identifier contains a null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Normalize an identifier for the target dialect.
///
/// The upper-cased name is emitted bare when it matches
/// `^[A-Z_][A-Z0-9_]*$`. Otherwise the original name is double-quoted with
/// inner quotes doubled.
///
/// ```
/// use catalog_migrate::core::identifier::normalize_ident;
///
/// assert_eq!(normalize_ident("emp"), "EMP");
/// assert_eq!(normalize_ident("my table"), "\"my table\"");
/// ```
pub fn normalize_ident(name: &str) -> String {
    let upper = name.to_ascii_uppercase();
    if simple_ident().is_match(&upper) {
        upper
    } else {
        quote_exact(name)
    }
}

/// Normalize `schema.name`. An empty schema yields the bare name.
pub fn qualify_normalized(schema: &str, name: &str) -> String {
    if schema.is_empty() {
        normalize_ident(name)
    } else {
        format!("{}.{}", normalize_ident(schema), normalize_ident(name))
    }
}

/// Quote an identifier preserving its exact case.
pub fn quote_exact(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Exact-case `"schema"."name"`.
pub fn qualify_exact(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_exact(schema), quote_exact(name))
}

/// How statements against a target table spell its name and columns.
///
/// The form must match the DDL that created the table: generated DDL uses
/// normalized names, catalog DDL uses the exact source names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentStyle {
    #[default]
    Normalized,
    Exact,
}

impl IdentStyle {
    pub fn quote(self, name: &str) -> String {
        match self {
            IdentStyle::Normalized => normalize_ident(name),
            IdentStyle::Exact => quote_exact(name),
        }
    }

    pub fn qualify(self, schema: &str, name: &str) -> String {
        match self {
            IdentStyle::Normalized => qualify_normalized(schema, name),
            IdentStyle::Exact if schema.is_empty() => quote_exact(name),
            IdentStyle::Exact => qualify_exact(schema, name),
        }
    }
}

/// Escape a value for use inside a single-quoted SQL literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}
