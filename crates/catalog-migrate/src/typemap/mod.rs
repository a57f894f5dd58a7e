//! Column type mapping.
//!
//! [`oracle_to_snowflake`] is the cross-dialect mapping used for generated
//! Snowflake tables. [`OracleIdentityMapper`] re-emits Oracle types unchanged
//! for Oracle targets.

use crate::core::schema::ColumnDescriptor;
use crate::core::traits::{TypeMapper, TypeMapping};

/// Base type name: upper-cased, without a parenthesised length or precision.
fn base_type(source_type: &str) -> String {
    let upper = source_type.trim().to_ascii_uppercase();
    match upper.find('(') {
        Some(open) => {
            let close = upper[open..].find(')').map(|i| open + i + 1);
            let rest = close.map(|c| upper[c..].trim()).unwrap_or("");
            let head = upper[..open].trim();
            if rest.is_empty() {
                head.to_string()
            } else {
                format!("{} {}", head, rest)
            }
        }
        None => upper,
    }
}

/// Map an Oracle column type to Snowflake. Never fails; unknown types become `VARCHAR`.
pub fn oracle_to_snowflake(
    source_type: &str,
    length: Option<u32>,
    precision: Option<u32>,
    scale: Option<i32>,
) -> String {
    map_oracle_to_snowflake(source_type, length, precision, scale).target_type
}

fn map_oracle_to_snowflake(
    source_type: &str,
    length: Option<u32>,
    precision: Option<u32>,
    scale: Option<i32>,
) -> TypeMapping {
    let base = base_type(source_type);
    match base.as_str() {
        // Character
        "VARCHAR2" | "NVARCHAR2" | "VARCHAR" | "CHAR" | "NCHAR" => match length {
            Some(len) if len > 0 => TypeMapping::lossless(format!("VARCHAR({})", len)),
            _ => TypeMapping::lossless("VARCHAR"),
        },

        // Exact numeric
        "NUMBER" | "DECIMAL" | "NUMERIC" => match precision {
            Some(p) => TypeMapping::lossless(format!("NUMBER({},{})", p, scale.unwrap_or(0))),
            None => TypeMapping::lossless("NUMBER"),
        },

        // Floating point
        "FLOAT" | "BINARY_FLOAT" | "BINARY_DOUBLE" => TypeMapping::lossless("FLOAT"),

        // Oracle DATE carries a time of day
        "DATE" => TypeMapping::lossless("TIMESTAMP_NTZ"),

        t if t.starts_with("TIMESTAMP") => {
            if t.ends_with("WITH LOCAL TIME ZONE") {
                TypeMapping::lossless("TIMESTAMP_LTZ")
            } else if t.ends_with("WITH TIME ZONE") {
                TypeMapping::lossless("TIMESTAMP_TZ")
            } else {
                TypeMapping::lossless("TIMESTAMP_NTZ")
            }
        }

        // Large objects
        "CLOB" | "NCLOB" | "LONG" => TypeMapping::lossless("VARCHAR"),
        "BLOB" | "RAW" | "LONG RAW" => TypeMapping::lossless("BINARY"),

        // Semi-structured
        "JSON" => TypeMapping::lossless("VARIANT"),
        "XMLTYPE" | "SYS.XMLTYPE" | "SYS.ANYDATA" | "ANYDATA" => TypeMapping::lossy(
            "VARIANT",
            format!("{} stored as VARIANT text", base),
        ),

        // Default fallback
        other => TypeMapping::lossy(
            "VARCHAR",
            format!("no Snowflake mapping for {}, using VARCHAR", other),
        ),
    }
}

/// Oracle to Snowflake column type mapper.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleToSnowflakeMapper;

impl TypeMapper for OracleToSnowflakeMapper {
    fn name(&self) -> &str {
        "oracle->snowflake"
    }

    fn map_column(&self, column: &ColumnDescriptor) -> TypeMapping {
        map_oracle_to_snowflake(
            &column.source_type,
            column.length,
            column.precision,
            column.scale,
        )
    }
}

/// Same-dialect mapper: re-emits the Oracle type with its length or precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleIdentityMapper;

impl TypeMapper for OracleIdentityMapper {
    fn name(&self) -> &str {
        "oracle->oracle"
    }

    fn map_column(&self, column: &ColumnDescriptor) -> TypeMapping {
        let source = column.source_type.trim().to_ascii_uppercase();
        // Types that already carry their modifiers, e.g. TIMESTAMP(6).
        if source.contains('(') {
            return TypeMapping::lossless(source);
        }
        let mapped = match source.as_str() {
            "VARCHAR2" | "VARCHAR" | "CHAR" => {
                let default = if source == "CHAR" { 1 } else { 4000 };
                let len = column.length.filter(|l| *l > 0).unwrap_or(default);
                // Byte semantics is the database default; character length must be explicit.
                if column.char_semantics {
                    format!("{}({} CHAR)", source, len)
                } else {
                    format!("{}({})", source, len)
                }
            }
            // National character types always count characters.
            "NVARCHAR2" => format!("NVARCHAR2({})", column.length.filter(|l| *l > 0).unwrap_or(4000)),
            "NCHAR" => format!("NCHAR({})", column.length.filter(|l| *l > 0).unwrap_or(1)),
            "RAW" => format!("RAW({})", column.length.filter(|l| *l > 0).unwrap_or(2000)),
            "NUMBER" => match (column.precision, column.scale) {
                (Some(p), Some(s)) => format!("NUMBER({},{})", p, s),
                (Some(p), None) => format!("NUMBER({})", p),
                (None, Some(0)) => "NUMBER(*,0)".to_string(),
                _ => "NUMBER".to_string(),
            },
            "FLOAT" => match column.precision {
                Some(p) => format!("FLOAT({})", p),
                None => "FLOAT".to_string(),
            },
            _ => source,
        };
        TypeMapping::lossless(mapped)
    }
}
