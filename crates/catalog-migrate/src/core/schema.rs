//! Schema object metadata.
//!
//! Objects are discovered per run and never persisted. A [`SchemaObject`] is
//! identified by its kind and name; columns keep source ordinal order, which
//! is also the positional order used for inserts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of catalog object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectKind {
    Table,
    Sequence,
    View,
    Index,
    Constraint,
    Procedure,
    Function,
    Package,
    PackageBody,
    Trigger,
    Type,
    TypeBody,
}

impl ObjectKind {
    /// Code object kinds in the order they are created.
    pub const CODE_OBJECTS: [ObjectKind; 7] = [
        ObjectKind::Function,
        ObjectKind::Package,
        ObjectKind::PackageBody,
        ObjectKind::Procedure,
        ObjectKind::Trigger,
        ObjectKind::Type,
        ObjectKind::TypeBody,
    ];

    /// Name as it appears in catalog views (`OBJECT_TYPE`).
    pub fn catalog_name(&self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::Sequence => "SEQUENCE",
            ObjectKind::View => "VIEW",
            ObjectKind::Index => "INDEX",
            ObjectKind::Constraint => "CONSTRAINT",
            ObjectKind::Procedure => "PROCEDURE",
            ObjectKind::Function => "FUNCTION",
            ObjectKind::Package => "PACKAGE",
            ObjectKind::PackageBody => "PACKAGE BODY",
            ObjectKind::Trigger => "TRIGGER",
            ObjectKind::Type => "TYPE",
            ObjectKind::TypeBody => "TYPE BODY",
        }
    }

    /// Parse a catalog `OBJECT_TYPE` value.
    pub fn from_catalog_name(name: &str) -> Option<Self> {
        let kind = match name.trim().to_ascii_uppercase().as_str() {
            "TABLE" => ObjectKind::Table,
            "SEQUENCE" => ObjectKind::Sequence,
            "VIEW" => ObjectKind::View,
            "INDEX" => ObjectKind::Index,
            "CONSTRAINT" => ObjectKind::Constraint,
            "PROCEDURE" => ObjectKind::Procedure,
            "FUNCTION" => ObjectKind::Function,
            "PACKAGE" => ObjectKind::Package,
            "PACKAGE BODY" => ObjectKind::PackageBody,
            "TRIGGER" => ObjectKind::Trigger,
            "TYPE" => ObjectKind::Type,
            "TYPE BODY" => ObjectKind::TypeBody,
            _ => return None,
        };
        Some(kind)
    }

    /// True for procedures, functions, packages, triggers and types.
    pub fn is_code_object(&self) -> bool {
        Self::CODE_OBJECTS.contains(self)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.catalog_name())
    }
}

/// A named object in the source schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaObject {
    pub kind: ObjectKind,
    pub name: String,

    /// Table an index or constraint belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owning_table: Option<String>,
}

impl SchemaObject {
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            owning_table: None,
        }
    }

    /// An index or constraint scoped to `table`.
    pub fn on_table(kind: ObjectKind, name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            owning_table: Some(table.into()),
        }
    }
}

impl fmt::Display for SchemaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owning_table {
            Some(table) => write!(f, "{} {} ON {}", self.kind, self.name, table),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

/// Column metadata as reported by the source catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,

    /// Source data type name, e.g. `VARCHAR2` or `TIMESTAMP(6) WITH TIME ZONE`.
    pub source_type: String,

    /// Character or byte length.
    pub length: Option<u32>,

    /// Numeric precision.
    pub precision: Option<u32>,

    /// Numeric scale.
    pub scale: Option<i32>,

    /// Whether NULLs are allowed.
    pub nullable: bool,

    /// Length counts characters rather than bytes (`CHAR_USED = 'C'`).
    #[serde(default)]
    pub char_semantics: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, source_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_type: source_type.into(),
            length: None,
            precision: None,
            scale: None,
            nullable: true,
            char_semantics: false,
        }
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: i32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_char_semantics(mut self) -> Self {
        self.char_semantics = true;
        self
    }
}

/// Input to table DDL generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDefinition {
    /// Column names in ordinal order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Ordering class of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintClass {
    /// Primary key, unique and check constraints.
    NonReferential,
    /// Foreign keys.
    Referential,
}

impl ConstraintClass {
    /// Catalog `CONSTRAINT_TYPE` codes in this class.
    pub fn type_codes(&self) -> &'static [&'static str] {
        match self {
            ConstraintClass::NonReferential => &["P", "U", "C"],
            ConstraintClass::Referential => &["R"],
        }
    }
}
