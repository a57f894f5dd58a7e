//! In-memory source and target catalogs for driving the orchestrator.
//!
//! The target understands just enough DDL to enforce the rules the phase
//! order depends on: duplicate names fail with ORA-00955, a foreign key needs
//! its parent's primary key (ORA-02270), inserts need the table (ORA-00942).
//! Names resolve the way Oracle resolves them: bare names fold to upper case,
//! quoted names match exactly.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use catalog_migrate::drivers::OracleErrorClassifier;
use catalog_migrate::{
    BackendError, Batch, ColumnDescriptor, ConnectionFactory, ConstraintClass, Dialect,
    ErrorClassifier, IdentStyle, MigrateError, ObjectKind, ReadOptions, Result, Row, SchemaObject,
    SourceCatalog, TargetCatalog,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const SOURCE_SCHEMA: &str = "SRC";
pub const TARGET_SCHEMA: &str = "TGT";

// =============================================================================
// Source
// =============================================================================

#[derive(Debug, Clone)]
pub struct SourceTable {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Row>,
    pub constraints: Vec<(String, ConstraintClass, String)>,
    pub indexes: Vec<(String, String)>,
    /// Column of a system-named primary key declared inside the table DDL.
    pub inline_primary_key: Option<String>,
}

impl SourceTable {
    pub fn new(name: &str, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
            constraints: Vec::new(),
            indexes: Vec::new(),
            inline_primary_key: None,
        }
    }

    /// `n` rows whose first column counts from 1.
    pub fn with_rows(mut self, n: usize) -> Self {
        let width = self.columns.len();
        self.rows = (1..=n)
            .map(|i| {
                let mut row: Row = vec![Some(i.to_string())];
                row.extend((1..width).map(|c| Some(format!("v{}_{}", c, i))));
                row
            })
            .collect();
        self
    }

    pub fn with_primary_key(mut self, name: &str, column: &str) -> Self {
        let ddl = format!(
            "ALTER TABLE \"{}\".\"{}\" ADD CONSTRAINT \"{}\" PRIMARY KEY (\"{}\") ENABLE",
            SOURCE_SCHEMA, self.name, name, column
        );
        self.constraints
            .push((name.to_string(), ConstraintClass::NonReferential, ddl));
        self
    }

    /// Unnamed primary key: part of the table DDL, absent from constraint listings.
    pub fn with_inline_primary_key(mut self, column: &str) -> Self {
        self.inline_primary_key = Some(column.to_string());
        self
    }

    pub fn with_foreign_key(mut self, name: &str, column: &str, parent: &str) -> Self {
        let ddl = format!(
            "ALTER TABLE \"{schema}\".\"{}\" ADD CONSTRAINT \"{}\" FOREIGN KEY (\"{}\")\n  REFERENCES \"{schema}\".\"{}\" (\"ID\") ENABLE",
            self.name,
            name,
            column,
            parent,
            schema = SOURCE_SCHEMA
        );
        self.constraints
            .push((name.to_string(), ConstraintClass::Referential, ddl));
        self
    }

    pub fn with_index(mut self, name: &str, column: &str) -> Self {
        let ddl = format!(
            "CREATE INDEX \"{schema}\".\"{}\" ON \"{schema}\".\"{}\" (\"{}\")",
            name,
            self.name,
            column,
            schema = SOURCE_SCHEMA
        );
        self.indexes.push((name.to_string(), ddl));
        self
    }

    fn ddl(&self) -> String {
        let mut cols: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("\t\"{}\" {}", c.name, c.source_type))
            .collect();
        if let Some(column) = &self.inline_primary_key {
            cols.push(format!("\t PRIMARY KEY (\"{}\")\n  USING INDEX  ENABLE", column));
        }
        format!(
            "\n  CREATE TABLE \"{}\".\"{}\" \n   (\n{}\n   ) ",
            SOURCE_SCHEMA,
            self.name,
            cols.join(",\n")
        )
    }
}

#[derive(Debug, Default)]
pub struct MemorySource {
    pub tables: Vec<SourceTable>,
    pub sequences: Vec<String>,
    pub views: Vec<(String, String)>,
    pub code_objects: Vec<(SchemaObject, String)>,
    /// Listings that fail with ORA-00942.
    pub failing_listings: Vec<ObjectKind>,
    /// Objects that vanish between listing and definition fetch.
    pub vanished: Vec<String>,
}

impl MemorySource {
    pub fn with_table(mut self, table: SourceTable) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_sequence(mut self, name: &str) -> Self {
        self.sequences.push(name.to_string());
        self
    }

    pub fn with_view(mut self, name: &str, query: &str) -> Self {
        let ddl = format!(
            "CREATE OR REPLACE FORCE EDITIONABLE VIEW \"{}\".\"{}\" AS {}",
            SOURCE_SCHEMA, name, query
        );
        self.views.push((name.to_string(), ddl));
        self
    }

    pub fn with_procedure(mut self, name: &str) -> Self {
        let ddl = format!(
            "CREATE OR REPLACE EDITIONABLE PROCEDURE \"{}\".\"{}\" AS\nBEGIN\n  NULL;\nEND;\n/",
            SOURCE_SCHEMA, name
        );
        self.code_objects
            .push((SchemaObject::new(ObjectKind::Procedure, name), ddl));
        self
    }

    fn table(&self, name: &str) -> Result<&SourceTable> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| BackendError::with_code(942, "table or view does not exist").into())
    }

    fn listing<T>(&self, kind: ObjectKind, items: Vec<T>) -> Result<Vec<T>> {
        if self.failing_listings.contains(&kind) {
            return Err(BackendError::with_code(942, "table or view does not exist").into());
        }
        Ok(items)
    }
}

fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names
}

#[async_trait]
impl SourceCatalog for MemorySource {
    fn schema(&self) -> &str {
        SOURCE_SCHEMA
    }

    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let names = sorted(self.tables.iter().map(|t| t.name.clone()).collect());
        self.listing(ObjectKind::Table, names)
    }

    async fn list_sequences(&self) -> Result<Vec<String>> {
        self.listing(ObjectKind::Sequence, sorted(self.sequences.clone()))
    }

    async fn list_views(&self) -> Result<Vec<String>> {
        let names = sorted(self.views.iter().map(|(n, _)| n.clone()).collect());
        self.listing(ObjectKind::View, names)
    }

    async fn list_code_objects(&self) -> Result<Vec<SchemaObject>> {
        let mut objects: Vec<SchemaObject> =
            self.code_objects.iter().map(|(o, _)| o.clone()).collect();
        objects.sort_by(|a, b| (a.kind, &a.name).cmp(&(b.kind, &b.name)));
        self.listing(ObjectKind::Procedure, objects)
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        Ok(self.table(table)?.columns.clone())
    }

    async fn constraint_names(&self, table: &str, class: ConstraintClass) -> Result<Vec<String>> {
        let names = self
            .table(table)?
            .constraints
            .iter()
            .filter(|(_, c, _)| *c == class)
            .map(|(n, _, _)| n.clone())
            .collect();
        self.listing(ObjectKind::Constraint, sorted(names))
    }

    async fn index_names(&self, table: &str) -> Result<Vec<String>> {
        let names = self
            .table(table)?
            .indexes
            .iter()
            .map(|(n, _)| n.clone())
            .collect();
        self.listing(ObjectKind::Index, sorted(names))
    }

    async fn definition(&self, object: &SchemaObject) -> Result<String> {
        let not_found = || MigrateError::ObjectNotFound {
            kind: object.kind,
            name: object.name.clone(),
        };
        if self.vanished.contains(&object.name) {
            return Err(not_found());
        }
        let ddl = match object.kind {
            ObjectKind::Table => self.tables.iter().find(|t| t.name == object.name).map(|t| t.ddl()),
            ObjectKind::Sequence => self
                .sequences
                .iter()
                .find(|s| **s == object.name)
                .map(|s| {
                    format!(
                        "CREATE SEQUENCE  \"{}\".\"{}\"  MINVALUE 1 INCREMENT BY 1 START WITH 1 NOCACHE",
                        SOURCE_SCHEMA, s
                    )
                }),
            ObjectKind::View => self
                .views
                .iter()
                .find(|(n, _)| *n == object.name)
                .map(|(_, d)| d.clone()),
            ObjectKind::Constraint => self.tables.iter().find_map(|t| {
                t.constraints
                    .iter()
                    .find(|(n, _, _)| *n == object.name)
                    .map(|(_, _, d)| d.clone())
            }),
            ObjectKind::Index => self.tables.iter().find_map(|t| {
                t.indexes
                    .iter()
                    .find(|(n, _)| *n == object.name)
                    .map(|(_, d)| d.clone())
            }),
            _ => self
                .code_objects
                .iter()
                .find(|(o, _)| o == object)
                .map(|(_, d)| d.clone()),
        };
        ddl.ok_or_else(not_found)
    }

    fn read_table(&self, opts: ReadOptions) -> mpsc::Receiver<Result<Batch>> {
        let (tx, rx) = mpsc::channel(4);
        let projected: Result<Vec<Row>> = self.table(&opts.table).map(|t| {
            let idx: Vec<usize> = opts
                .columns
                .iter()
                .filter_map(|c| t.columns.iter().position(|d| &d.name == c))
                .collect();
            t.rows
                .iter()
                .map(|r| idx.iter().map(|i| r[*i].clone()).collect())
                .collect()
        });
        let batch_size = opts.batch_size;

        tokio::spawn(async move {
            match projected {
                Ok(rows) => {
                    for chunk in rows.chunks(batch_size) {
                        if tx.send(Ok(Batch::new(chunk.to_vec()))).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                }
            }
        });
        rx
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        Ok(self.table(table)?.rows.len() as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) {}
}

// =============================================================================
// Target
// =============================================================================

#[derive(Debug, Default)]
pub struct TargetState {
    /// Committed rows per table.
    pub tables: BTreeMap<String, Vec<Row>>,
    pub sequences: BTreeSet<String>,
    pub views: BTreeSet<String>,
    pub indexes: BTreeSet<String>,
    pub code_objects: BTreeSet<String>,
    /// Constraint name -> table.
    pub constraints: BTreeMap<String, String>,
    pub primary_keys: BTreeSet<String>,
    /// Every statement received, in order.
    pub statements: Vec<String>,
    /// Size of every inserted batch.
    pub batch_sizes: Vec<usize>,
    /// Cancel this token once this many tables exist.
    pub cancel_after_tables: Option<(usize, CancellationToken)>,
    /// Statements containing this text fail with a lost connection.
    pub lose_connection_on: Option<String>,
    /// Rows another session adds to a table: counted, never loaded.
    pub concurrent_rows: BTreeMap<String, u64>,
}

/// Name after the first token equal to `keyword`, without schema. Quoted
/// names keep their case; bare names fold to upper case.
pub fn ident_after(sql: &str, keyword: &str) -> Option<String> {
    let tokens: Vec<&str> = sql.split_whitespace().collect();
    let pos = tokens
        .iter()
        .position(|t| t.eq_ignore_ascii_case(keyword))?;
    let token = tokens.get(pos + 1)?;
    let token = token.split('(').next().unwrap_or(token);
    let name = match token.rfind("\".\"") {
        Some(i) => &token[i + 2..],
        None => token.rsplit('.').next().unwrap_or(token),
    };
    let name = if name.starts_with('"') {
        name.trim_matches('"').to_string()
    } else {
        name.to_ascii_uppercase()
    };
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn exists() -> MigrateError {
    BackendError::with_code(955, "ORA-00955: name is already used by an existing object").into()
}

fn missing() -> MigrateError {
    BackendError::with_code(942, "ORA-00942: table or view does not exist").into()
}

impl TargetState {
    fn apply(&mut self, sql: &str) -> Result<()> {
        let upper = sql.to_ascii_uppercase();
        let head: Vec<&str> = upper.split_whitespace().take(6).collect();
        let is = |words: &[&str]| words.iter().all(|w| head.contains(w));

        if upper.starts_with("DROP ") {
            let name = ident_after(sql, head.get(1).copied().unwrap_or("TABLE")).unwrap_or_default();
            let removed = self.tables.remove(&name).is_some()
                | self.sequences.remove(&name)
                | self.views.remove(&name)
                | self.indexes.remove(&name)
                | self.code_objects.remove(&name);
            self.primary_keys.remove(&name);
            self.constraints.retain(|_, t| *t != name);
            return if removed { Ok(()) } else { Err(missing()) };
        }

        if upper.starts_with("ALTER TABLE") {
            let table = ident_after(sql, "TABLE").unwrap_or_default();
            let name = ident_after(sql, "CONSTRAINT").unwrap_or_default();
            if !self.tables.contains_key(&table) {
                return Err(missing());
            }
            if self.constraints.contains_key(&name) {
                return Err(BackendError::with_code(2264, "name already used by an existing constraint").into());
            }
            if upper.contains("PRIMARY KEY") {
                if !self.primary_keys.insert(table.clone()) {
                    return Err(BackendError::with_code(2260, "table can have only one primary key").into());
                }
            } else if upper.contains("FOREIGN KEY") {
                let parent = ident_after(sql, "REFERENCES").unwrap_or_default();
                if !self.primary_keys.contains(&parent) {
                    return Err(BackendError::with_code(
                        2270,
                        "no matching unique or primary key for this column-list",
                    )
                    .into());
                }
            }
            self.constraints.insert(name, table);
            return Ok(());
        }

        if upper.starts_with("CREATE") {
            let replace = is(&["OR", "REPLACE"]);
            if is(&["TABLE"]) {
                let name = ident_after(sql, "TABLE").unwrap_or_default();
                if self.tables.contains_key(&name) && !replace {
                    return Err(exists());
                }
                if upper.contains("PRIMARY KEY") {
                    self.primary_keys.insert(name.clone());
                }
                self.tables.insert(name, Vec::new());
                self.check_cancel();
            } else if is(&["SEQUENCE"]) {
                let name = ident_after(sql, "SEQUENCE").unwrap_or_default();
                if !self.sequences.insert(name) {
                    return Err(exists());
                }
            } else if is(&["INDEX"]) {
                let name = ident_after(sql, "INDEX").unwrap_or_default();
                let table = ident_after(sql, "ON").unwrap_or_default();
                if !self.tables.contains_key(&table) {
                    return Err(missing());
                }
                if !self.indexes.insert(name) {
                    return Err(exists());
                }
            } else if is(&["VIEW"]) {
                let name = ident_after(sql, "VIEW").unwrap_or_default();
                if !self.views.insert(name) && !replace {
                    return Err(exists());
                }
            } else {
                let kind = head
                    .iter()
                    .find(|w| ["PROCEDURE", "FUNCTION", "PACKAGE", "TRIGGER", "TYPE"].contains(w))
                    .copied()
                    .unwrap_or("PROCEDURE");
                let name = ident_after(sql, kind).unwrap_or_default();
                if !self.code_objects.insert(name) && !replace {
                    return Err(exists());
                }
            }
            return Ok(());
        }

        Err(BackendError::with_code(900, "invalid SQL statement").into())
    }

    fn check_cancel(&self) {
        if let Some((after, token)) = &self.cancel_after_tables {
            if self.tables.len() >= *after {
                token.cancel();
            }
        }
    }
}

/// One target connection over shared state. Inserted rows stay pending
/// until commit.
pub struct MemoryTarget {
    state: Arc<Mutex<TargetState>>,
    pending: Mutex<Vec<(String, Vec<Row>)>>,
}

#[async_trait]
impl TargetCatalog for MemoryTarget {
    fn schema(&self) -> &str {
        TARGET_SCHEMA
    }

    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(sql.to_string());
        if let Some(marker) = &state.lose_connection_on {
            if sql.contains(marker.as_str()) {
                return Err(BackendError::new(
                    Some(3113),
                    Some("08S01".into()),
                    "ORA-03113: end-of-file on communication channel",
                )
                .into());
            }
        }
        state.apply(sql)
    }

    async fn commit(&self) -> Result<()> {
        let pending = std::mem::take(&mut *self.pending.lock().unwrap());
        let mut state = self.state.lock().unwrap();
        for (table, rows) in pending {
            state.tables.entry(table).or_default().extend(rows);
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.pending.lock().unwrap().clear();
        Ok(())
    }

    async fn write_batch(
        &self,
        table: &str,
        columns: &[String],
        style: IdentStyle,
        batch: Batch,
    ) -> Result<u64> {
        let sql = Dialect::Oracle.insert_statement(TARGET_SCHEMA, table, columns, style);
        let table = ident_after(&sql, "INTO").unwrap_or_default();
        {
            let mut state = self.state.lock().unwrap();
            if !state.tables.contains_key(&table) {
                return Err(missing());
            }
            state.batch_sizes.push(batch.len());
        }
        if batch.rows.iter().any(|r| r.len() != columns.len()) {
            return Err(BackendError::with_code(913, "too many values").into());
        }
        let n = batch.len() as u64;
        self.pending
            .lock()
            .unwrap()
            .push((table, batch.rows));
        Ok(n)
    }

    async fn row_count(&self, table: &str, style: IdentStyle) -> Result<u64> {
        let sql = Dialect::Oracle.count_statement(TARGET_SCHEMA, table, style);
        let table = ident_after(&sql, "FROM").unwrap_or_default();
        let state = self.state.lock().unwrap();
        let extra = state.concurrent_rows.get(&table).copied().unwrap_or(0);
        state
            .tables
            .get(&table)
            .map(|rows| rows.len() as u64 + extra)
            .ok_or_else(missing)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) {}
}

// =============================================================================
// Factory
// =============================================================================

pub struct MemoryFactory {
    pub source: Arc<MemorySource>,
    pub state: Arc<Mutex<TargetState>>,
    pub source_connections: AtomicUsize,
    pub target_connections: AtomicUsize,
    pub refuse_target: bool,
}

impl MemoryFactory {
    pub fn new(source: MemorySource) -> Arc<Self> {
        Self::with_state(source, Arc::new(Mutex::new(TargetState::default())))
    }

    /// A factory over an existing target, for re-runs.
    pub fn with_state(source: MemorySource, state: Arc<Mutex<TargetState>>) -> Arc<Self> {
        Arc::new(Self {
            source: Arc::new(source),
            state,
            source_connections: AtomicUsize::new(0),
            target_connections: AtomicUsize::new(0),
            refuse_target: false,
        })
    }

    pub fn target(&self) -> std::sync::MutexGuard<'_, TargetState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl ConnectionFactory for MemoryFactory {
    async fn connect_source(&self) -> Result<Arc<dyn SourceCatalog>> {
        self.source_connections.fetch_add(1, Ordering::SeqCst);
        Ok(self.source.clone())
    }

    async fn connect_target(&self) -> Result<Arc<dyn TargetCatalog>> {
        if self.refuse_target {
            return Err(MigrateError::Transport("listener refused the connection".into()));
        }
        self.target_connections.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemoryTarget {
            state: self.state.clone(),
            pending: Mutex::new(Vec::new()),
        }))
    }

    fn classifier(&self) -> Arc<dyn ErrorClassifier> {
        Arc::new(OracleErrorClassifier)
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn id_name_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("ID", "NUMBER").with_precision(10, 0).not_null(),
        ColumnDescriptor::new("NAME", "VARCHAR2").with_length(50),
    ]
}

/// Tables `A` and `B`, `B.A_ID` referencing `A`, three rows each.
pub fn parent_child_source() -> MemorySource {
    let a = SourceTable::new("A", id_name_columns())
        .with_rows(3)
        .with_primary_key("PK_A", "ID");
    let b = SourceTable::new(
        "B",
        vec![
            ColumnDescriptor::new("ID", "NUMBER").with_precision(10, 0).not_null(),
            ColumnDescriptor::new("A_ID", "NUMBER").with_precision(10, 0),
        ],
    )
    .with_rows(3)
    .with_primary_key("PK_B", "ID")
    .with_foreign_key("FK_B_A", "A_ID", "A")
    .with_index("IX_B_A_ID", "A_ID");

    MemorySource::default().with_table(a).with_table(b)
}

pub fn config_yaml(extra_migration: &str) -> String {
    format!(
        r#"
source:
  type: oracle
  host: src-db
  service: ORCLPDB1
  user: src
  password: secret
  schema: SRC
target:
  type: oracle
  host: tgt-db
  service: ORCLPDB1
  user: tgt
  password: secret
  schema: TGT
migration:
  batch_size: 2
{}
"#,
        extra_migration
    )
}

pub fn config(extra_migration: &str) -> catalog_migrate::Config {
    catalog_migrate::Config::from_yaml(&config_yaml(extra_migration)).expect("valid test config")
}
