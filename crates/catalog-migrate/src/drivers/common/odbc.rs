//! ODBC session shared by the Oracle and Snowflake backends.
//!
//! ODBC calls block, so every call runs on the blocking pool. A connection
//! is not safe for concurrent use; the session serializes calls through a
//! mutex. Autocommit is off: callers commit or roll back explicitly.
//!
//! **Requirements:** unixODBC (or the Windows driver manager) plus the
//! vendor drivers (Oracle Instant Client ODBC, Snowflake ODBC).

use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use odbc_api::{
    buffers::TextRowSet, Connection, ConnectionOptions, Cursor, Environment, ResultSetMetadata,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::core::dialect::Dialect;
use crate::core::identifier::IdentStyle;
use crate::core::traits::TargetCatalog;
use crate::core::value::{Batch, Row};
use crate::error::{BackendError, MigrateError, Result};

static ENV: OnceLock<Environment> = OnceLock::new();

fn environment() -> Result<&'static Environment> {
    if let Some(env) = ENV.get() {
        return Ok(env);
    }
    let env = Environment::new().map_err(|e| {
        MigrateError::Transport(format!(
            "Failed to create ODBC environment: {}. Make sure unixODBC and the vendor driver are installed.",
            e
        ))
    })?;
    Ok(ENV.get_or_init(|| env))
}

/// Convert an ODBC error, keeping the native code and SQLSTATE.
pub fn backend_error(error: odbc_api::Error) -> MigrateError {
    match error {
        odbc_api::Error::Diagnostics { record, .. } => {
            let message = String::from_utf8_lossy(&record.message).trim().to_string();
            BackendError::new(
                Some(record.native_error),
                Some(record.state.as_str().to_string()),
                message,
            )
            .into()
        }
        other => BackendError::new(None, None, other.to_string()).into(),
    }
}

/// One ODBC connection with autocommit off.
#[derive(Clone)]
pub struct OdbcSession {
    conn: Arc<Mutex<Connection<'static>>>,
    label: &'static str,
}

impl OdbcSession {
    /// Connect and run the session setup statements.
    ///
    /// Connection failures are transport failures; the connection string is
    /// never included in the error.
    pub async fn connect(
        label: &'static str,
        connection_string: String,
        setup: Vec<String>,
    ) -> Result<Self> {
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection<'static>> {
            let env = environment()?;
            let conn = env
                .connect_with_connection_string(&connection_string, ConnectionOptions::default())
                .map_err(|e| {
                    MigrateError::Transport(format!("Failed to connect to {} via ODBC: {}", label, e))
                })?;
            conn.set_autocommit(false).map_err(backend_error)?;
            for stmt in &setup {
                debug!("{} session: {}", label, stmt);
                conn.execute(stmt, ()).map_err(backend_error)?;
            }
            Ok(conn)
        })
        .await
        .map_err(|e| MigrateError::Transport(format!("ODBC connect task failed: {}", e)))??;

        info!("Connected to {} via ODBC", label);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            label,
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Run `f` with the connection on the blocking pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection<'static>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        let label = self.label;
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| MigrateError::Transport(format!("{} connection poisoned", label)))?;
            f(&guard)
        })
        .await
        .map_err(|e| MigrateError::Transport(format!("ODBC task failed: {}", e)))?
    }

    /// Execute a statement, discarding any result set.
    pub async fn execute(&self, sql: &str) -> Result<()> {
        let sql = sql.to_string();
        self.run(move |conn| {
            conn.execute(&sql, ()).map_err(backend_error)?;
            Ok(())
        })
        .await
    }

    /// Run a query and collect every row as text.
    pub async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        let sql = sql.to_string();
        self.run(move |conn| query_rows(conn, &sql)).await
    }

    /// First column of the first row.
    pub async fn query_scalar(&self, sql: &str) -> Result<Option<String>> {
        Ok(self
            .query(sql)
            .await?
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .flatten())
    }

    /// First column of every row.
    pub async fn query_names(&self, sql: &str) -> Result<Vec<String>> {
        Ok(self
            .query(sql)
            .await?
            .into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .collect())
    }

    pub async fn commit(&self) -> Result<()> {
        self.run(|conn| conn.commit().map_err(backend_error)).await
    }

    pub async fn rollback(&self) -> Result<()> {
        self.run(|conn| conn.rollback().map_err(backend_error)).await
    }

    /// Stream a query into a bounded channel, `batch_size` rows at a time.
    ///
    /// Values longer than `max_str_len` bytes fail the read instead of being
    /// truncated.
    pub fn stream(
        &self,
        sql: String,
        batch_size: usize,
        max_str_len: usize,
    ) -> mpsc::Receiver<Result<Batch>> {
        let (tx, rx) = mpsc::channel(4);
        let conn = self.conn.clone();
        let label = self.label;

        tokio::task::spawn_blocking(move || {
            let result = conn
                .lock()
                .map_err(|_| MigrateError::Transport(format!("{} connection poisoned", label)))
                .and_then(|guard| stream_rows(&guard, &sql, batch_size, max_str_len, &tx));
            if let Err(e) = result {
                let _ = tx.blocking_send(Err(e));
            }
        });

        rx
    }

    /// Positional bulk insert of one batch through a prepared statement.
    pub async fn insert(&self, sql: String, columns: usize, batch: Batch) -> Result<u64> {
        self.run(move |conn| insert_rows(conn, &sql, columns, &batch))
            .await
    }
}

fn query_rows(conn: &Connection<'_>, sql: &str) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    let Some(mut cursor) = conn.execute(sql, ()).map_err(backend_error)? else {
        return Ok(rows);
    };
    let num_cols = cursor.num_result_cols().map_err(backend_error)?.max(0) as u16;

    let mut buf = Vec::new();
    while let Some(mut row) = cursor.next_row().map_err(backend_error)? {
        let mut values = Vec::with_capacity(num_cols as usize);
        for col in 1..=num_cols {
            buf.clear();
            let present = row.get_text(col, &mut buf).map_err(backend_error)?;
            values.push(present.then(|| String::from_utf8_lossy(&buf).into_owned()));
        }
        rows.push(values);
    }
    Ok(rows)
}

fn stream_rows(
    conn: &Connection<'_>,
    sql: &str,
    batch_size: usize,
    max_str_len: usize,
    tx: &mpsc::Sender<Result<Batch>>,
) -> Result<()> {
    let Some(mut cursor) = conn.execute(sql, ()).map_err(backend_error)? else {
        return Ok(());
    };
    let mut buffers =
        TextRowSet::for_cursor(batch_size, &mut cursor, Some(max_str_len)).map_err(backend_error)?;
    let mut block = cursor.bind_buffer(&mut buffers).map_err(backend_error)?;

    while let Some(fetched) = block
        .fetch_with_truncation_check(true)
        .map_err(backend_error)?
    {
        let num_cols = fetched.num_cols();
        let rows: Vec<Row> = (0..fetched.num_rows())
            .map(|r| {
                (0..num_cols)
                    .map(|c| {
                        fetched
                            .at(c, r)
                            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                    })
                    .collect()
            })
            .collect();
        if tx.blocking_send(Ok(Batch::new(rows))).is_err() {
            // Receiver dropped: the load was abandoned.
            return Ok(());
        }
    }
    Ok(())
}

fn insert_rows(conn: &Connection<'_>, sql: &str, columns: usize, batch: &Batch) -> Result<u64> {
    if batch.is_empty() {
        return Ok(0);
    }
    let prepared = conn.prepare(sql).map_err(backend_error)?;
    let mut inserter = prepared
        .into_text_inserter(batch.len(), batch.max_widths(columns))
        .map_err(backend_error)?;
    for row in &batch.rows {
        inserter
            .append(row.iter().map(|v| v.as_deref().map(str::as_bytes)))
            .map_err(backend_error)?;
    }
    inserter.execute().map_err(backend_error)?;
    Ok(batch.len() as u64)
}

/// Target catalog over an ODBC session. Statement text comes from the dialect.
pub struct OdbcTarget {
    session: OdbcSession,
    schema: String,
    dialect: Dialect,
}

impl OdbcTarget {
    pub fn new(session: OdbcSession, schema: String, dialect: Dialect) -> Self {
        Self {
            session,
            schema,
            dialect,
        }
    }
}

#[async_trait]
impl TargetCatalog for OdbcTarget {
    fn schema(&self) -> &str {
        &self.schema
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        self.session.execute(sql).await
    }

    async fn commit(&self) -> Result<()> {
        self.session.commit().await
    }

    async fn rollback(&self) -> Result<()> {
        self.session.rollback().await
    }

    async fn write_batch(
        &self,
        table: &str,
        columns: &[String],
        style: IdentStyle,
        batch: Batch,
    ) -> Result<u64> {
        let sql = self.dialect.insert_statement(&self.schema, table, columns, style);
        self.session.insert(sql, columns.len(), batch).await
    }

    async fn row_count(&self, table: &str, style: IdentStyle) -> Result<u64> {
        let sql = self.dialect.count_statement(&self.schema, table, style);
        parse_count(self.session.query_scalar(&sql).await?, table)
    }

    async fn ping(&self) -> Result<()> {
        self.session.execute(self.dialect.ping_statement()).await
    }

    async fn close(&self) {
        if let Err(e) = self.session.rollback().await {
            debug!("{} rollback on close failed: {}", self.session.label(), e);
        }
    }
}

/// Parse a `COUNT(*)` result.
pub fn parse_count(value: Option<String>, table: &str) -> Result<u64> {
    value
        .as_deref()
        .map(str::trim)
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| {
            BackendError::new(None, None, format!("unreadable row count for {}", table)).into()
        })
}
