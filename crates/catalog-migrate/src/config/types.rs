//! Configuration type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Environment variable consulted when `assist.api_key` is not set.
pub const ASSIST_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source catalog connection (Oracle).
    pub source: SourceConfig,

    /// Target catalog connection (Oracle or Snowflake).
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,

    /// Assisted table DDL generation. Absent means deterministic only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assist: Option<AssistConfig>,
}

/// Source catalog configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Catalog type (only "oracle" is supported as a source).
    #[serde(default = "default_oracle")]
    pub r#type: String,

    /// Database host.
    #[serde(default)]
    pub host: String,

    /// Listener port (default: 1521).
    #[serde(default = "default_oracle_port")]
    pub port: u16,

    /// Oracle service name.
    #[serde(default)]
    pub service: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Schema to migrate. Defaults to the upper-cased user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// ODBC driver name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,

    /// Raw ODBC connection string. Overrides host/port/service when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
}

impl SourceConfig {
    /// Effective schema name.
    pub fn schema_name(&self) -> String {
        self.schema
            .clone()
            .unwrap_or_else(|| self.user.to_ascii_uppercase())
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("service", &self.service)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("driver", &self.driver)
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Target catalog configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Catalog type: "oracle" or "snowflake".
    pub r#type: String,

    /// Database host (Oracle).
    #[serde(default)]
    pub host: String,

    /// Listener port (Oracle, default: 1521).
    #[serde(default = "default_oracle_port")]
    pub port: u16,

    /// Oracle service name.
    #[serde(default)]
    pub service: String,

    /// Snowflake account identifier.
    #[serde(default)]
    pub account: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Target schema. Defaults to the upper-cased user for Oracle; required for Snowflake.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Snowflake warehouse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,

    /// Snowflake database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Snowflake role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// ODBC driver name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,

    /// Raw ODBC connection string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
}

impl TargetConfig {
    /// Effective schema name.
    pub fn schema_name(&self) -> String {
        self.schema
            .clone()
            .unwrap_or_else(|| self.user.to_ascii_uppercase())
    }

    /// True when the target is Snowflake.
    pub fn is_snowflake(&self) -> bool {
        self.r#type.eq_ignore_ascii_case("snowflake")
    }
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("service", &self.service)
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("role", &self.role)
            .field("driver", &self.driver)
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// How table definitions are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableDdlMode {
    /// Catalog definitions for same-dialect targets, generated otherwise.
    #[default]
    Auto,

    /// Always fetch and rewrite the source catalog definition.
    Catalog,

    /// Always build the definition from column descriptors.
    Generate,
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Rows per fetch/insert batch (default: 5000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Best-effort drop before each create (default: false).
    #[serde(default)]
    pub drop_if_exists: bool,

    /// Table allow-list, matched case-insensitively. Empty means all tables.
    #[serde(default)]
    pub include_tables: Vec<String>,

    /// Migrate procedures, functions, packages, triggers and types (default: true).
    #[serde(default = "default_true")]
    pub migrate_code_objects: bool,

    /// Commit after every inserted batch instead of once per table (default: true).
    #[serde(default = "default_true")]
    pub commit_every_batch: bool,

    /// Emit CREATE OR REPLACE TABLE for generated Snowflake tables (default: true).
    #[serde(default = "default_true")]
    pub create_or_replace: bool,

    /// Table definition source (default: auto).
    #[serde(default)]
    pub table_ddl: TableDdlMode,

    /// Compare source and target row counts after loading (default: true).
    #[serde(default = "default_true")]
    pub validate_row_counts: bool,

    /// Parallel table loads (default: 1).
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Timeout applied to each backend call, in seconds (default: 300).
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_secs: u64,

    /// Maximum bytes fetched per LOB/long text cell (default: 65536).
    #[serde(default = "default_max_lob_bytes")]
    pub max_lob_bytes: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            drop_if_exists: false,
            include_tables: Vec::new(),
            migrate_code_objects: true,
            commit_every_batch: true,
            create_or_replace: true,
            table_ddl: TableDdlMode::Auto,
            validate_row_counts: true,
            workers: default_workers(),
            statement_timeout_secs: default_statement_timeout(),
            max_lob_bytes: default_max_lob_bytes(),
        }
    }
}

impl MigrationConfig {
    /// True when `table` passes the allow-list.
    pub fn includes_table(&self, table: &str) -> bool {
        self.include_tables.is_empty()
            || self
                .include_tables
                .iter()
                .any(|t| t.trim().eq_ignore_ascii_case(table))
    }
}

/// Assisted DDL generation settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct AssistConfig {
    /// Use the assisted generator (default: true when the section is present).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Responses endpoint.
    #[serde(default = "default_assist_endpoint")]
    pub endpoint: String,

    /// Model name.
    #[serde(default = "default_assist_model")]
    pub model: String,

    /// API key. Falls back to `OPENAI_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds (default: 60).
    #[serde(default = "default_assist_timeout")]
    pub timeout_secs: u64,
}

impl AssistConfig {
    /// Configured key, else the environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(ASSIST_API_KEY_ENV).ok())
            .filter(|k| !k.is_empty())
    }
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_assist_endpoint(),
            model: default_assist_model(),
            api_key: None,
            timeout_secs: default_assist_timeout(),
        }
    }
}

impl fmt::Debug for AssistConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistConfig")
            .field("enabled", &self.enabled)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// Default value functions for serde
fn default_oracle() -> String {
    "oracle".to_string()
}

fn default_oracle_port() -> u16 {
    1521
}

fn default_batch_size() -> usize {
    5000
}

fn default_workers() -> usize {
    1
}

fn default_statement_timeout() -> u64 {
    300
}

fn default_max_lob_bytes() -> usize {
    65536
}

fn default_assist_endpoint() -> String {
    "https://api.openai.com/v1/responses".to_string()
}

fn default_assist_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_assist_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}
