//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Apply command-line overrides and re-validate. The result is what the
    /// orchestrator receives and is not modified afterwards.
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self> {
        if let Some(schema) = &overrides.source_schema {
            self.source.schema = Some(schema.clone());
        }
        if let Some(schema) = &overrides.target_schema {
            self.target.schema = Some(schema.clone());
        }
        if let Some(batch_size) = overrides.batch_size {
            self.migration.batch_size = batch_size;
        }
        if let Some(workers) = overrides.workers {
            self.migration.workers = workers;
        }
        if let Some(tables) = &overrides.include_tables {
            self.migration.include_tables = tables.clone();
        }
        self.validate()?;
        Ok(self)
    }

    /// The assist section when it is enabled.
    pub fn active_assist(&self) -> Option<&AssistConfig> {
        self.assist.as_ref().filter(|a| a.enabled)
    }
}

/// Values supplied on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source_schema: Option<String>,
    pub target_schema: Option<String>,
    pub batch_size: Option<usize>,
    pub workers: Option<usize>,
    pub include_tables: Option<Vec<String>>,
}

/// Wrap an ODBC attribute value in braces when it contains separators.
fn odbc_value(value: &str) -> String {
    if value.contains([';', '{', '}', '=']) || value.starts_with(' ') || value.ends_with(' ') {
        format!("{{{}}}", value.replace('}', "}}"))
    } else {
        value.to_string()
    }
}

impl SourceConfig {
    /// Build an ODBC connection string for the Oracle driver.
    pub fn connection_string(&self) -> String {
        if let Some(raw) = &self.connection_string {
            return raw.clone();
        }
        oracle_connection_string(
            self.driver.as_deref(),
            &self.host,
            self.port,
            &self.service,
            &self.user,
            &self.password,
        )
    }
}

impl TargetConfig {
    /// Build an ODBC connection string for the configured target driver.
    pub fn connection_string(&self) -> String {
        if let Some(raw) = &self.connection_string {
            return raw.clone();
        }
        if self.is_snowflake() {
            let mut parts = vec![
                format!(
                    "Driver={{{}}}",
                    self.driver.as_deref().unwrap_or("SnowflakeDSIIDriver")
                ),
                format!("Server={}.snowflakecomputing.com", self.account),
                format!("UID={}", odbc_value(&self.user)),
                format!("PWD={}", odbc_value(&self.password)),
            ];
            if let Some(db) = &self.database {
                parts.push(format!("Database={}", odbc_value(db)));
            }
            if let Some(wh) = &self.warehouse {
                parts.push(format!("Warehouse={}", odbc_value(wh)));
            }
            if let Some(role) = &self.role {
                parts.push(format!("Role={}", odbc_value(role)));
            }
            parts.join(";")
        } else {
            oracle_connection_string(
                self.driver.as_deref(),
                &self.host,
                self.port,
                &self.service,
                &self.user,
                &self.password,
            )
        }
    }
}

fn oracle_connection_string(
    driver: Option<&str>,
    host: &str,
    port: u16,
    service: &str,
    user: &str,
    password: &str,
) -> String {
    format!(
        "Driver={{{}}};DBQ={}:{}/{};UID={};PWD={}",
        driver.unwrap_or("Oracle ODBC Driver"),
        host,
        port,
        service,
        odbc_value(user),
        odbc_value(password)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
source:
  type: oracle
  host: src-db
  service: ORCLPDB1
  user: hr
  password: "p;w"
target:
  type: snowflake
  account: xy12345
  user: LOADER
  password: secret
  schema: HR
  warehouse: LOAD_WH
  database: ANALYTICS
migration:
  include_tables: [employees, Departments]
"#;

    #[test]
    fn test_from_yaml_defaults() {
        let config = Config::from_yaml(YAML).unwrap();
        assert_eq!(config.source.port, 1521);
        assert_eq!(config.source.schema_name(), "HR");
        assert_eq!(config.migration.batch_size, 5000);
        assert!(config.migration.commit_every_batch);
        assert!(!config.migration.drop_if_exists);
        assert_eq!(config.migration.table_ddl, TableDdlMode::Auto);
        assert!(config.assist.is_none());
    }

    #[test]
    fn test_allow_list_is_case_insensitive() {
        let config = Config::from_yaml(YAML).unwrap();
        assert!(config.migration.includes_table("EMPLOYEES"));
        assert!(config.migration.includes_table("DEPARTMENTS"));
        assert!(!config.migration.includes_table("JOBS"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_yaml(YAML).unwrap();
        let config = config
            .with_overrides(&ConfigOverrides {
                source_schema: Some("SCOTT".into()),
                batch_size: Some(100),
                workers: Some(4),
                include_tables: Some(vec!["EMP".into()]),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.source.schema_name(), "SCOTT");
        assert_eq!(config.migration.batch_size, 100);
        assert_eq!(config.migration.workers, 4);
        assert!(config.migration.includes_table("emp"));
    }

    #[test]
    fn test_override_rejects_zero_batch() {
        let config = Config::from_yaml(YAML).unwrap();
        let result = config.with_overrides(&ConfigOverrides {
            batch_size: Some(0),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_connection_strings() {
        let config = Config::from_yaml(YAML).unwrap();
        assert_eq!(
            config.source.connection_string(),
            "Driver={Oracle ODBC Driver};DBQ=src-db:1521/ORCLPDB1;UID=hr;PWD={p;w}"
        );
        let target = config.target.connection_string();
        assert!(target.starts_with("Driver={SnowflakeDSIIDriver};Server=xy12345.snowflakecomputing.com"));
        assert!(target.contains("Warehouse=LOAD_WH"));
        assert!(target.contains("Database=ANALYTICS"));
    }

    #[test]
    fn test_assist_section() {
        let yaml = format!("{}assist:\n  api_key: sk-test\n", YAML);
        let config = Config::from_yaml(&yaml).unwrap();
        let assist = config.active_assist().unwrap();
        assert_eq!(assist.model, "gpt-4o-mini");
        assert_eq!(assist.resolved_api_key().as_deref(), Some("sk-test"));
        assert!(!format!("{:?}", assist).contains("sk-test"));
    }
}
