//! Database driver implementations.
//!
//! - [`oracle`]: Oracle source and target
//! - [`snowflake`]: Snowflake target
//! - [`common`]: the shared ODBC session
//!
//! Error classifiers are pure and always compiled. Connections need the
//! `odbc` feature; without it [`connection_factory`] returns a configuration
//! error.

pub mod common;
pub mod oracle;
pub mod snowflake;

use std::sync::Arc;

use crate::config::Config;
use crate::core::dialect::Dialect;
use crate::core::traits::{ConnectionFactory, ErrorClassifier};
use crate::error::{MigrateError, Result};

pub use oracle::OracleErrorClassifier;
pub use snowflake::SnowflakeErrorClassifier;

/// Error classifier for a target dialect.
pub fn classifier_for(dialect: Dialect) -> Arc<dyn ErrorClassifier> {
    match dialect {
        Dialect::Oracle => Arc::new(OracleErrorClassifier),
        Dialect::Snowflake => Arc::new(SnowflakeErrorClassifier),
    }
}

/// Dialect of a configured catalog type.
pub fn dialect_for(catalog_type: &str) -> Result<Dialect> {
    Dialect::from_name(catalog_type).ok_or_else(|| {
        MigrateError::Config(format!(
            "Unknown catalog type: '{}'. Supported types: oracle, snowflake",
            catalog_type
        ))
    })
}

/// Connection factory for the configured backends.
pub fn connection_factory(config: &Config) -> Result<Arc<dyn ConnectionFactory>> {
    #[cfg(feature = "odbc")]
    {
        Ok(Arc::new(OdbcConnectionFactory::new(config)?))
    }
    #[cfg(not(feature = "odbc"))]
    {
        let _ = config;
        Err(MigrateError::Config(
            "this build has no database drivers; rebuild with `--features odbc`".into(),
        ))
    }
}

/// Opens ODBC sessions from the configuration. Each call yields a new connection.
#[cfg(feature = "odbc")]
pub struct OdbcConnectionFactory {
    source: crate::config::SourceConfig,
    target: crate::config::TargetConfig,
    target_dialect: Dialect,
    max_lob_bytes: usize,
}

#[cfg(feature = "odbc")]
impl OdbcConnectionFactory {
    pub fn new(config: &Config) -> Result<Self> {
        let source_dialect = dialect_for(&config.source.r#type)?;
        if source_dialect != Dialect::Oracle {
            return Err(MigrateError::Config(format!(
                "source type '{}' is not supported; only oracle can be read",
                config.source.r#type
            )));
        }
        Ok(Self {
            source: config.source.clone(),
            target: config.target.clone(),
            target_dialect: dialect_for(&config.target.r#type)?,
            max_lob_bytes: config.migration.max_lob_bytes,
        })
    }
}

#[cfg(feature = "odbc")]
#[async_trait::async_trait]
impl ConnectionFactory for OdbcConnectionFactory {
    async fn connect_source(&self) -> Result<Arc<dyn crate::core::traits::SourceCatalog>> {
        oracle::connect_source(&self.source, self.max_lob_bytes).await
    }

    async fn connect_target(&self) -> Result<Arc<dyn crate::core::traits::TargetCatalog>> {
        match self.target_dialect {
            Dialect::Oracle => oracle::connect_target(&self.target).await,
            Dialect::Snowflake => snowflake::connect_target(&self.target).await,
        }
    }

    fn classifier(&self) -> Arc<dyn ErrorClassifier> {
        classifier_for(self.target_dialect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BackendError, FailureKind};

    #[test]
    fn test_classifier_for_dialect() {
        let exists = BackendError::with_code(955, "name is already used");
        assert_eq!(classifier_for(Dialect::Oracle).classify(&exists), FailureKind::AlreadyExists);
        assert_eq!(classifier_for(Dialect::Snowflake).name(), "snowflake");
    }

    #[test]
    fn test_dialect_for() {
        assert_eq!(dialect_for("Snowflake").unwrap(), Dialect::Snowflake);
        assert!(matches!(dialect_for("mssql"), Err(MigrateError::Config(_))));
    }
}
