//! Oracle driver.
//!
//! - [`OracleErrorClassifier`]: ORA code classification (always available)
//! - [`OracleSource`]: source catalog over ODBC (`odbc` feature)
//! - [`connect_target`]: Oracle target over ODBC (`odbc` feature)

mod errors;
#[cfg(feature = "odbc")]
mod reader;

pub use errors::{ora_number, OracleErrorClassifier, METADATA_NOT_FOUND};
#[cfg(feature = "odbc")]
pub use reader::{metadata_type, OracleSource, METADATA_TRANSFORMS};

#[cfg(feature = "odbc")]
mod connect {
    use std::sync::Arc;

    use crate::config::{SourceConfig, TargetConfig};
    use crate::core::dialect::Dialect;
    use crate::core::traits::{SourceCatalog, TargetCatalog};
    use crate::drivers::common::odbc::{OdbcSession, OdbcTarget};
    use crate::error::Result;

    use super::reader::{OracleSource, METADATA_TRANSFORMS};

    /// Open the source session: pinned NLS formats plus metadata transforms.
    pub async fn connect_source(
        config: &SourceConfig,
        max_lob_bytes: usize,
    ) -> Result<Arc<dyn SourceCatalog>> {
        let schema = config.schema_name();
        let mut setup = Dialect::Oracle.session_setup(&schema, None, None);
        setup.push(METADATA_TRANSFORMS.to_string());
        let session = OdbcSession::connect("Oracle source", config.connection_string(), setup).await?;
        Ok(Arc::new(OracleSource::new(session, schema, max_lob_bytes)))
    }

    /// Open an Oracle target session.
    pub async fn connect_target(config: &TargetConfig) -> Result<Arc<dyn TargetCatalog>> {
        let schema = config.schema_name();
        let setup = Dialect::Oracle.session_setup(&schema, None, None);
        let session = OdbcSession::connect("Oracle target", config.connection_string(), setup).await?;
        Ok(Arc::new(OdbcTarget::new(session, schema, Dialect::Oracle)))
    }
}

#[cfg(feature = "odbc")]
pub use connect::{connect_source, connect_target};
