//! Snowflake driver (target only).

mod errors;

pub use errors::SnowflakeErrorClassifier;

/// Open a Snowflake target session. The target schema is created when missing.
#[cfg(feature = "odbc")]
pub async fn connect_target(
    config: &crate::config::TargetConfig,
) -> crate::error::Result<std::sync::Arc<dyn crate::core::traits::TargetCatalog>> {
    use std::sync::Arc;

    use crate::core::dialect::Dialect;
    use crate::drivers::common::odbc::{OdbcSession, OdbcTarget};

    let schema = config.schema_name();
    let setup = Dialect::Snowflake.session_setup(
        &schema,
        config.warehouse.as_deref(),
        config.database.as_deref(),
    );
    let session =
        OdbcSession::connect("Snowflake target", config.connection_string(), setup).await?;
    Ok(Arc::new(OdbcTarget::new(session, schema, Dialect::Snowflake)))
}
