//! Configuration validation.

use super::Config;
use crate::core::identifier::validate_identifier;
use crate::error::{MigrateError, Result};

fn check_identifier(field: &str, name: &str) -> Result<()> {
    validate_identifier(name).map_err(|e| match e {
        MigrateError::Config(msg) => MigrateError::Config(format!("{}: {}", field, msg)),
        other => other,
    })
}

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if !config.source.r#type.eq_ignore_ascii_case("oracle") {
        return Err(MigrateError::Config(format!(
            "source.type must be 'oracle', got '{}'",
            config.source.r#type
        )));
    }
    if config.source.connection_string.is_none() {
        if config.source.host.is_empty() {
            return Err(MigrateError::Config("source.host is required".into()));
        }
        if config.source.service.is_empty() {
            return Err(MigrateError::Config("source.service is required".into()));
        }
    }
    if config.source.user.is_empty() {
        return Err(MigrateError::Config("source.user is required".into()));
    }

    // Target validation
    let target = &config.target;
    match target.r#type.to_ascii_lowercase().as_str() {
        "oracle" => {
            if target.connection_string.is_none() {
                if target.host.is_empty() {
                    return Err(MigrateError::Config("target.host is required".into()));
                }
                if target.service.is_empty() {
                    return Err(MigrateError::Config("target.service is required".into()));
                }
            }
        }
        "snowflake" => {
            if target.connection_string.is_none() && target.account.is_empty() {
                return Err(MigrateError::Config("target.account is required".into()));
            }
            if target.schema.as_deref().map_or(true, str::is_empty) {
                return Err(MigrateError::Config(
                    "target.schema is required for snowflake".into(),
                ));
            }
        }
        other => {
            return Err(MigrateError::Config(format!(
                "target.type must be 'oracle' or 'snowflake', got '{}'",
                other
            )));
        }
    }
    if target.user.is_empty() {
        return Err(MigrateError::Config("target.user is required".into()));
    }

    // Configured names end up in generated statements
    check_identifier("source.schema", &config.source.schema_name())?;
    check_identifier("target.schema", &target.schema_name())?;
    for table in &config.migration.include_tables {
        check_identifier("migration.include_tables", table)?;
    }

    // Cannot migrate a schema onto itself
    if !target.is_snowflake()
        && config.source.host.eq_ignore_ascii_case(&target.host)
        && config.source.port == target.port
        && config.source.service.eq_ignore_ascii_case(&target.service)
        && config.source.schema_name() == target.schema_name()
    {
        return Err(MigrateError::Config(
            "source and target cannot be the same schema".into(),
        ));
    }

    let m = &config.migration;
    if m.batch_size == 0 {
        return Err(MigrateError::Config(
            "migration.batch_size must be at least 1".into(),
        ));
    }
    if m.workers == 0 {
        return Err(MigrateError::Config(
            "migration.workers must be at least 1".into(),
        ));
    }
    if m.statement_timeout_secs == 0 {
        return Err(MigrateError::Config(
            "migration.statement_timeout_secs must be at least 1".into(),
        ));
    }

    if let Some(assist) = config.active_assist() {
        if assist.endpoint.is_empty() {
            return Err(MigrateError::Config("assist.endpoint is required".into()));
        }
        if assist.model.is_empty() {
            return Err(MigrateError::Config("assist.model is required".into()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssistConfig, MigrationConfig, SourceConfig, TargetConfig};

    fn valid_config() -> Config {
        Config {
            source: SourceConfig {
                r#type: "oracle".to_string(),
                host: "localhost".to_string(),
                port: 1521,
                service: "ORCLPDB1".to_string(),
                user: "hr".to_string(),
                password: "password".to_string(),
                schema: None,
                driver: None,
                connection_string: None,
            },
            target: TargetConfig {
                r#type: "oracle".to_string(),
                host: "localhost".to_string(),
                port: 1521,
                service: "ORCLPDB1".to_string(),
                account: String::new(),
                user: "hr_copy".to_string(),
                password: "password".to_string(),
                schema: None,
                warehouse: None,
                database: None,
                role: None,
                driver: None,
                connection_string: None,
            },
            migration: MigrationConfig::default(),
            assist: None,
        }
    }

    #[test]
    fn test_valid_config() {
        let config = valid_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_source_host() {
        let mut config = valid_config();
        config.source.host = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_connection_string_replaces_host() {
        let mut config = valid_config();
        config.source.host = "".to_string();
        config.source.connection_string = Some("DSN=ora".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_wrong_source_type() {
        let mut config = valid_config();
        config.source.r#type = "snowflake".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_wrong_target_type() {
        let mut config = valid_config();
        config.target.r#type = "postgres".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_snowflake_requires_schema() {
        let mut config = valid_config();
        config.target.r#type = "snowflake".to_string();
        config.target.account = "xy12345".to_string();
        assert!(validate(&config).is_err());
        config.target.schema = Some("HR".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_same_schema_rejected() {
        let mut config = valid_config();
        config.target.user = "HR".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("same schema"));
    }

    #[test]
    fn test_bad_schema_names_rejected() {
        let mut config = valid_config();
        config.target.schema = Some("X".repeat(129));
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("target.schema"), "{}", err);

        let mut config = valid_config();
        config.source.schema = Some("HR\0".to_string());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_blank_allow_list_entry_rejected() {
        let mut config = valid_config();
        config.migration.include_tables = vec!["EMP".to_string(), "".to_string()];
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("migration.include_tables"), "{}", err);

        config.migration.include_tables = vec!["EMP".to_string(), "dept".to_string()];
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = valid_config();
        config.migration.workers = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_assist_model_rejected() {
        let mut config = valid_config();
        config.assist = Some(AssistConfig {
            model: String::new(),
            ..Default::default()
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_source_config_debug_redacts_password() {
        let mut config = valid_config();
        config.source.password = "super_secret_password_123".to_string();
        let debug_output = format!("{:?}", config.source);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_123"),
            "Debug output should not contain actual password value"
        );
    }

    #[test]
    fn test_target_config_debug_redacts_password() {
        let mut config = valid_config();
        config.target.password = "super_secret_password_456".to_string();
        let debug_output = format!("{:?}", config.target);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_456"),
            "Debug output should not contain actual password value"
        );
    }
}
