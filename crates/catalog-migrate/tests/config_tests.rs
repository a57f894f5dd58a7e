//! Loading configuration files.

mod common;

use std::io::Write;

use catalog_migrate::{Config, MigrateError};
use tempfile::NamedTempFile;

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", common::config_yaml("  workers: 2")).unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.source.schema_name(), "SRC");
    assert_eq!(config.target.schema_name(), "TGT");
    assert_eq!(config.migration.workers, 2);
    assert_eq!(config.migration.batch_size, 2);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = Config::load("/nonexistent/catalog-migrate.yaml").unwrap_err();
    assert!(matches!(err, MigrateError::Io(_)));
    assert_eq!(err.exit_code(), 7);
}

#[test]
fn test_same_schema_is_rejected() {
    let yaml = common::config_yaml("").replace("host: tgt-db", "host: src-db").replace("schema: TGT", "schema: SRC");
    let err = Config::from_yaml(&yaml).unwrap_err();
    assert!(err.to_string().contains("same schema"), "{}", err);
}

#[test]
fn test_unknown_target_type_is_rejected() {
    let yaml = common::config_yaml("").replace("type: oracle\n  host: tgt-db", "type: mssql\n  host: tgt-db");
    let err = Config::from_yaml(&yaml).unwrap_err();
    assert_eq!(err.exit_code(), 1);
}
