//! Assisted table definitions over HTTP, and the deterministic fallback.

use std::sync::Arc;
use std::time::Duration;

use catalog_migrate::ddl::AssistedGenerator;
use catalog_migrate::typemap::OracleToSnowflakeMapper;
use catalog_migrate::{
    AssistConfig, ColumnDescriptor, DdlGenerator, DeterministicGenerator, TableDdlGenerator,
    TableDefinition,
};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn dept() -> TableDefinition {
    TableDefinition {
        table: "DEPT".into(),
        columns: vec![
            ColumnDescriptor::new("DEPTNO", "NUMBER").with_precision(2, 0).not_null(),
            ColumnDescriptor::new("DNAME", "VARCHAR2").with_length(14),
        ],
    }
}

fn assisted(server: &MockServer, timeout_secs: u64) -> Arc<dyn DdlGenerator> {
    let config = AssistConfig {
        endpoint: format!("{}/v1/responses", server.uri()),
        api_key: Some("test-key".into()),
        timeout_secs,
        ..AssistConfig::default()
    };
    Arc::new(AssistedGenerator::from_config(&config, "TGT", true).unwrap())
}

fn generator(assisted: Arc<dyn DdlGenerator>) -> TableDdlGenerator {
    TableDdlGenerator::new(DeterministicGenerator::new(
        Arc::new(OracleToSnowflakeMapper),
        true,
    ))
    .with_assisted(assisted)
}

fn answer(sql: &str, columns: &[&str]) -> serde_json::Value {
    let text = json!({ "create_table_sql": sql, "column_list": columns }).to_string();
    json!({
        "id": "resp_1",
        "output": [{
            "type": "message",
            "role": "assistant",
            "content": [{ "type": "output_text", "text": text }]
        }]
    })
}

#[tokio::test]
async fn test_assisted_definition_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(answer(
            "CREATE OR REPLACE TABLE TGT.DEPT (DEPTNO NUMBER(2,0) NOT NULL, DNAME VARCHAR(14));",
            &["DEPTNO", "DNAME"],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let ddl = generator(assisted(&server, 5)).generate(&dept()).await;

    assert_eq!(
        ddl.sql,
        "CREATE OR REPLACE TABLE TGT.DEPT (DEPTNO NUMBER(2,0) NOT NULL, DNAME VARCHAR(14))"
    );
    assert_eq!(ddl.columns, vec!["DEPTNO", "DNAME"]);
}

#[tokio::test]
async fn test_server_error_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let ddl = generator(assisted(&server, 5)).generate(&dept()).await;

    assert!(ddl.sql.starts_with("CREATE OR REPLACE TABLE DEPT ("));
    assert!(ddl.sql.contains("DEPTNO NUMBER(2,0) NOT NULL"));
    assert!(ddl.sql.contains("DNAME VARCHAR(14)"));
    assert_eq!(ddl.columns, vec!["DEPTNO", "DNAME"]);
}

#[tokio::test]
async fn test_malformed_answer_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output_text": "Sure! Here is your table: CREATE TABLE DEPT (...)"
        })))
        .mount(&server)
        .await;

    let ddl = generator(assisted(&server, 5)).generate(&dept()).await;
    assert!(ddl.sql.starts_with("CREATE OR REPLACE TABLE DEPT ("));
}

#[tokio::test]
async fn test_wrong_column_count_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(answer(
            "CREATE TABLE DEPT (DEPTNO NUMBER)",
            &["DEPTNO"],
        )))
        .mount(&server)
        .await;

    let ddl = generator(assisted(&server, 5)).generate(&dept()).await;
    assert_eq!(ddl.columns.len(), 2);
    assert!(ddl.sql.contains("DNAME"));
}

#[tokio::test]
async fn test_slow_service_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(answer("CREATE TABLE DEPT (A INT, B INT)", &["A", "B"]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let ddl = generator(assisted(&server, 1)).generate(&dept()).await;
    assert!(ddl.sql.starts_with("CREATE OR REPLACE TABLE DEPT ("));
}
