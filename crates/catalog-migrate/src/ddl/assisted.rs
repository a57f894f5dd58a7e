//! Assisted table DDL generation through an external Responses-style HTTP service.
//!
//! The service receives the table name, its ordered column descriptors and a
//! type mapping guide, and must answer with strict JSON
//! `{"create_table_sql": "...", "column_list": [...]}`. Any transport error,
//! timeout, non-success status or malformed answer is a
//! [`MigrateError::Generator`], which the caller recovers from.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::generator::{DdlGenerator, GeneratedDdl};
use crate::config::AssistConfig;
use crate::core::schema::TableDefinition;
use crate::error::{MigrateError, Result};

const INSTRUCTIONS: &str = "You convert Oracle table metadata into a single Snowflake \
CREATE TABLE statement. Answer with one JSON object and nothing else.";

const MAPPING_GUIDE: &[&str] = &[
    "VARCHAR2/NVARCHAR2/VARCHAR/CHAR/NCHAR -> VARCHAR(n)",
    "NUMBER(p,s) -> NUMBER(p,s); NUMBER without precision -> NUMBER",
    "FLOAT/BINARY_FLOAT/BINARY_DOUBLE -> FLOAT",
    "DATE -> TIMESTAMP_NTZ",
    "TIMESTAMP -> TIMESTAMP_NTZ",
    "TIMESTAMP WITH TIME ZONE -> TIMESTAMP_TZ",
    "TIMESTAMP WITH LOCAL TIME ZONE -> TIMESTAMP_LTZ",
    "CLOB/NCLOB/LONG -> VARCHAR",
    "RAW/BLOB/LONG RAW -> BINARY",
    "JSON/XMLTYPE/SYS.ANYDATA -> VARIANT",
];

const REQUIREMENTS: &[&str] = &[
    "Return strict JSON only, without markdown or commentary.",
    "Keys: create_table_sql (string), column_list (array of column names in source order).",
    "create_table_sql is exactly one statement with no trailing semicolon.",
    "Columns with nullable=false are NOT NULL.",
    "Use unquoted upper-case identifiers when possible, otherwise double-quote them.",
];

#[derive(Serialize)]
struct ColumnPayload<'a> {
    name: &'a str,
    oracle_type: &'a str,
    data_length: Option<u32>,
    precision: Option<u32>,
    scale: Option<i32>,
    nullable: bool,
}

#[derive(Serialize)]
struct TablePayload<'a> {
    table: &'a str,
    target_schema: &'a str,
    create_or_replace: bool,
    oracle_columns: Vec<ColumnPayload<'a>>,
    mapping_guide: &'a [&'a str],
    requirements: &'a [&'a str],
}

#[derive(Deserialize)]
struct AssistedAnswer {
    create_table_sql: String,
    column_list: Vec<String>,
}

/// Generator backed by an HTTP Responses endpoint.
pub struct AssistedGenerator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    target_schema: String,
    create_or_replace: bool,
}

impl AssistedGenerator {
    /// Build from the `assist` config section. Fails when no API key is available.
    pub fn from_config(
        config: &AssistConfig,
        target_schema: &str,
        create_or_replace: bool,
    ) -> Result<Self> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            MigrateError::Config(format!(
                "assist is enabled but no api_key is set and {} is empty",
                crate::config::ASSIST_API_KEY_ENV
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MigrateError::Generator(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            target_schema: target_schema.to_string(),
            create_or_replace,
        })
    }

    fn request_body(&self, table: &TableDefinition) -> Result<Value> {
        let payload = TablePayload {
            table: &table.table,
            target_schema: &self.target_schema,
            create_or_replace: self.create_or_replace,
            oracle_columns: table
                .columns
                .iter()
                .map(|c| ColumnPayload {
                    name: &c.name,
                    oracle_type: &c.source_type,
                    data_length: c.length,
                    precision: c.precision,
                    scale: c.scale,
                    nullable: c.nullable,
                })
                .collect(),
            mapping_guide: MAPPING_GUIDE,
            requirements: REQUIREMENTS,
        };

        Ok(serde_json::json!({
            "model": self.model,
            "instructions": INSTRUCTIONS,
            "input": serde_json::to_string_pretty(&payload)?,
        }))
    }
}

/// Collect the model's text from a Responses API body.
fn response_text(body: &Value) -> Option<String> {
    if let Some(text) = body.get("output_text").and_then(Value::as_str) {
        return Some(text.to_string());
    }
    let mut text = String::new();
    for item in body.get("output")?.as_array()? {
        let Some(content) = item.get("content").and_then(Value::as_array) else {
            continue;
        };
        for part in content {
            if part.get("type").and_then(Value::as_str) == Some("output_text") {
                if let Some(t) = part.get("text").and_then(Value::as_str) {
                    text.push_str(t);
                }
            }
        }
    }
    (!text.is_empty()).then_some(text)
}

/// Remove a surrounding markdown code fence, if any.
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse and check the model's answer against the table it describes.
fn parse_answer(text: &str, table: &TableDefinition) -> Result<GeneratedDdl> {
    let answer: AssistedAnswer = serde_json::from_str(strip_fence(text))
        .map_err(|e| MigrateError::Generator(format!("answer is not the expected JSON: {}", e)))?;

    let sql = answer
        .create_table_sql
        .trim()
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
        .to_string();
    if sql.is_empty() {
        return Err(MigrateError::Generator("create_table_sql is empty".into()));
    }
    if !sql.to_ascii_uppercase().starts_with("CREATE") {
        return Err(MigrateError::Generator(
            "create_table_sql is not a CREATE statement".into(),
        ));
    }
    if sql.contains(';') {
        return Err(MigrateError::Generator(
            "create_table_sql holds more than one statement".into(),
        ));
    }

    if answer.column_list.len() != table.columns.len()
        || answer.column_list.iter().any(|c| c.trim().is_empty())
    {
        return Err(MigrateError::Generator(format!(
            "column_list has {} entries, table {} has {} columns",
            answer.column_list.len(),
            table.table,
            table.columns.len()
        )));
    }

    Ok(GeneratedDdl {
        sql,
        columns: answer.column_list,
    })
}

#[async_trait]
impl DdlGenerator for AssistedGenerator {
    fn name(&self) -> &str {
        "assisted"
    }

    async fn generate(&self, table: &TableDefinition) -> Result<GeneratedDdl> {
        let body = self.request_body(table)?;
        debug!("Requesting definition for {} from {}", table.table, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MigrateError::Generator(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MigrateError::Generator(format!(
                "service returned {}: {}",
                status, text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| MigrateError::Generator(format!("unreadable response: {}", e)))?;
        let text = response_text(&body)
            .ok_or_else(|| MigrateError::Generator("response carries no output text".into()))?;

        parse_answer(&text, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ColumnDescriptor;

    fn table() -> TableDefinition {
        TableDefinition {
            table: "DEPT".into(),
            columns: vec![
                ColumnDescriptor::new("DEPTNO", "NUMBER").with_precision(2, 0).not_null(),
                ColumnDescriptor::new("DNAME", "VARCHAR2").with_length(14),
            ],
        }
    }

    #[test]
    fn test_response_text_from_output_items() {
        let body = serde_json::json!({
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "{\"a\":"},
                    {"type": "output_text", "text": "1}"}
                ]}
            ]
        });
        assert_eq!(response_text(&body).as_deref(), Some("{\"a\":1}"));
        assert_eq!(response_text(&serde_json::json!({"output": []})), None);
    }

    #[test]
    fn test_parse_answer_strips_terminator() {
        let text = r#"{"create_table_sql": "CREATE TABLE DEPT (DEPTNO NUMBER(2,0) NOT NULL, DNAME VARCHAR(14));", "column_list": ["DEPTNO", "DNAME"]}"#;
        let ddl = parse_answer(text, &table()).unwrap();
        assert_eq!(
            ddl.sql,
            "CREATE TABLE DEPT (DEPTNO NUMBER(2,0) NOT NULL, DNAME VARCHAR(14))"
        );
        assert_eq!(ddl.columns, vec!["DEPTNO", "DNAME"]);
    }

    #[test]
    fn test_parse_answer_accepts_fenced_json() {
        let text = "```json\n{\"create_table_sql\": \"CREATE TABLE DEPT (A INT, B INT)\", \"column_list\": [\"A\", \"B\"]}\n```";
        assert!(parse_answer(text, &table()).is_ok());
    }

    #[test]
    fn test_parse_answer_rejects_bad_answers() {
        let missing = r#"{"create_table_sql": "CREATE TABLE DEPT (A INT)"}"#;
        assert!(parse_answer(missing, &table()).is_err());

        let wrong_count = r#"{"create_table_sql": "CREATE TABLE DEPT (A INT)", "column_list": ["A"]}"#;
        assert!(parse_answer(wrong_count, &table()).is_err());

        let two_statements = r#"{"create_table_sql": "CREATE TABLE DEPT (A INT, B INT); DROP TABLE X", "column_list": ["A", "B"]}"#;
        assert!(parse_answer(two_statements, &table()).is_err());

        assert!(parse_answer("not json", &table()).is_err());
    }
}
