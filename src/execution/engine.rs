//! Query Engine Trait - the contract between the pipeline and the SQL engine
//!
//! The pipeline only needs four things from an engine: list tables, describe
//! a table, sample distinct values and run ad-hoc SQL. Loading CSV files into
//! tables is a separate capability used at ingestion time.

use crate::error::{ExecutionError, Result};
use crate::execution::result::QueryResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Live column name and engine-reported type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

pub trait QueryEngine {
    /// Table names in the engine's native listing order.
    fn list_tables(&self) -> Result<Vec<String>>;

    /// Column name/type pairs in schema order.
    fn describe_table(&mut self, table: &str) -> Result<Vec<ColumnSchema>>;

    /// Run one SQL statement. Failures carry the engine's message verbatim.
    fn execute(&mut self, sql: &str) -> std::result::Result<QueryResult, ExecutionError>;

    /// Up to `limit` distinct non-null values of a column, rendered as text.
    fn sample_values(&mut self, table: &str, column: &str, limit: usize) -> Result<Vec<String>> {
        let column = quote_ident(column);
        let sql = format!(
            "SELECT DISTINCT {column} FROM {table} WHERE {column} IS NOT NULL LIMIT {limit}",
            table = quote_ident(table),
        );
        let result = self.execute(&sql)?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| row.first())
            .map(value_to_text)
            .collect())
    }
}

/// Engines that can materialize a CSV file as a table.
pub trait TableLoader {
    /// Create or replace `table` from the CSV at `path`; returns the row count.
    fn load_csv(&mut self, table: &str, path: &Path) -> Result<usize>;
}

/// Double-quote an identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a result cell the way it reads in a prompt: strings unquoted.
pub fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("Order Date"), "\"Order Date\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&serde_json::json!("x")), "x");
        assert_eq!(value_to_text(&serde_json::json!(42)), "42");
        assert_eq!(value_to_text(&serde_json::json!(true)), "true");
    }
}
