#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tabular_qa::catalog::{Catalog, ColumnDescriptor, TableDescriptor};
use tabular_qa::error::{ExecutionError, QaError, Result};
use tabular_qa::execution::{ColumnSchema, QueryEngine, QueryResult};
use tabular_qa::llm::{ChatMessage, CompletionOptions, CompletionService};

/// Completion service that replays canned responses and records every call.
#[derive(Clone, Default)]
pub struct ScriptedLlm {
    responses: Arc<Mutex<VecDeque<Result<String>>>>,
    calls: Arc<Mutex<Vec<(Vec<ChatMessage>, CompletionOptions)>>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            calls: Arc::default(),
        }
    }

    pub fn replying(responses: &[&str]) -> Self {
        Self::new(responses.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Concatenated message contents of call `i`.
    pub fn prompt(&self, i: usize) -> String {
        let calls = self.calls.lock().unwrap();
        calls[i].0.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n")
    }

    pub fn temperature(&self, i: usize) -> f32 {
        self.calls.lock().unwrap()[i].1.temperature
    }
}

#[async_trait]
impl CompletionService for ScriptedLlm {
    async fn complete(&self, messages: &[ChatMessage], options: &CompletionOptions) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), options.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(QaError::Completion("script exhausted".to_string())))
    }
}

/// Engine that replays canned execution results and records submitted SQL.
#[derive(Default)]
pub struct ScriptedEngine {
    results: VecDeque<std::result::Result<QueryResult, ExecutionError>>,
    pub executed: Arc<Mutex<Vec<String>>>,
}

impl ScriptedEngine {
    pub fn new(results: Vec<std::result::Result<QueryResult, ExecutionError>>) -> Self {
        Self {
            results: results.into(),
            executed: Arc::default(),
        }
    }
}

impl QueryEngine for ScriptedEngine {
    fn list_tables(&self) -> Result<Vec<String>> {
        Ok(vec![])
    }

    fn describe_table(&mut self, _table: &str) -> Result<Vec<ColumnSchema>> {
        Ok(vec![])
    }

    fn execute(&mut self, sql: &str) -> std::result::Result<QueryResult, ExecutionError> {
        self.executed.lock().unwrap().push(sql.to_string());
        self.results
            .pop_front()
            .unwrap_or_else(|| Err(ExecutionError::new("no scripted result")))
    }
}

pub fn single_column(name: &str, values: impl IntoIterator<Item = serde_json::Value>) -> QueryResult {
    QueryResult::new(vec![name.to_string()], values.into_iter().map(|v| vec![v]).collect())
}

pub fn orders_catalog() -> Catalog {
    Catalog::new(vec![TableDescriptor {
        name: "orders".to_string(),
        description: Some("Customer orders".to_string()),
        columns: vec![
            ColumnDescriptor {
                name: "order_id".to_string(),
                declared_type: "INTEGER".to_string(),
                description: None,
                sample_values: None,
            },
            ColumnDescriptor {
                name: "Order Date".to_string(),
                declared_type: "DATE".to_string(),
                description: None,
                sample_values: None,
            },
        ],
    }])
}

/// Fresh directory under the system temp dir.
pub fn scratch_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tabular_qa_{}_{}", label, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
