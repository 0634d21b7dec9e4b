mod common;

use common::{orders_catalog, scratch_dir, single_column, ScriptedEngine, ScriptedLlm};
use serde_json::json;
use std::fs;
use tabular_qa::catalog::CatalogBuilder;
use tabular_qa::error::{ExecutionError, QaError};
use tabular_qa::execution::{PolarsEngine, QueryEngine, TableLoader};
use tabular_qa::execution_loop::{AnswerOutcome, QueryPipeline, SqlErrorClass};
use tabular_qa::Session;

#[tokio::test]
async fn test_first_query_succeeds() {
    let llm = ScriptedLlm::replying(&["```sql\nSELECT COUNT(*) AS n FROM orders\n```", "There are 3 orders."]);
    let mut engine = ScriptedEngine::new(vec![Ok(single_column("n", [json!(3)]))]);
    let executed = engine.executed.clone();

    let answer = QueryPipeline::default()
        .answer(&llm, &mut engine, &orders_catalog(), "how many orders are there")
        .await
        .unwrap();

    assert_eq!(answer.outcome, AnswerOutcome::Answered);
    assert_eq!(answer.sql, "SELECT COUNT(*) AS n FROM orders");
    assert_eq!(executed.lock().unwrap().as_slice(), ["SELECT COUNT(*) AS n FROM orders"]);
    assert_eq!(answer.answer, "There are 3 orders.");
    assert_eq!(answer.total_rows, 1);
    assert_eq!(answer.rows[0]["n"], json!(3));
    assert!(answer.attempts.is_empty());
    assert_eq!(llm.call_count(), 2);
    assert!((llm.temperature(0) - 0.1).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_exhausts_after_three_repairs() {
    let llm = ScriptedLlm::replying(&["SELECT a", "SELECT b", "SELECT c", "SELECT d"]);
    let mut engine = ScriptedEngine::new(vec![
        Err(ExecutionError::new("error 1")),
        Err(ExecutionError::new("error 2")),
        Err(ExecutionError::new("error 3")),
        Err(ExecutionError::new("column \"x\" not found")),
    ]);
    let executed = engine.executed.clone();

    let answer = QueryPipeline::default()
        .answer(&llm, &mut engine, &orders_catalog(), "latest order")
        .await
        .unwrap();

    assert_eq!(answer.outcome, AnswerOutcome::Exhausted);
    assert_eq!(answer.sql, "SELECT d");
    assert!(answer.rows.is_empty());
    assert_eq!(
        answer.answer,
        "Failed to construct a valid query after 3 repair attempts. Last error: column \"x\" not found"
    );
    // one generation plus three repairs; no narration call
    assert_eq!(llm.call_count(), 4);
    assert_eq!(executed.lock().unwrap().len(), 4);
    assert_eq!(answer.attempts.len(), 4);
    assert_eq!(answer.attempts[3].class, SqlErrorClass::ColumnNotFound);
}

#[tokio::test]
async fn test_repair_prompt_embeds_exact_error() {
    let error_text = "sql error: relation 'nosuchtable' was not found";
    let llm = ScriptedLlm::replying(&["SELECT * FROM nosuchtable", "SELECT * FROM orders", "One order."]);
    let mut engine = ScriptedEngine::new(vec![
        Err(ExecutionError::new(error_text)),
        Ok(single_column("order_id", [json!(1)])),
    ]);

    let answer = QueryPipeline::default()
        .answer(&llm, &mut engine, &orders_catalog(), "show orders")
        .await
        .unwrap();

    assert_eq!(answer.outcome, AnswerOutcome::Answered);
    assert_eq!(answer.sql, "SELECT * FROM orders");
    assert_eq!(answer.attempts.len(), 1);
    assert_eq!(answer.attempts[0].sql, "SELECT * FROM nosuchtable");

    let repair_prompt = llm.prompt(1);
    assert!(repair_prompt.contains("SELECT * FROM nosuchtable"));
    assert!(repair_prompt.contains(error_text));
}

#[tokio::test]
async fn test_completion_failure_during_repair_propagates() {
    let llm = ScriptedLlm::new(vec![
        Ok("SELECT nope FROM orders".to_string()),
        Err(QaError::Completion("connection reset".to_string())),
    ]);
    let mut engine = ScriptedEngine::new(vec![Err(ExecutionError::new("column not found"))]);

    let err = QueryPipeline::default()
        .answer(&llm, &mut engine, &orders_catalog(), "show orders")
        .await
        .unwrap_err();

    assert!(matches!(err, QaError::Completion(_)));
}

#[tokio::test]
async fn test_preview_capped_at_fifty_rows() {
    let llm = ScriptedLlm::replying(&["SELECT order_id FROM orders", "Many orders."]);
    let mut engine = ScriptedEngine::new(vec![Ok(single_column(
        "order_id",
        (0..120).map(|i| json!(i)),
    ))]);

    let answer = QueryPipeline::default()
        .answer(&llm, &mut engine, &orders_catalog(), "list all orders")
        .await
        .unwrap();

    assert_eq!(answer.rows.len(), 50);
    assert_eq!(answer.total_rows, 120);
    // narration sees the preview only: ten rows listed, forty more noted
    let narration = llm.prompt(1);
    assert!(narration.contains("Row 10:"));
    assert!(!narration.contains("Row 11:"));
    assert!(narration.contains("... and 40 more rows"));
}

#[tokio::test]
async fn test_generation_prompt_carries_schema() {
    let llm = ScriptedLlm::replying(&["SELECT 1", "ok"]);
    let mut engine = ScriptedEngine::new(vec![Ok(single_column("x", [json!(1)]))]);

    QueryPipeline::default()
        .answer(&llm, &mut engine, &orders_catalog(), "what is the latest order date")
        .await
        .unwrap();

    let generation = llm.prompt(0);
    assert!(generation.contains("Table: orders"));
    assert!(generation.contains("Order Date (DATE)"));
    assert!(generation.contains("what is the latest order date"));
}

#[tokio::test]
async fn test_polars_backed_session() {
    let dir = scratch_dir("session");
    let csv_path = dir.join("orders.csv");
    fs::write(
        &csv_path,
        "order_id,Order Date,amount\n1,2024-01-05,10.5\n2,2024-03-09,3.0\n3,2024-02-11,7.25\n",
    )
    .unwrap();
    let annotations = dir.join("annotation.json");
    fs::write(
        &annotations,
        r#"{"dataframes": {"orders": {
            "path": "dataframes/orders.csv",
            "description": "Customer orders",
            "columns": [{"name": "Order Date", "description": "Day the order was placed"}]
        }}}"#,
    )
    .unwrap();

    let mut engine = PolarsEngine::open(dir.join("store")).unwrap();
    engine.load_csv("orders", &csv_path).unwrap();
    let catalog = CatalogBuilder::new(&annotations).build(&mut engine).unwrap();

    let orders = catalog.get("orders").unwrap();
    assert_eq!(orders.columns[1].name, "Order Date");
    assert_eq!(orders.columns[1].description.as_deref(), Some("Day the order was placed"));
    assert_eq!(orders.columns[1].sample_values.as_ref().map(Vec::len), Some(3));

    let llm = ScriptedLlm::replying(&[
        "SELECT * FROM nosuchtable",
        "SELECT order_id, amount FROM orders ORDER BY amount DESC",
        "Order 1 has the largest amount.",
    ]);
    let mut session = Session::new(Box::new(engine), Box::new(llm.clone()), catalog);

    let answer = session.answer("which order has the largest amount").await.unwrap();

    assert_eq!(answer.outcome, AnswerOutcome::Answered);
    assert_eq!(answer.total_rows, 3);
    assert_eq!(answer.rows[0]["order_id"], json!(1));
    assert_eq!(answer.attempts.len(), 1);
    assert!(!answer.attempts[0].error.is_empty());
    assert!(llm.prompt(1).contains(&answer.attempts[0].error));
    assert!(llm.prompt(0).contains("Order Date"));

    fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_polars_engine_lists_loaded_tables() {
    let dir = scratch_dir("listing");
    fs::write(dir.join("b.csv"), "x\n1\n").unwrap();
    fs::write(dir.join("a.csv"), "y\n2\n").unwrap();

    let mut engine = PolarsEngine::open(dir.join("store")).unwrap();
    engine.load_csv("b", &dir.join("b.csv")).unwrap();
    engine.load_csv("a", &dir.join("a.csv")).unwrap();
    assert_eq!(engine.list_tables().unwrap(), vec!["b", "a"]);

    // reopened stores list tables by file name
    drop(engine);
    let engine = PolarsEngine::open(dir.join("store")).unwrap();
    assert_eq!(engine.list_tables().unwrap(), vec!["a", "b"]);

    fs::remove_dir_all(&dir).ok();
}
