//! Query Pipeline
//!
//! Generate → execute → repair loop for one question. Execution failures are
//! contained and fed back to the model up to `max_retries` times; completion
//! service failures abort the run.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::execution::{QueryEngine, QueryResult, Record};
use crate::execution_loop::error_classifier::{ErrorClassifier, SqlErrorClass};
use crate::llm::{strip_code_fences, CompletionOptions, CompletionService};
use crate::prompts;
use crate::relevance::select_relevant;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_PREVIEW_ROWS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Generating,
    Executing,
    Repairing,
    Success,
    Exhausted,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Generating => "generating",
            PipelineState::Executing => "executing",
            PipelineState::Repairing => "repairing",
            PipelineState::Success => "success",
            PipelineState::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// Transient state of a single `answer` call.
#[derive(Debug)]
struct RunState {
    question: String,
    state: PipelineState,
    current_sql: String,
    retry_count: usize,
    last_error: Option<String>,
}

impl RunState {
    fn new(question: &str) -> Self {
        Self {
            question: question.to_string(),
            state: PipelineState::Generating,
            current_sql: String::new(),
            retry_count: 0,
            last_error: None,
        }
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = %self.state, to = %next, retry = self.retry_count, "pipeline transition");
        self.state = next;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerOutcome {
    Answered,
    Exhausted,
}

/// One failed execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairAttempt {
    pub sql: String,
    pub error: String,
    pub class: SqlErrorClass,
}

/// Result of answering one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub sql: String,
    /// Preview records, at most `preview_rows`.
    pub rows: Vec<Record>,
    pub total_rows: usize,
    pub answer: String,
    pub outcome: AnswerOutcome,
    pub attempts: Vec<RepairAttempt>,
}

pub struct QueryPipeline {
    max_retries: usize,
    preview_rows: usize,
    classifier: ErrorClassifier,
}

impl Default for QueryPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_PREVIEW_ROWS)
    }
}

impl QueryPipeline {
    pub fn new(max_retries: usize, preview_rows: usize) -> Self {
        Self {
            max_retries,
            preview_rows,
            classifier: ErrorClassifier::new(),
        }
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Answer `question` against the relevant part of `catalog`.
    ///
    /// Returns `Ok` with [`AnswerOutcome::Exhausted`] when every repair failed;
    /// `Err` only when the completion service fails.
    pub async fn answer(
        &self,
        llm: &dyn CompletionService,
        engine: &mut dyn QueryEngine,
        catalog: &Catalog,
        question: &str,
    ) -> Result<Answer> {
        let run_id = Uuid::new_v4();
        let span = info_span!("answer", run_id = %run_id);
        self.run(llm, engine, catalog, question).instrument(span).await
    }

    async fn run(
        &self,
        llm: &dyn CompletionService,
        engine: &mut dyn QueryEngine,
        catalog: &Catalog,
        question: &str,
    ) -> Result<Answer> {
        info!(question, "answering question");
        let schema = select_relevant(catalog, question);
        let options = CompletionOptions::default();
        let mut run = RunState::new(question);
        let mut attempts = Vec::new();

        let messages = prompts::sql_generation_messages(question, &schema);
        run.current_sql = strip_code_fences(&llm.complete(&messages, &options).await?);
        debug!(sql = %run.current_sql, "generated SQL");

        loop {
            run.transition(PipelineState::Executing);
            let error = match engine.execute(&run.current_sql) {
                Ok(result) => {
                    run.transition(PipelineState::Success);
                    return self.narrate(llm, &options, run, result, attempts).await;
                }
                Err(error) => error,
            };

            let class = self.classifier.classify(&error);
            warn!(class = %class, retry = run.retry_count, "query failed: {}", error);
            attempts.push(RepairAttempt {
                sql: run.current_sql.clone(),
                error: error.message.clone(),
                class,
            });
            run.last_error = Some(error.message);

            if run.retry_count >= self.max_retries {
                run.transition(PipelineState::Exhausted);
                return Ok(self.exhausted(run, attempts));
            }

            run.retry_count += 1;
            run.transition(PipelineState::Repairing);
            let messages = prompts::sql_repair_messages(
                &run.question,
                &schema,
                &run.current_sql,
                run.last_error.as_deref().unwrap_or_default(),
            );
            run.current_sql = strip_code_fences(&llm.complete(&messages, &options).await?);
            debug!(sql = %run.current_sql, attempt = run.retry_count, "repaired SQL");
        }
    }

    async fn narrate(
        &self,
        llm: &dyn CompletionService,
        options: &CompletionOptions,
        run: RunState,
        result: QueryResult,
        attempts: Vec<RepairAttempt>,
    ) -> Result<Answer> {
        let rows = result.records(self.preview_rows);
        info!(total_rows = result.row_count(), repairs = run.retry_count, "query succeeded");

        let messages = prompts::answer_narration_messages(&run.question, &run.current_sql, &rows);
        let answer = llm.complete(&messages, options).await?;

        Ok(Answer {
            question: run.question,
            sql: run.current_sql,
            rows,
            total_rows: result.row_count(),
            answer: answer.trim().to_string(),
            outcome: AnswerOutcome::Answered,
            attempts,
        })
    }

    fn exhausted(&self, run: RunState, attempts: Vec<RepairAttempt>) -> Answer {
        let last_error = run.last_error.unwrap_or_default();
        warn!(repairs = self.max_retries, "giving up: {}", last_error);
        Answer {
            question: run.question,
            sql: run.current_sql,
            rows: Vec::new(),
            total_rows: 0,
            answer: format!(
                "Failed to construct a valid query after {} repair attempts. Last error: {}",
                self.max_retries, last_error
            ),
            outcome: AnswerOutcome::Exhausted,
            attempts,
        }
    }
}
