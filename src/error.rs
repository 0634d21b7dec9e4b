use thiserror::Error;

#[derive(Error, Debug)]
pub enum QaError {
    #[error("Annotation error: {0}")]
    Annotation(String),

    #[error("CSV structure error: {0}")]
    IngestStructural(String),

    #[error("Completion service error: {0}")]
    Completion(String),

    #[error("Query execution error: {0}")]
    QueryExecution(#[from] ExecutionError),

    #[error("Fix response error: {0}")]
    FixParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::error::PolarsError> for QaError {
    fn from(err: polars::error::PolarsError) -> Self {
        QaError::Polars(err.to_string())
    }
}

/// Failure reported by the query engine for a single SQL statement.
///
/// Displays as the engine's message verbatim so it can be embedded in
/// repair prompts unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecutionError {
    pub message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QaError>;
