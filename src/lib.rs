pub mod annotation;
pub mod catalog;
pub mod config;
pub mod error;
pub mod execution;
pub mod execution_loop;
pub mod ingestion;
pub mod llm;
pub mod prompts;
pub mod relevance;
pub mod session;

pub use catalog::{Catalog, CatalogBuilder};
pub use error::{ExecutionError, QaError, Result};
pub use execution_loop::{Answer, AnswerOutcome, QueryPipeline};
pub use session::Session;
