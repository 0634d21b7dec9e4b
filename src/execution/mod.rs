//! Execution Module - query engine boundary and the embedded polars engine

pub mod engine;
pub mod polars_engine;
pub mod result;

pub use engine::{quote_ident, value_to_text, ColumnSchema, QueryEngine, TableLoader};
pub use polars_engine::PolarsEngine;
pub use result::{QueryResult, Record};
