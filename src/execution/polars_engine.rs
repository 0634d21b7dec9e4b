//! Polars Execution Engine
//!
//! Tables live in a store directory as one parquet file per table. Opening
//! the store registers every file with a polars `SQLContext`; ad-hoc SQL runs
//! against that context.

use crate::error::{ExecutionError, Result};
use crate::execution::engine::{ColumnSchema, QueryEngine, TableLoader};
use crate::execution::result::QueryResult;
use polars::prelude::*;
use polars::sql::SQLContext;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PARQUET_EXTENSION: &str = "parquet";

/// Embedded SQL engine over a parquet table store.
pub struct PolarsEngine {
    store_dir: PathBuf,
    context: SQLContext,
    /// Registered tables in registration order.
    tables: Vec<(String, LazyFrame)>,
}

impl PolarsEngine {
    /// Open (creating if needed) the table store and register its tables.
    pub fn open(store_dir: impl Into<PathBuf>) -> Result<Self> {
        let store_dir = store_dir.into();
        fs::create_dir_all(&store_dir)?;

        let mut files: Vec<PathBuf> = fs::read_dir(&store_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(PARQUET_EXTENSION))
            .collect();
        files.sort();

        let mut engine = Self {
            store_dir,
            context: SQLContext::new(),
            tables: Vec::new(),
        };

        for path in files {
            let Some(table) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let frame = LazyFrame::scan_parquet(&path, ScanArgsParquet::default())?;
            engine.register(&table, frame);
        }

        info!(
            store = %engine.store_dir.display(),
            tables = engine.tables.len(),
            "opened table store"
        );
        Ok(engine)
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    fn register(&mut self, table: &str, frame: LazyFrame) {
        self.context.register(table, frame.clone());
        match self.tables.iter_mut().find(|(name, _)| name == table) {
            Some(existing) => existing.1 = frame,
            None => self.tables.push((table.to_string(), frame)),
        }
    }

    fn frame(&self, table: &str) -> Result<&LazyFrame> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, frame)| frame)
            .ok_or_else(|| ExecutionError::new(format!("Table not found: {}", table)).into())
    }
}

impl QueryEngine for PolarsEngine {
    fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.iter().map(|(name, _)| name.clone()).collect())
    }

    fn describe_table(&mut self, table: &str) -> Result<Vec<ColumnSchema>> {
        let empty = self.frame(table)?.clone().limit(0).collect()?;
        Ok(empty
            .get_columns()
            .iter()
            .map(|s| ColumnSchema::new(s.name(), sql_type_name(s.dtype())))
            .collect())
    }

    fn execute(&mut self, sql: &str) -> std::result::Result<QueryResult, ExecutionError> {
        debug!(sql, "executing");
        let df = self
            .context
            .execute(sql)
            .and_then(|frame| frame.collect())
            .map_err(|e| ExecutionError::new(e.to_string()))?;
        QueryResult::from_dataframe(&df).map_err(|e| ExecutionError::new(e.to_string()))
    }
}

impl TableLoader for PolarsEngine {
    fn load_csv(&mut self, table: &str, path: &Path) -> Result<usize> {
        let mut df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_try_parse_dates(true)
            .with_infer_schema_length(Some(1000))
            .finish()?
            .collect()?;

        let target = self.store_dir.join(format!("{}.{}", table, PARQUET_EXTENSION));
        let mut file = File::create(&target)?;
        ParquetWriter::new(&mut file).finish(&mut df)?;

        let frame = LazyFrame::scan_parquet(&target, ScanArgsParquet::default())?;
        self.register(table, frame);
        Ok(df.height())
    }
}

/// SQL-style name for a polars dtype, as shown to the model.
pub fn sql_type_name(dtype: &DataType) -> String {
    match dtype {
        DataType::Boolean => "BOOLEAN".to_string(),
        DataType::Int8 => "TINYINT".to_string(),
        DataType::Int16 => "SMALLINT".to_string(),
        DataType::Int32 => "INTEGER".to_string(),
        DataType::Int64 => "BIGINT".to_string(),
        DataType::UInt8 => "UTINYINT".to_string(),
        DataType::UInt16 => "USMALLINT".to_string(),
        DataType::UInt32 => "UINTEGER".to_string(),
        DataType::UInt64 => "UBIGINT".to_string(),
        DataType::Float32 => "FLOAT".to_string(),
        DataType::Float64 => "DOUBLE".to_string(),
        DataType::String => "VARCHAR".to_string(),
        DataType::Date => "DATE".to_string(),
        DataType::Datetime(_, _) => "TIMESTAMP".to_string(),
        DataType::Duration(_) => "INTERVAL".to_string(),
        DataType::Null => "NULL".to_string(),
        other => other.to_string().to_uppercase(),
    }
}
