//! Query Result - tabular output of a successful statement

use crate::error::{QaError, Result};
use crate::execution::engine::value_to_text;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// A row as an ordered column -> value object.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Columns plus row-major values of a successful query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The first `limit` rows as records keyed by column name.
    pub fn records(&self, limit: usize) -> Vec<Record> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect::<Record>()
            })
            .collect()
    }

    /// Convert a collected DataFrame.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let series: Vec<&Series> = df.get_columns().iter().collect();
        let mut rows = Vec::with_capacity(df.height());
        for row_idx in 0..df.height() {
            let mut row = Vec::with_capacity(series.len());
            for s in &series {
                row.push(series_to_json_value(s, row_idx)?);
            }
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    /// Rebuild a result from records; columns follow the first record's keys.
    pub fn from_records(records: &[Record]) -> Self {
        let columns: Vec<String> = records
            .first()
            .map(|record| record.keys().cloned().collect())
            .unwrap_or_default();
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).cloned().unwrap_or(serde_json::Value::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    /// Convert back to a DataFrame, one typed column per result column.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let series: Vec<Series> = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let values: Vec<&serde_json::Value> = self
                    .rows
                    .iter()
                    .map(|row| row.get(idx).unwrap_or(&serde_json::Value::Null))
                    .collect();
                column_to_series(name, &values)
            })
            .collect();
        DataFrame::new(series).map_err(|e| QaError::Polars(format!("Failed to build DataFrame: {}", e)))
    }
}

/// Int64, Float64 or Boolean when every non-null value fits, String otherwise.
fn column_to_series(name: &str, values: &[&serde_json::Value]) -> Series {
    let present = || values.iter().filter(|v| !v.is_null());

    if present().all(|v| v.is_i64()) {
        let data: Vec<Option<i64>> = values.iter().map(|v| v.as_i64()).collect();
        Series::new(name, data)
    } else if present().all(|v| v.is_number()) {
        let data: Vec<Option<f64>> = values.iter().map(|v| v.as_f64()).collect();
        Series::new(name, data)
    } else if present().all(|v| v.is_boolean()) {
        let data: Vec<Option<bool>> = values.iter().map(|v| v.as_bool()).collect();
        Series::new(name, data)
    } else {
        let data: Vec<Option<String>> = values
            .iter()
            .map(|v| (!v.is_null()).then(|| value_to_text(v)))
            .collect();
        Series::new(name, data)
    }
}

fn series_to_json_value(series: &Series, row_idx: usize) -> Result<serde_json::Value> {
    let any_val = series
        .get(row_idx)
        .map_err(|e| QaError::Polars(format!("Failed to get value: {}", e)))?;

    Ok(match any_val {
        AnyValue::Null => serde_json::Value::Null,
        AnyValue::Boolean(b) => serde_json::Value::Bool(b),
        AnyValue::String(s) => serde_json::Value::String(s.to_string()),
        AnyValue::StringOwned(s) => serde_json::Value::String(s.to_string()),
        AnyValue::Int8(i) => serde_json::Value::Number(i.into()),
        AnyValue::Int16(i) => serde_json::Value::Number(i.into()),
        AnyValue::Int32(i) => serde_json::Value::Number(i.into()),
        AnyValue::Int64(i) => serde_json::Value::Number(i.into()),
        AnyValue::UInt8(u) => serde_json::Value::Number(u.into()),
        AnyValue::UInt16(u) => serde_json::Value::Number(u.into()),
        AnyValue::UInt32(u) => serde_json::Value::Number(u.into()),
        AnyValue::UInt64(u) => serde_json::Value::Number(u.into()),
        AnyValue::Float32(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        AnyValue::Float64(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        // Dates, timestamps and the rest keep polars' display form
        other => serde_json::Value::String(other.to_string()),
    })
}
