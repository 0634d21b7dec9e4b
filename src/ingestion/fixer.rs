//! Model-assisted repair of CSV files whose data rows are wider than the header.
//!
//! The model picks one data-row column index to drop. The original file is
//! kept next to the repaired one as `<file>.csv.backup`.

use crate::annotation::AnnotationDocument;
use crate::error::{QaError, Result};
use crate::ingestion::validator::raw_reader;
use crate::llm::{strip_code_fences, CompletionOptions, CompletionService};
use crate::prompts;
use serde::Deserialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Data rows shown to the model.
pub const FIX_SAMPLE_ROWS: usize = 5;

const FIX_TEMPERATURE: f32 = 0.2;

/// The model's answer: which data-row column to drop and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixDecision {
    pub column_index_to_remove: usize,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
struct RawDecision {
    column_index_to_remove: Option<i64>,
    reason: Option<String>,
}

impl FixDecision {
    /// Parse a model response; `sample_width` is the widest sampled row.
    pub fn parse(response: &str, sample_width: usize) -> Result<Self> {
        let raw: RawDecision = serde_json::from_str(&strip_code_fences(response))
            .map_err(|e| QaError::FixParse(format!("response is not valid JSON: {}", e)))?;

        let index = raw
            .column_index_to_remove
            .ok_or_else(|| QaError::FixParse("response missing column_index_to_remove".to_string()))?;

        match usize::try_from(index) {
            Ok(index) if index < sample_width => Ok(Self {
                column_index_to_remove: index,
                reason: raw.reason,
            }),
            _ => Err(QaError::FixParse(format!(
                "column index {} is outside the sampled rows ({} columns)",
                index, sample_width
            ))),
        }
    }
}

/// `<dir>/orders.csv` -> `<dir>/orders.csv.backup`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".backup");
    PathBuf::from(name)
}

pub struct CsvFixer<'a> {
    llm: &'a dyn CompletionService,
    annotations: AnnotationDocument,
}

impl<'a> CsvFixer<'a> {
    pub fn new(llm: &'a dyn CompletionService, annotations: AnnotationDocument) -> Self {
        Self { llm, annotations }
    }

    /// Ask the model for a fix and rewrite `path` in place. Returns the number
    /// of rows changed.
    pub async fn fix(&self, path: &Path) -> Result<usize> {
        info!("Attempting model-assisted CSV fix for {}", path.display());

        let table = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let annotation = self.annotations.for_table(&table).ok_or_else(|| {
            QaError::IngestStructural(format!("no annotation found for table '{}'", table))
        })?;

        let (header, rows) = read_sample(path, FIX_SAMPLE_ROWS)?;
        if rows.is_empty() {
            return Err(QaError::IngestStructural("no data rows to analyze".to_string()));
        }

        let messages = prompts::csv_fix_messages(&header, &rows, annotation);
        let response = self
            .llm
            .complete(&messages, &CompletionOptions::with_temperature(FIX_TEMPERATURE))
            .await?;

        let sample_width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let decision = FixDecision::parse(&response, sample_width)?;
        info!(
            "Model decision: remove column {} ({})",
            decision.column_index_to_remove,
            decision.reason.as_deref().unwrap_or("no reason given")
        );

        let backup = backup_path(path);
        fs::rename(path, &backup)?;
        info!("Created backup: {}", backup.display());

        let fixed = rewrite_without_column(&backup, path, decision.column_index_to_remove)?;
        info!("Fixed {} rows, saved to {}", fixed, path.display());
        Ok(fixed)
    }
}

fn read_sample(path: &Path, limit: usize) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = raw_reader(File::open(path)?);
    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record?.iter().map(str::to_string).collect(),
        None => return Err(QaError::IngestStructural("CSV file is empty".to_string())),
    };

    let mut rows = Vec::new();
    for record in records.take(limit) {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok((header, rows))
}

/// Copy `source` to `target`, dropping `index` from every row wider than the
/// header. The header and other rows are copied as their source bytes, so
/// quoting and line endings outside the rewritten rows are preserved.
fn rewrite_without_column(source: &Path, target: &Path, index: usize) -> Result<usize> {
    let input = fs::read(source)?;
    let mut reader = raw_reader(input.as_slice());
    let mut output = Vec::with_capacity(input.len());
    let mut record = csv::ByteRecord::new();

    let mut header_len = None;
    let mut fixed = 0;
    let mut start = 0;
    while reader.read_byte_record(&mut record)? {
        let end = reader.position().byte() as usize;
        let raw = &input[start..end];
        start = end;

        let width = *header_len.get_or_insert(record.len());
        if record.len() <= width {
            output.extend_from_slice(raw);
            continue;
        }

        // Keep the surrounding line breaks, re-serialize only the fields
        let (leading, trailing) = line_break_edges(raw);
        output.extend_from_slice(&raw[..leading]);
        output.extend_from_slice(&serialize_without(&record, index)?);
        output.extend_from_slice(&raw[raw.len() - trailing..]);
        fixed += 1;
    }
    output.extend_from_slice(&input[start..]);

    fs::write(target, output)?;
    if fixed == 0 {
        warn!("no rows wider than the header in {}", source.display());
    }
    Ok(fixed)
}

/// Lengths of the line-break runs at the start and end of a raw record slice.
fn line_break_edges(raw: &[u8]) -> (usize, usize) {
    let is_break = |b: &u8| *b == b'\r' || *b == b'\n';
    let leading = raw.iter().take_while(|b| is_break(b)).count();
    let trailing = raw[leading..].iter().rev().take_while(|b| is_break(b)).count();
    (leading, trailing)
}

/// One CSV row without `index` and without a terminator.
fn serialize_without(record: &csv::ByteRecord, index: usize) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(
        record
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, field)| field),
    )?;
    let mut bytes = writer.into_inner().map_err(|e| QaError::Io(e.into_error()))?;
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    Ok(bytes)
}
