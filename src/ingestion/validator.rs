//! CSV structure validation: header width against the first data rows.

use std::fs::File;
use std::path::Path;

/// Data rows inspected after the header.
pub const DEFAULT_CHECK_ROWS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvValidation {
    Valid,
    Invalid(String),
}

impl CsvValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, CsvValidation::Valid)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            CsvValidation::Valid => None,
            CsvValidation::Invalid(msg) => Some(msg),
        }
    }
}

/// Reader that accepts rows of any width and treats the header as data.
/// Blank lines are skipped and never count as rows.
pub(crate) fn raw_reader<R: std::io::Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input)
}

/// Check that the header and the first `check_rows` data rows agree on the
/// number of fields. Never fails; read errors are reported as invalid.
pub fn validate_csv_structure(path: &Path, check_rows: usize) -> CsvValidation {
    match inspect(path, check_rows) {
        Ok(validation) => validation,
        Err(e) => CsvValidation::Invalid(format!("Error reading CSV: {}", e)),
    }
}

fn inspect(path: &Path, check_rows: usize) -> Result<CsvValidation, csv::Error> {
    let mut reader = raw_reader(File::open(path)?);
    let mut records = reader.records();

    let header_count = match records.next() {
        Some(header) => header?.len(),
        None => return Ok(CsvValidation::Invalid("CSV file is empty".to_string())),
    };

    for (i, record) in records.take(check_rows).enumerate() {
        let width = record?.len();
        if width != header_count {
            return Ok(CsvValidation::Invalid(format!(
                "Column mismatch: header has {} columns, but row {} has {} columns",
                header_count,
                i + 1,
                width
            )));
        }
    }

    Ok(CsvValidation::Valid)
}
