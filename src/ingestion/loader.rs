//! Data Loader - validate, optionally repair, and load every CSV in a directory

use crate::error::{QaError, Result};
use crate::execution::TableLoader;
use crate::ingestion::fixer::CsvFixer;
use crate::ingestion::validator::{validate_csv_structure, CsvValidation, DEFAULT_CHECK_ROWS};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedTable {
    pub name: String,
    pub rows: usize,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub loaded: usize,
    pub skipped: usize,
    pub tables: Vec<LoadedTable>,
}

pub struct DataLoader<'a> {
    data_dir: PathBuf,
    fixer: Option<CsvFixer<'a>>,
}

impl<'a> DataLoader<'a> {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            fixer: None,
        }
    }

    /// Enable auto-fix of malformed files.
    pub fn with_fixer(mut self, fixer: CsvFixer<'a>) -> Self {
        self.fixer = Some(fixer);
        self
    }

    /// `*.csv` files in the data directory, sorted by path.
    pub fn csv_files(&self) -> Result<Vec<PathBuf>> {
        if !self.data_dir.is_dir() {
            return Err(QaError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Data directory not found: {}", self.data_dir.display()),
            )));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.data_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("csv"))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Load every CSV into `engine`, one table per file stem. Per-file
    /// failures are logged and counted as skipped.
    pub async fn load(&self, engine: &mut dyn TableLoader) -> Result<IngestReport> {
        let files = self.csv_files()?;
        let mut report = IngestReport::default();

        if files.is_empty() {
            warn!("No CSV files found in {}", self.data_dir.display());
            return Ok(report);
        }
        info!("Found {} CSV file(s) in {}", files.len(), self.data_dir.display());

        for (idx, path) in files.iter().enumerate() {
            let table = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            info!("[{}/{}] Validating '{}'...", idx + 1, files.len(), table);

            if !self.ensure_valid(&table, path).await {
                report.skipped += 1;
                continue;
            }

            match engine.load_csv(&table, path) {
                Ok(rows) => {
                    info!("Loaded '{}' successfully ({} rows)", table, rows);
                    report.loaded += 1;
                    report.tables.push(LoadedTable { name: table, rows });
                }
                Err(e) => {
                    error!("Failed to load '{}': {}", table, e);
                    report.skipped += 1;
                }
            }
        }

        info!("Summary: {} tables loaded, {} skipped", report.loaded, report.skipped);
        Ok(report)
    }

    /// Validate, attempting one fix when enabled. `true` when the file may be loaded.
    async fn ensure_valid(&self, table: &str, path: &Path) -> bool {
        let message = match validate_csv_structure(path, DEFAULT_CHECK_ROWS) {
            CsvValidation::Valid => return true,
            CsvValidation::Invalid(message) => message,
        };
        error!("CSV validation failed for '{}': {}", table, message);

        let Some(fixer) = &self.fixer else {
            return false;
        };

        if let Err(e) = fixer.fix(path).await {
            error!("Could not auto-fix '{}', skipping: {}", table, e);
            return false;
        }

        match validate_csv_structure(path, DEFAULT_CHECK_ROWS) {
            CsvValidation::Valid => {
                info!("CSV fixed successfully, now loading '{}'", table);
                true
            }
            CsvValidation::Invalid(message) => {
                error!("Fix failed validation for '{}': {}", table, message);
                false
            }
        }
    }
}
