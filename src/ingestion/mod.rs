//! Ingestion - CSV validation, model-assisted repair and table loading

pub mod fixer;
pub mod loader;
pub mod validator;

pub use fixer::{backup_path, CsvFixer, FixDecision};
pub use loader::{DataLoader, IngestReport, LoadedTable};
pub use validator::{validate_csv_structure, CsvValidation, DEFAULT_CHECK_ROWS};
