//! Annotation document: human-authored table and column descriptions.
//!
//! The document is JSON with a `dataframes` root mapping an arbitrary key to
//! an entry whose `path` names the source file. The table an entry describes
//! is the file stem of that path.

use crate::error::{QaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAnnotation {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableAnnotation {
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnAnnotation>,
}

impl TableAnnotation {
    /// Table name derived from `path` (directory and extension stripped).
    pub fn table_name(&self) -> String {
        table_name_from_path(&self.path)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnAnnotation> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationDocument {
    #[serde(default)]
    pub dataframes: BTreeMap<String, TableAnnotation>,
}

impl AnnotationDocument {
    /// Read and parse an annotation document.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            QaError::Annotation(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&text).map_err(|e| match e {
            QaError::Annotation(msg) => QaError::Annotation(format!("{} ({})", msg, path.display())),
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| QaError::Annotation(format!("malformed annotation document: {}", e)))
    }

    /// Index entries by derived table name.
    ///
    /// Two keys deriving the same table name are rejected rather than
    /// resolved by iteration order.
    pub fn by_table_name(&self) -> Result<HashMap<String, &TableAnnotation>> {
        let mut index: HashMap<String, (&str, &TableAnnotation)> = HashMap::new();
        for (key, entry) in &self.dataframes {
            let table = entry.table_name();
            if let Some((previous_key, _)) = index.get(&table) {
                return Err(QaError::Annotation(format!(
                    "annotation keys '{}' and '{}' both describe table '{}'",
                    previous_key, key, table
                )));
            }
            index.insert(table, (key.as_str(), entry));
        }
        Ok(index.into_iter().map(|(table, (_, entry))| (table, entry)).collect())
    }

    /// Find the entry describing `table`, if any.
    pub fn for_table(&self, table: &str) -> Option<&TableAnnotation> {
        self.dataframes.values().find(|entry| entry.table_name() == table)
    }
}

/// `dataframes/B2B_weather.csv` -> `B2B_weather`
pub fn table_name_from_path(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
