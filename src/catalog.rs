//! Schema catalog: live table introspection merged with annotations.
//!
//! The catalog is built once per session from whatever tables the engine
//! holds at that moment and is never mutated afterwards.

use crate::annotation::{AnnotationDocument, TableAnnotation};
use crate::error::Result;
use crate::execution::QueryEngine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Distinct sample values collected per column.
pub const SAMPLE_VALUE_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: String,
    pub description: Option<String>,
    pub sample_values: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub columns: Vec<ColumnDescriptor>,
}

/// Table descriptors keyed by name, in the engine's listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    tables: Vec<TableDescriptor>,
}

impl Catalog {
    pub fn new(tables: Vec<TableDescriptor>) -> Self {
        Self { tables }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDescriptor> {
        self.tables.iter()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Sub-catalog of the tables accepted by `keep`, order preserved.
    pub fn filtered<F>(&self, mut keep: F) -> Catalog
    where
        F: FnMut(&TableDescriptor) -> bool,
    {
        Catalog::new(self.tables.iter().filter(|t| keep(t)).cloned().collect())
    }

    /// `{table: {name, description, columns: [...]}}` in catalog order.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut doc = serde_json::Map::new();
        for table in &self.tables {
            doc.insert(table.name.clone(), serde_json::to_value(table)?);
        }
        Ok(serde_json::Value::Object(doc))
    }
}

/// Write the catalog as pretty JSON. Debug artifact only; never read back.
pub fn save_catalog_json(catalog: &Catalog, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(&catalog.to_json()?)?;
    std::fs::write(path, text)?;
    info!(path = %path.display(), tables = catalog.len(), "catalog saved");
    Ok(())
}

/// Builds a [`Catalog`] from a live engine and an annotation document.
pub struct CatalogBuilder {
    annotation_path: PathBuf,
    include_samples: bool,
}

impl CatalogBuilder {
    pub fn new(annotation_path: impl Into<PathBuf>) -> Self {
        Self {
            annotation_path: annotation_path.into(),
            include_samples: true,
        }
    }

    pub fn include_samples(mut self, include: bool) -> Self {
        self.include_samples = include;
        self
    }

    /// Load the annotation document from disk and build.
    pub fn build(&self, engine: &mut dyn QueryEngine) -> Result<Catalog> {
        let annotations = AnnotationDocument::load(&self.annotation_path)?;
        self.build_with(engine, &annotations)
    }

    /// Build against an already-parsed annotation document.
    pub fn build_with(
        &self,
        engine: &mut dyn QueryEngine,
        annotations: &AnnotationDocument,
    ) -> Result<Catalog> {
        info!("Building catalog...");
        let by_table = annotations.by_table_name()?;

        let mut tables = Vec::new();
        for table in engine.list_tables()? {
            let annotation = by_table.get(&table).copied();
            tables.push(self.describe(engine, &table, annotation)?);
        }

        info!(tables = tables.len(), "catalog built");
        Ok(Catalog::new(tables))
    }

    fn describe(
        &self,
        engine: &mut dyn QueryEngine,
        table: &str,
        annotation: Option<&TableAnnotation>,
    ) -> Result<TableDescriptor> {
        debug!(table, "processing table");
        if annotation.is_none() {
            warn!("No annotation found for table '{}'", table);
        }

        let column_notes: HashMap<&str, Option<&String>> = annotation
            .map(|a| {
                a.columns
                    .iter()
                    .map(|c| (c.name.as_str(), c.description.as_ref()))
                    .collect()
            })
            .unwrap_or_default();

        let mut columns = Vec::new();
        for live in engine.describe_table(table)? {
            let sample_values = if self.include_samples {
                Some(
                    engine
                        .sample_values(table, &live.name, SAMPLE_VALUE_LIMIT)
                        .unwrap_or_else(|e| {
                            warn!("Could not get sample values for {}.{}: {}", table, live.name, e);
                            Vec::new()
                        }),
                )
            } else {
                None
            };

            columns.push(ColumnDescriptor {
                description: column_notes.get(live.name.as_str()).copied().flatten().cloned(),
                name: live.name,
                declared_type: live.data_type,
                sample_values,
            });
        }

        Ok(TableDescriptor {
            name: table.to_string(),
            description: annotation.and_then(|a| a.description.clone()),
            columns,
        })
    }
}
