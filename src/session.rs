//! Session - the engine, completion client and catalog behind a run of questions
//!
//! A session owns its engine exclusively. The catalog is built when the
//! session opens and stays fixed until the session is dropped.

use crate::annotation::AnnotationDocument;
use crate::catalog::{save_catalog_json, Catalog, CatalogBuilder};
use crate::config::AppConfig;
use crate::error::Result;
use crate::execution::{PolarsEngine, QueryEngine};
use crate::execution_loop::{Answer, QueryPipeline};
use crate::ingestion::{CsvFixer, DataLoader, IngestReport};
use crate::llm::CompletionService;
use std::path::PathBuf;
use tracing::{info, warn};

pub struct Session {
    engine: Box<dyn QueryEngine>,
    llm: Box<dyn CompletionService>,
    catalog: Catalog,
    pipeline: QueryPipeline,
}

impl Session {
    pub fn new(
        engine: Box<dyn QueryEngine>,
        llm: Box<dyn CompletionService>,
        catalog: Catalog,
    ) -> Self {
        Self {
            engine,
            llm,
            catalog,
            pipeline: QueryPipeline::default(),
        }
    }

    /// Open the table store and build the catalog with sample values.
    pub fn open(config: &AppConfig, llm: Box<dyn CompletionService>) -> Result<Self> {
        let mut engine = PolarsEngine::open(&config.store_dir)?;
        let catalog = CatalogBuilder::new(&config.annotations).build(&mut engine)?;
        if catalog.is_empty() {
            warn!(
                "table store {} is empty; run `refresh` to load data",
                config.store_dir.display()
            );
        }
        Ok(Self::new(Box::new(engine), llm, catalog))
    }

    pub fn with_pipeline(mut self, pipeline: QueryPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn answer(&mut self, question: &str) -> Result<Answer> {
        self.pipeline
            .answer(self.llm.as_ref(), self.engine.as_mut(), &self.catalog, question)
            .await
    }
}

/// What `refresh` did.
#[derive(Debug, Clone)]
pub struct RefreshSummary {
    pub ingest: IngestReport,
    pub store_dir: PathBuf,
    pub catalog_path: PathBuf,
    pub catalog_tables: usize,
}

/// Rebuild the table store from the data directory and write the catalog JSON.
///
/// The annotation document is read before anything is deleted; a bad document
/// leaves the existing store in place. Malformed files are repaired with `llm`
/// when one is given and an annotation describes them, otherwise skipped.
pub async fn refresh(
    config: &AppConfig,
    llm: Option<&dyn CompletionService>,
) -> Result<RefreshSummary> {
    let annotations = AnnotationDocument::load(&config.annotations)?;

    if config.store_dir.exists() {
        info!("Deleting old table store: {}", config.store_dir.display());
        std::fs::remove_dir_all(&config.store_dir)?;
    }
    let mut engine = PolarsEngine::open(&config.store_dir)?;

    let mut loader = DataLoader::new(&config.data_dir);
    match llm {
        Some(llm) => loader = loader.with_fixer(CsvFixer::new(llm, annotations.clone())),
        None => warn!("no completion service configured; malformed CSV files will be skipped"),
    }
    let ingest = loader.load(&mut engine).await?;

    let catalog = CatalogBuilder::new(&config.annotations).build_with(&mut engine, &annotations)?;
    save_catalog_json(&catalog, &config.catalog_out)?;

    Ok(RefreshSummary {
        ingest,
        store_dir: config.store_dir.clone(),
        catalog_path: config.catalog_out.clone(),
        catalog_tables: catalog.len(),
    })
}
