//! The ingestion run: enumerate configs, then fetch → sanitize → export →
//! replace for each one, sequentially, over a single shared store handle.
//!
//! Failure policy:
//! - enumeration failures are fatal and surface from `enumerate`
//! - anything that goes wrong inside one config is logged, recorded in the
//!   report, and the loop moves on
//! - the store is closed exactly once, after the last config

use crate::export::CsvExporter;
use crate::loader::{CollectionLoader, LoadOutcome};
use crate::sanitize::RecordSanitizer;
use chrono::{DateTime, Utc};
use dbclaw_config::AppConfig;
use dbclaw_core::dataset::DatasetSource;
use dbclaw_core::error::{DatasetError, Error};
use dbclaw_core::store::DocumentStore;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Knobs for one run, taken from `AppConfig` plus CLI overrides.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub collection_prefix: String,
    pub row_limit: Option<usize>,
    /// Restrict the run to these configs. Empty = all.
    pub only_configs: Vec<String>,
    /// Where CSV mirrors go. None disables export.
    pub export_dir: Option<PathBuf>,
}

impl IngestOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            collection_prefix: config.dataset.collection_prefix.clone(),
            row_limit: config.dataset.row_limit,
            only_configs: config.dataset.configs.clone(),
            export_dir: config
                .export
                .enabled
                .then(|| config.export.dir.clone()),
        }
    }

    pub fn collection_name(&self, config: &str) -> String {
        format!("{}_{}", self.collection_prefix, config)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigStatus {
    Loaded(LoadOutcome),
    Failed(String),
}

/// The result of processing one sub-configuration.
#[derive(Debug, Clone)]
pub struct ConfigOutcome {
    pub config: String,
    pub collection: String,
    pub dropped_columns: Vec<String>,
    pub csv_path: Option<PathBuf>,
    pub status: ConfigStatus,
}

impl ConfigOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ConfigStatus::Loaded(_))
    }

    /// The user-facing line for this config. An empty load prints nothing.
    pub fn status_line(&self) -> Option<String> {
        match &self.status {
            ConfigStatus::Loaded(LoadOutcome::Inserted(n)) => {
                Some(format!("✅ {}: {} documents inserted", self.collection, n))
            }
            ConfigStatus::Loaded(LoadOutcome::Empty) => None,
            ConfigStatus::Failed(reason) => {
                Some(format!("❌ Error processing '{}': {}", self.config, reason))
            }
        }
    }
}

/// Summary of a whole run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub dataset: String,
    pub database: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<ConfigOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn documents_inserted(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                ConfigStatus::Loaded(outcome) => outcome.inserted(),
                ConfigStatus::Failed(_) => 0,
            })
            .sum()
    }

    pub fn summary_line(&self) -> String {
        match self.failed() {
            0 => "✅ All collections loaded successfully".to_string(),
            n => format!(
                "⚠️  {} of {} configs failed, {} documents inserted",
                n,
                self.outcomes.len(),
                self.documents_inserted()
            ),
        }
    }
}

pub struct IngestionRun<'a> {
    source: &'a dyn DatasetSource,
    options: IngestOptions,
    exporter: Option<CsvExporter>,
}

impl<'a> IngestionRun<'a> {
    pub fn new(source: &'a dyn DatasetSource, options: IngestOptions) -> Self {
        let exporter = options.export_dir.clone().map(CsvExporter::new);
        Self {
            source,
            options,
            exporter,
        }
    }

    /// List the configs this run will process, once, in source order.
    ///
    /// A name in `only_configs` that the dataset does not have is an error:
    /// the run stops before anything is written.
    pub async fn enumerate(&self) -> Result<Vec<String>, DatasetError> {
        let all = self.source.config_names().await?;
        if self.options.only_configs.is_empty() {
            return Ok(all);
        }

        if let Some(unknown) = self
            .options
            .only_configs
            .iter()
            .find(|name| !all.contains(name))
        {
            return Err(DatasetError::UnknownConfig {
                dataset: self.source.dataset().to_string(),
                config: unknown.clone(),
            });
        }

        Ok(all
            .into_iter()
            .filter(|c| self.options.only_configs.contains(c))
            .collect())
    }

    /// Process every config against `store`, then close it.
    pub async fn execute(&self, configs: &[String], store: &dyn DocumentStore) -> RunReport {
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(configs.len());

        for config in configs {
            outcomes.push(self.process(config, store).await);
        }

        if let Err(e) = store.close().await {
            warn!(error = %e, "Failed to close store cleanly");
        }

        let report = RunReport {
            dataset: self.source.dataset().to_string(),
            database: store.database().to_string(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            documents = report.documents_inserted(),
            "Ingestion run finished"
        );
        report
    }

    async fn process(&self, config: &str, store: &dyn DocumentStore) -> ConfigOutcome {
        let collection = self.options.collection_name(config);
        match self.load_one(config, &collection, store).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(config, collection = %collection, error = %e, "Failed to process config");
                ConfigOutcome {
                    config: config.to_string(),
                    collection,
                    dropped_columns: vec![],
                    csv_path: None,
                    status: ConfigStatus::Failed(e.to_string()),
                }
            }
        }
    }

    async fn load_one(
        &self,
        config: &str,
        collection: &str,
        store: &dyn DocumentStore,
    ) -> Result<ConfigOutcome, Error> {
        let limit = self.options.row_limit;
        let table = self.source.fetch(config, limit).await?;
        let sanitized = RecordSanitizer::sanitize(&table, limit);
        if !sanitized.dropped_columns.is_empty() {
            info!(config, dropped = ?sanitized.dropped_columns, "Dropped nested columns");
        }

        let csv_path = match &self.exporter {
            Some(exporter) => Some(exporter.export(collection, &sanitized)?),
            None => None,
        };

        let dropped_columns = sanitized.dropped_columns;
        let outcome = CollectionLoader::new(store)
            .replace(collection, sanitized.documents)
            .await?;

        Ok(ConfigOutcome {
            config: config.to_string(),
            collection: collection.to_string(),
            dropped_columns,
            csv_path,
            status: ConfigStatus::Loaded(outcome),
        })
    }
}
