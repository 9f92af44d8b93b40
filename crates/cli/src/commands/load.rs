//! `dbclaw load`: copy every dataset config into its own collection.

use dbclaw_config::AppConfig;
use dbclaw_ingest::{HubDatasetSource, IngestOptions, IngestionRun, RunReport};
use dbclaw_store::{InMemoryStore, MongoStore};
use std::path::PathBuf;
use tracing::info;

pub struct LoadArgs {
    pub configs: Vec<String>,
    pub limit: Option<usize>,
    pub dataset: Option<String>,
    pub database: Option<String>,
    pub no_export: bool,
    pub export_dir: Option<PathBuf>,
    pub dry_run: bool,
}

impl LoadArgs {
    fn apply(&self, config: &mut AppConfig) {
        if !self.configs.is_empty() {
            config.dataset.configs = self.configs.clone();
        }
        if self.limit.is_some() {
            config.dataset.row_limit = self.limit;
        }
        if let Some(dataset) = &self.dataset {
            config.dataset.name = dataset.clone();
        }
        if let Some(database) = &self.database {
            config.database.name = database.clone();
        }
        if let Some(dir) = &self.export_dir {
            config.export.dir = dir.clone();
        }
        if self.no_export {
            config.export.enabled = false;
        }
    }
}

pub async fn run(args: LoadArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    args.apply(&mut config);
    config.validate()?;

    // Credential check comes before any network call.
    let connection_string = if args.dry_run {
        None
    } else {
        Some(config.database.require_connection_string()?.to_string())
    };

    let source = HubDatasetSource::new(&config.dataset)?;
    let run = IngestionRun::new(&source, IngestOptions::from_config(&config));

    let configs = run.enumerate().await?;
    info!(dataset = %config.dataset.name, count = configs.len(), "Discovered configs");

    let report = match connection_string {
        Some(uri) => {
            let store = MongoStore::connect(&uri, &config.database).await?;
            run.execute(&configs, &store).await
        }
        None => {
            info!("Dry run: loading into an in-memory store");
            let store = InMemoryStore::new(config.database.name.clone());
            run.execute(&configs, &store).await
        }
    };

    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    for outcome in &report.outcomes {
        if let Some(line) = outcome.status_line() {
            println!("{line}");
        }
    }
    println!("\n{}", report.summary_line());
}
