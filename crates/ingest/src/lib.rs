//! Dataset ingestion for dbclaw.
//!
//! One run walks every sub-configuration of a dataset:
//! fetch rows (`huggingface`) → drop nested columns and NaN (`sanitize`) →
//! mirror to CSV (`export`) → replace the target collection (`loader`).
//! `pipeline` strings those together and owns the failure policy.

pub mod export;
pub mod huggingface;
pub mod loader;
pub mod pipeline;
pub mod sanitize;

pub use export::CsvExporter;
pub use huggingface::HubDatasetSource;
pub use loader::{CollectionLoader, LoadOutcome};
pub use pipeline::{ConfigOutcome, ConfigStatus, IngestOptions, IngestionRun, RunReport};
pub use sanitize::{ColumnVerdict, RecordSanitizer, SanitizedTable};
