//! CSV mirror of each sanitized table.
//!
//! One file per collection: `<dir>/<collection>.csv`. The directory is
//! created on demand; the writer is dropped (and the file closed) before
//! `export` returns, on success and on error alike.

use crate::sanitize::SanitizedTable;
use dbclaw_core::error::ExportError;
use dbclaw_core::value::Value;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.csv"))
    }

    /// Write the table and return the file path.
    pub fn export(&self, collection: &str, table: &SanitizedTable) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| ExportError::Io {
            path: self.dir.clone(),
            reason: e.to_string(),
        })?;

        let path = self.path_for(collection);
        let csv_err = |e: csv::Error| ExportError::Csv {
            path: path.clone(),
            reason: e.to_string(),
        };

        let mut writer = csv::Writer::from_path(&path).map_err(csv_err)?;
        if !table.columns.is_empty() {
            writer.write_record(&table.columns).map_err(csv_err)?;
            for doc in &table.documents {
                let record: Vec<String> = table
                    .columns
                    .iter()
                    .map(|column| cell_text(doc.get(column)))
                    .collect();
                writer.write_record(&record).map_err(csv_err)?;
            }
        }
        writer.flush().map_err(|e| ExportError::Io {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        debug!(path = %path.display(), rows = table.row_count(), "Wrote CSV export");
        Ok(path)
    }
}

/// Render one cell the way a dataframe CSV dump would.
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Bool(true)) => "True".into(),
        Some(Value::Bool(false)) => "False".into(),
        Some(Value::Int(i)) => i.to_string(),
        Some(Value::Float(f)) if f.is_nan() => String::new(),
        Some(Value::Float(f)) => format!("{f:?}"),
        Some(Value::String(s)) => s.clone(),
        Some(nested @ (Value::List(_) | Value::Map(_))) => {
            serde_json::to_string(nested).unwrap_or_default()
        }
    }
}
