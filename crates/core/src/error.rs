//! Error types for the dbclaw domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; `Error` gathers the ones a
//! single ingestion step can raise.

use std::path::PathBuf;
use thiserror::Error;

/// Any failure inside one per-config ingestion step.
#[derive(Debug, Error)]
pub enum Error {
    // --- Dataset errors ---
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Export errors ---
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum DatasetError {
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Dataset server returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Malformed dataset response: {0}")]
    Decode(String),

    #[error("Dataset '{dataset}' has no config named '{config}'")]
    UnknownConfig { dataset: String, config: String },
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Failed to connect to the database: {0}")]
    Connection(String),

    #[error("Operation on collection '{collection}' failed: {reason}")]
    Operation { collection: String, reason: String },

    #[error("Store is closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("CSV encoding failed for {path}: {reason}")]
    Csv { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Failed to spawn agent runtime '{command}': {reason}")]
    Spawn { command: String, reason: String },

    #[error("Agent runtime exited with code {code:?}: {stderr}")]
    ProcessFailed { code: Option<i32>, stderr: String },

    #[error("Agent protocol error: {0}")]
    Protocol(String),

    #[error("Invalid role table: {0}")]
    InvalidRoles(String),

    #[error("Permission denied: role '{role}' may not use '{operation}'")]
    PermissionDenied { role: String, operation: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_error_displays_correctly() {
        let err = Error::Dataset(DatasetError::Status {
            status: 404,
            url: "https://datasets-server.huggingface.co/rows".into(),
        });
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("/rows"));
    }

    #[test]
    fn store_error_displays_correctly() {
        let err = Error::Store(StoreError::Operation {
            collection: "hub_stats_models".into(),
            reason: "duplicate key".into(),
        });
        assert!(err.to_string().contains("hub_stats_models"));
        assert!(err.to_string().contains("duplicate key"));
    }

    #[test]
    fn permission_error_names_role_and_operation() {
        let err = AgentError::PermissionDenied {
            role: "database_reader".into(),
            operation: "drop-database".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("database_reader"));
        assert!(msg.contains("drop-database"));
    }
}
