//! DatasetSource trait: read-only access to a partitioned public dataset.

use crate::error::DatasetError;
use crate::table::Table;
use async_trait::async_trait;

/// A dataset split into named sub-configurations, each fetched independently.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// The dataset identifier (e.g. "cfahlgren1/hub-stats").
    fn dataset(&self) -> &str;

    /// The names of every sub-configuration, in the order the source lists them.
    async fn config_names(&self) -> Result<Vec<String>, DatasetError>;

    /// Fetch the rows of one sub-configuration.
    ///
    /// With `limit`, implementations may stop early once that many rows are
    /// in hand; they must never return rows out of order.
    async fn fetch(&self, config: &str, limit: Option<usize>) -> Result<Table, DatasetError>;
}
