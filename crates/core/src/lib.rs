//! # dbclaw core
//!
//! Domain types, traits, and error definitions shared by every dbclaw crate.
//! Implementations live in their own crates; this one only defines the model
//! they all build against:
//! - `Value`, `Table` and `Document` for tabular data on its way to a store
//! - `DatasetSource` for the read side, `DocumentStore` for the write side
//! - one error enum per bounded context

pub mod dataset;
pub mod error;
pub mod store;
pub mod table;
pub mod value;

// Re-export key types at crate root for ergonomics
pub use dataset::DatasetSource;
pub use error::{AgentError, DatasetError, Error, ExportError, StoreError};
pub use store::DocumentStore;
pub use table::{Column, Table};
pub use value::{Document, Value};
