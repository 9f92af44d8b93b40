//! Document store backends for dbclaw.

pub mod in_memory;

#[cfg(feature = "mongodb")]
pub mod mongo;

pub use in_memory::InMemoryStore;

#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;
