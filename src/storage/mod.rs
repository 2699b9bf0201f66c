//! Durable sample history behind a backend trait.
//!
//! The engine appends every check outcome here in addition to its
//! in-memory rolling windows, so history survives longer than the
//! aggregation window and the API can serve raw samples.

mod backend;
mod error;
mod memory;

pub use backend::{MetricStore, SampleQuery};
pub use error::StorageError;
pub use memory::MemoryStore;
