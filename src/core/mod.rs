pub mod ingestion;
pub mod workflow;

pub use crate::domain::model::{BreweryRecord, ExecutionContext, IngestionBatch, StorageKey};
pub use crate::domain::ports::{ObjectStorage, Task};
pub use crate::utils::error::Result;
