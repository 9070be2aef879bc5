pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{ApiClient, S3Storage, StorageProbe};
pub use config::{JobDefinition, StorageConfig, StorageOverrides};
pub use crate::core::ingestion::{ingest, BronzeIngestion, BronzeLayerTask, IngestOptions};
pub use crate::core::workflow::WorkflowRunner;
pub use domain::model::{BreweryRecord, StorageKey};
pub use utils::error::{BronzeError, Result};
