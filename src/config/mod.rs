#[cfg(feature = "cli")]
pub mod cli;
pub mod job;
pub mod storage;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use job::{JobDefinition, TaskDefinition};
pub use storage::{StorageConfig, StorageOverrides};
