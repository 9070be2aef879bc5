use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_url, Validate};
use std::env;
use std::fmt;

pub const ENV_ENDPOINT: &str = "MINIO_ENDPOINT";
pub const ENV_ACCESS_KEY: &str = "MINIO_ROOT_USER";
pub const ENV_SECRET_KEY: &str = "MINIO_ROOT_PASSWORD";
pub const ENV_REGION: &str = "MINIO_REGION";

pub const DEFAULT_ENDPOINT: &str = "http://minio:9000";
pub const DEFAULT_ACCESS_KEY: &str = "minioadmin";
pub const DEFAULT_SECRET_KEY: &str = "minioadmin";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Values given explicitly by the caller. Anything left `None` falls back to
/// the environment, then to the built-in default.
#[derive(Debug, Clone, Default)]
pub struct StorageOverrides {
    pub endpoint_url: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
}

impl StorageOverrides {
    pub fn with_endpoint(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: Some(endpoint_url.into()),
            ..Self::default()
        }
    }
}

/// Connection settings for the MinIO / S3 bronze bucket.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub endpoint_url: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("region", &self.region)
            .finish()
    }
}

impl StorageConfig {
    /// explicit > 環境變數 > 預設值
    pub fn resolve(overrides: &StorageOverrides) -> Self {
        Self::resolve_with(overrides, |name| env::var(name).ok())
    }

    pub fn resolve_with<F>(overrides: &StorageOverrides, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |explicit: &Option<String>, var: &str, default: &str| -> String {
            explicit
                .clone()
                .or_else(|| lookup(var).filter(|v| !v.trim().is_empty()))
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            endpoint_url: pick(&overrides.endpoint_url, ENV_ENDPOINT, DEFAULT_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            access_key: pick(&overrides.access_key, ENV_ACCESS_KEY, DEFAULT_ACCESS_KEY),
            secret_key: pick(&overrides.secret_key, ENV_SECRET_KEY, DEFAULT_SECRET_KEY),
            region: pick(&overrides.region, ENV_REGION, DEFAULT_REGION),
        }
    }
}

impl Validate for StorageConfig {
    fn validate(&self) -> Result<()> {
        validate_url("storage.endpoint_url", &self.endpoint_url)?;
        validate_non_empty_string("storage.access_key", &self.access_key)?;
        validate_non_empty_string("storage.secret_key", &self.secret_key)?;
        validate_non_empty_string("storage.region", &self.region)?;
        Ok(())
    }
}
