use crate::config::storage::StorageConfig;
use crate::domain::ports::ObjectStorage;
use crate::utils::error::{BronzeError, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use reqwest::{Client, StatusCode};
use std::time::Duration;

pub const LIVENESS_PATH: &str = "/minio/health/live";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
}

impl S3Storage {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    /// Builds a path-style client for MinIO from resolved settings.
    pub async fn connect(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "brewery-bronze",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint_url.clone())
            .credentials_provider(credentials)
            .load()
            .await;

        // MinIO 不支援 virtual-hosted style
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        tracing::debug!("S3 client configured for {}", config.endpoint_url);
        Self::new(S3Client::from_conf(s3_config))
    }
}

impl ObjectStorage for S3Storage {
    async fn put_object(&self, bucket: &str, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|err| {
                let message = match err.as_service_error() {
                    Some(service_err) => format!(
                        "{}: {}",
                        service_err.code().unwrap_or("Unknown"),
                        service_err.message().unwrap_or("no message")
                    ),
                    None => DisplayErrorContext(&err).to_string(),
                };
                tracing::error!("PutObject s3://{}/{} failed: {}", bucket, key, message);
                BronzeError::UploadFailure {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    message,
                }
            })?;

        Ok(())
    }
}

/// Plain HTTP checks against the storage endpoint.
#[derive(Debug, Clone)]
pub struct StorageProbe {
    client: Client,
    endpoint_url: String,
    timeout: Duration,
}

impl StorageProbe {
    pub fn new(endpoint_url: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint_url: endpoint_url.trim_end_matches('/').to_string(),
            timeout: PROBE_TIMEOUT,
        }
    }

    /// `GET <endpoint>/minio/health/live`; anything but 200 means unavailable.
    pub async fn check_liveness(&self) -> Result<()> {
        let url = format!("{}{}", self.endpoint_url, LIVENESS_PATH);
        tracing::debug!("Checking storage liveness at {}", url);

        let unavailable = |reason: String| {
            tracing::error!("❌ Storage health check failed for {}: {}", self.endpoint_url, reason);
            BronzeError::StorageUnavailable {
                endpoint: self.endpoint_url.clone(),
                reason,
            }
        };

        match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                tracing::info!("✅ Storage at {} is live", self.endpoint_url);
                Ok(())
            }
            Ok(response) => Err(unavailable(format!(
                "health check returned status {}",
                response.status()
            ))),
            Err(e) => Err(unavailable(e.to_string())),
        }
    }

    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint_url, bucket, key)
    }

    /// Best-effort GET of the uploaded object. Only logs; never fails.
    pub async fn probe_public_object(&self, bucket: &str, key: &str) -> bool {
        let url = self.public_url(bucket, key);

        match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("🌐 Object is publicly readable at {}", url);
                true
            }
            Ok(response) => {
                tracing::warn!(
                    "⚠️ Object at {} is not publicly readable (status {})",
                    url,
                    response.status()
                );
                false
            }
            Err(e) => {
                tracing::warn!("⚠️ Public URL probe for {} failed: {}", url, e);
                false
            }
        }
    }
}
