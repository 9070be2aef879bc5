use crate::adapters::http::{ApiClient, DEFAULT_PAGE_SIZE, DEFAULT_SOURCE_URL, MAX_PAGE_SIZE};
use crate::adapters::storage::{S3Storage, StorageProbe};
use crate::config::storage::{StorageConfig, StorageOverrides};
use crate::domain::model::{ExecutionContext, IngestionBatch, StorageKey};
use crate::domain::ports::{ObjectStorage, Task};
use crate::utils::error::{IngestStage, Result};
use crate::utils::validation::{validate_range, validate_s3_bucket_name, Validate};
use async_trait::async_trait;
use serde::Serialize;

pub const CONTENT_TYPE_JSON: &str = "application/json";

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub page_size: u32,
    /// Fail fast with `StorageUnavailable` before touching the source API.
    pub check_liveness: bool,
    /// Log whether the uploaded object is publicly readable.
    pub probe_public_url: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            check_liveness: true,
            probe_public_url: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionReport {
    pub bucket: String,
    pub key: StorageKey,
    pub records: usize,
    pub bytes: usize,
}

/// Fetch → serialize → upload for one execution date.
pub struct BronzeIngestion<S: ObjectStorage> {
    storage: S,
    api: ApiClient,
    probe: StorageProbe,
    options: IngestOptions,
}

impl<S: ObjectStorage> BronzeIngestion<S> {
    pub fn new(storage: S, storage_endpoint: &str, options: IngestOptions) -> Self {
        Self {
            storage,
            api: ApiClient::new(),
            probe: StorageProbe::new(storage_endpoint),
            options,
        }
    }

    pub fn with_api_client(mut self, api: ApiClient) -> Self {
        self.api = api;
        self
    }

    pub async fn ingest(
        &self,
        execution_date: &str,
        source_url: &str,
        bucket_name: &str,
    ) -> Result<StorageKey> {
        self.ingest_report(execution_date, source_url, bucket_name)
            .await
            .map(|report| report.key)
    }

    pub async fn ingest_report(
        &self,
        execution_date: &str,
        source_url: &str,
        bucket_name: &str,
    ) -> Result<IngestionReport> {
        tracing::info!(
            "🚀 Bronze ingestion for {} from {} into bucket '{}'",
            execution_date,
            source_url,
            bucket_name
        );

        let key = StorageKey::breweries(execution_date)
            .map_err(|e| e.at_stage(IngestStage::ResolveConfig))?;
        validate_s3_bucket_name("bucket_name", bucket_name)
            .map_err(|e| e.at_stage(IngestStage::ResolveConfig))?;
        validate_range("page_size", self.options.page_size, 1, MAX_PAGE_SIZE)
            .map_err(|e| e.at_stage(IngestStage::ResolveConfig))?;

        if self.options.check_liveness {
            self.probe
                .check_liveness()
                .await
                .map_err(|e| e.at_stage(IngestStage::ProbeStorage))?;
        }

        let records = self
            .api
            .fetch_data(source_url, self.options.page_size)
            .await
            .map_err(|e| e.at_stage(IngestStage::FetchSource))?;
        let batch = IngestionBatch::new(records);
        if batch.is_empty() {
            tracing::warn!("⚠️ Source returned no records, uploading an empty array");
        } else {
            tracing::info!("Extracted {} records", batch.len());
        }

        let body = batch
            .to_json_bytes()
            .map_err(|e| e.at_stage(IngestStage::Serialize))?;

        tracing::debug!("Uploading {} bytes to s3://{}/{}", body.len(), bucket_name, key);
        self.storage
            .put_object(bucket_name, key.as_str(), &body, CONTENT_TYPE_JSON)
            .await
            .map_err(|e| e.at_stage(IngestStage::Upload))?;
        tracing::info!("✅ Raw data uploaded to s3://{}/{}", bucket_name, key);

        if self.options.probe_public_url {
            self.probe.probe_public_object(bucket_name, key.as_str()).await;
        }

        Ok(IngestionReport {
            bucket: bucket_name.to_string(),
            key,
            records: batch.len(),
            bytes: body.len(),
        })
    }
}

/// Runs the bronze ingestion against MinIO. `endpoint_url` wins over
/// `MINIO_ENDPOINT`, which wins over `http://minio:9000`.
pub async fn ingest(
    execution_date: &str,
    source_url: &str,
    bucket_name: &str,
    endpoint_url: Option<&str>,
) -> Result<StorageKey> {
    let overrides = StorageOverrides {
        endpoint_url: endpoint_url.map(str::to_string),
        ..StorageOverrides::default()
    };
    ingest_with(
        execution_date,
        source_url,
        bucket_name,
        &overrides,
        IngestOptions::default(),
    )
    .await
    .map(|report| report.key)
}

pub async fn ingest_with(
    execution_date: &str,
    source_url: &str,
    bucket_name: &str,
    overrides: &StorageOverrides,
    options: IngestOptions,
) -> Result<IngestionReport> {
    let config = StorageConfig::resolve(overrides);
    config
        .validate()
        .map_err(|e| e.at_stage(IngestStage::ResolveConfig))?;
    tracing::debug!("Resolved storage config: {:?}", config);

    let storage = S3Storage::connect(&config).await;
    BronzeIngestion::new(storage, &config.endpoint_url, options)
        .ingest_report(execution_date, source_url, bucket_name)
        .await
}

/// Workflow task wrapping [`ingest_with`]. Reads `execution_date`,
/// `raw_data_url`, `bucket_name` and optional `endpoint_url` from the
/// rendered task parameters.
#[derive(Debug, Clone, Default)]
pub struct BronzeLayerTask {
    overrides: StorageOverrides,
    options: IngestOptions,
}

impl BronzeLayerTask {
    pub fn new(overrides: StorageOverrides, options: IngestOptions) -> Self {
        Self { overrides, options }
    }
}

#[async_trait]
impl Task for BronzeLayerTask {
    async fn run(&self, ctx: &ExecutionContext) -> Result<serde_json::Value> {
        let execution_date = ctx.param("execution_date").unwrap_or(ctx.execution_date.as_str());
        let source_url = ctx.param("raw_data_url").unwrap_or(DEFAULT_SOURCE_URL);
        let bucket_name = ctx
            .require_param("bucket_name")
            .map_err(|e| e.at_stage(IngestStage::ResolveConfig))?;

        let mut overrides = self.overrides.clone();
        if let Some(endpoint) = ctx.param("endpoint_url") {
            overrides.endpoint_url = Some(endpoint.to_string());
        }

        let report = ingest_with(
            execution_date,
            source_url,
            bucket_name,
            &overrides,
            self.options.clone(),
        )
        .await?;

        Ok(serde_json::json!({
            "bucket": report.bucket,
            "key": report.key,
            "records": report.records,
            "bytes": report.bytes,
        }))
    }
}
