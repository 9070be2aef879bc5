use crate::adapters::http::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::utils::error::Result;
use crate::utils::logger::LogFormat;
use crate::utils::validation::{
    validate_execution_date, validate_range, validate_s3_bucket_name, validate_url, Validate,
};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "brewery-bronze")]
#[command(about = "Ingest Open Brewery DB records into the bronze layer bucket")]
pub struct CliConfig {
    /// TOML job definition; the built-in `breweries_ingestion` job when omitted
    #[arg(long)]
    pub job: Option<String>,

    /// Logical run date (YYYY-MM-DD); defaults to today in UTC
    #[arg(long)]
    pub execution_date: Option<String>,

    /// Override the task's `raw_data_url`
    #[arg(long)]
    pub source_url: Option<String>,

    /// Override the task's `bucket_name`
    #[arg(long)]
    pub bucket: Option<String>,

    /// Storage endpoint; falls back to MINIO_ENDPOINT, then http://minio:9000
    #[arg(long)]
    pub endpoint_url: Option<String>,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    #[arg(long, help = "Skip the MinIO liveness check before fetching")]
    pub skip_health_check: bool,

    #[arg(long, help = "GET the uploaded object's public URL afterwards (log only)")]
    pub probe_public_url: bool,

    #[arg(long, help = "Print the rendered job and target key, then exit")]
    pub dry_run: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON log lines")]
    pub json_logs: bool,
}

impl CliConfig {
    pub fn log_format(&self) -> LogFormat {
        if self.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Compact
        }
    }

    pub fn execution_date_or_today(&self) -> String {
        self.execution_date
            .clone()
            .unwrap_or_else(|| chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string())
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(date) = &self.execution_date {
            validate_execution_date("execution_date", date)?;
        }
        if let Some(url) = &self.source_url {
            validate_url("source_url", url)?;
        }
        if let Some(url) = &self.endpoint_url {
            validate_url("endpoint_url", url)?;
        }
        if let Some(bucket) = &self.bucket {
            validate_s3_bucket_name("bucket", bucket)?;
        }
        validate_range("page_size", self.page_size, 1, MAX_PAGE_SIZE)?;
        Ok(())
    }
}
