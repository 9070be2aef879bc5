use std::fmt;
use thiserror::Error;

/// 匯入流程中失敗發生的階段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    ResolveConfig,
    ProbeStorage,
    FetchSource,
    Serialize,
    Upload,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestStage::ResolveConfig => "resolve-config",
            IngestStage::ProbeStorage => "probe-storage",
            IngestStage::FetchSource => "fetch-source",
            IngestStage::Serialize => "serialize",
            IngestStage::Upload => "upload",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

#[derive(Error, Debug)]
pub enum BronzeError {
    #[error("Timeout: {endpoint}")]
    Timeout { endpoint: String },

    #[error("Error on request to {endpoint}{}: {source}", page_suffix(.page))]
    RequestFailure {
        endpoint: String,
        page: Option<u32>,
        #[source]
        source: reqwest::Error,
    },

    #[error("Object storage unavailable at {endpoint}: {reason}")]
    StorageUnavailable { endpoint: String, reason: String },

    #[error("Upload to s3://{bucket}/{key} failed: {message}")]
    UploadFailure {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("Serialization error ({context}): {source}")]
    SerializationFailure {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Bronze ingestion failed at stage '{stage}': {source}")]
    IngestionFailed {
        stage: IngestStage,
        #[source]
        source: Box<BronzeError>,
    },

    #[error("Task '{task_id}' failed after {attempts} attempt(s): {source}")]
    TaskFailed {
        task_id: String,
        attempts: u32,
        #[source]
        source: Box<BronzeError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },
}

fn page_suffix(page: &Option<u32>) -> String {
    page.map(|p| format!(", page '{}'", p)).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, BronzeError>;

impl BronzeError {
    /// 包裝成匯入階段錯誤
    pub fn at_stage(self, stage: IngestStage) -> Self {
        BronzeError::IngestionFailed {
            stage,
            source: Box::new(self),
        }
    }

    /// 剝除 IngestionFailed / TaskFailed 外層，取得真正的原因
    pub fn root_cause(&self) -> &BronzeError {
        match self {
            BronzeError::IngestionFailed { source, .. } | BronzeError::TaskFailed { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.root_cause() {
            BronzeError::Timeout { .. }
            | BronzeError::RequestFailure { .. }
            | BronzeError::StorageUnavailable { .. }
            | BronzeError::UploadFailure { .. } => ErrorSeverity::Medium,
            BronzeError::SerializationFailure { .. }
            | BronzeError::ConfigError { .. }
            | BronzeError::ConfigValidationError { .. }
            | BronzeError::InvalidConfigValueError { .. }
            | BronzeError::MissingConfigError { .. } => ErrorSeverity::High,
            BronzeError::IoError(_) => ErrorSeverity::Critical,
            BronzeError::IngestionFailed { .. } | BronzeError::TaskFailed { .. } => {
                ErrorSeverity::High
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.root_cause() {
            BronzeError::Timeout { .. } => {
                "The source API did not answer in time; re-run the task later"
            }
            BronzeError::RequestFailure { .. } => {
                "Check the source URL and the API status, then re-run the task"
            }
            BronzeError::StorageUnavailable { .. } => {
                "Make sure MinIO is running and MINIO_ENDPOINT points at it"
            }
            BronzeError::UploadFailure { .. } => {
                "Check that the bucket exists and MINIO_ROOT_USER / MINIO_ROOT_PASSWORD are valid"
            }
            BronzeError::SerializationFailure { .. } => {
                "The source returned an unexpected payload; inspect the API response"
            }
            BronzeError::IoError(_) => "Check file paths and permissions",
            _ => "Review the job definition and command line arguments",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.root_cause() {
            BronzeError::Timeout { endpoint } => format!("Source API timed out: {}", endpoint),
            BronzeError::RequestFailure { endpoint, page, .. } => match page {
                Some(p) => format!("Source API request failed on page {}: {}", p, endpoint),
                None => format!("Source API request failed: {}", endpoint),
            },
            BronzeError::StorageUnavailable { endpoint, .. } => {
                format!("Object storage is not reachable: {}", endpoint)
            }
            BronzeError::UploadFailure { bucket, key, .. } => {
                format!("Could not upload s3://{}/{}", bucket, key)
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_nested_errors() {
        let err = BronzeError::StorageUnavailable {
            endpoint: "http://minio:9000".to_string(),
            reason: "status 503".to_string(),
        }
        .at_stage(IngestStage::ProbeStorage);
        let err = BronzeError::TaskFailed {
            task_id: "bronze_layer_ingestion".to_string(),
            attempts: 4,
            source: Box::new(err),
        };

        assert!(matches!(
            err.root_cause(),
            BronzeError::StorageUnavailable { .. }
        ));
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().contains("http://minio:9000"));
    }

    #[test]
    fn test_stage_is_part_of_message() {
        let err = BronzeError::ConfigError {
            message: "boom".to_string(),
        }
        .at_stage(IngestStage::ResolveConfig);
        assert_eq!(
            err.to_string(),
            "Bronze ingestion failed at stage 'resolve-config': Configuration error: boom"
        );
        assert_eq!(err.severity(), ErrorSeverity::High);
    }
}
