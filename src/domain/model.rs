use crate::utils::error::{BronzeError, Result};
use crate::utils::validation::{validate_execution_date, validate_non_empty_string};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One brewery as returned by the upstream API. The payload is never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreweryRecord(pub serde_json::Map<String, serde_json::Value>);

impl BreweryRecord {
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.0.get(field)
    }
}

/// Records of a single paginated response. Empty means end of stream.
pub type Page = Vec<BreweryRecord>;

/// Everything fetched for one execution, in upstream order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IngestionBatch {
    records: Vec<BreweryRecord>,
}

impl IngestionBatch {
    pub fn new(records: Vec<BreweryRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 序列化成縮排的 JSON bytes
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.records).map_err(|e| BronzeError::SerializationFailure {
            context: format!("serializing {} records", self.records.len()),
            source: e,
        })
    }
}

/// Object key partitioned by execution date:
/// `<prefix>/dt=<YYYY-MM-DD>/<filename>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    pub const BREWERIES_PREFIX: &'static str = "breweries";
    pub const BREWERIES_FILENAME: &'static str = "breweries";

    pub fn for_execution_date(prefix: &str, execution_date: &str, filename: &str) -> Result<Self> {
        validate_execution_date("execution_date", execution_date)?;
        let prefix = prefix.trim_matches('/');
        validate_non_empty_string("key_prefix", prefix)?;
        validate_non_empty_string("key_filename", filename)?;
        Ok(Self(format!(
            "{}/dt={}/{}.json",
            prefix, execution_date, filename
        )))
    }

    /// `breweries/dt=<execution_date>/breweries.json`
    pub fn breweries(execution_date: &str) -> Result<Self> {
        Self::for_execution_date(
            Self::BREWERIES_PREFIX,
            execution_date,
            Self::BREWERIES_FILENAME,
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Date and rendered parameters handed to a task for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    pub dag_id: String,
    pub task_id: String,
    pub execution_date: String,
    pub params: BTreeMap<String, String>,
}

impl ExecutionContext {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn require_param(&self, name: &str) -> Result<&str> {
        self.param(name)
            .ok_or_else(|| BronzeError::MissingConfigError {
                field: format!("{}.params.{}", self.task_id, name),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_storage_key_is_date_partitioned() {
        let key = StorageKey::breweries("2025-10-06").unwrap();
        assert_eq!(key.as_str(), "breweries/dt=2025-10-06/breweries.json");
    }

    #[test]
    fn test_storage_key_is_deterministic() {
        for date in ["2025-01-01", "2024-02-29", "2025-12-31"] {
            let first = StorageKey::breweries(date).unwrap();
            let second = StorageKey::breweries(date).unwrap();
            assert_eq!(first, second);
        }
        assert_ne!(
            StorageKey::breweries("2025-01-01").unwrap(),
            StorageKey::breweries("2025-01-02").unwrap()
        );
    }

    #[test]
    fn test_storage_key_rejects_unrendered_template() {
        assert!(StorageKey::breweries("{{ ds }}").is_err());
        assert!(StorageKey::breweries("2025-02-30").is_err());
    }

    #[test]
    fn test_storage_key_custom_prefix() {
        let key = StorageKey::for_execution_date("/raw/breweries/", "2025-10-06", "part-0").unwrap();
        assert_eq!(key.to_string(), "raw/breweries/dt=2025-10-06/part-0.json");
    }

    #[test]
    fn test_storage_key_rejects_blank_segments() {
        for (prefix, filename) in [("", "breweries"), ("///", "breweries"), ("breweries", " ")] {
            let err = StorageKey::for_execution_date(prefix, "2025-10-06", filename).unwrap_err();
            assert!(matches!(err, BronzeError::InvalidConfigValueError { .. }));
        }
    }

    #[test]
    fn test_batch_serializes_as_indented_array() {
        let record: BreweryRecord = serde_json::from_value(json!({"id": 1})).unwrap();
        let batch = IngestionBatch::new(vec![record]);

        let bytes = batch.to_json_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "[\n  {\n    \"id\": 1\n  }\n]");
    }

    #[test]
    fn test_record_rejects_non_object() {
        let result: std::result::Result<BreweryRecord, _> = serde_json::from_value(json!(42));
        assert!(result.is_err());
    }

    #[test]
    fn test_execution_context_params() {
        let ctx = ExecutionContext {
            dag_id: "breweries_ingestion".to_string(),
            task_id: "bronze_layer_ingestion".to_string(),
            execution_date: "2025-10-06".to_string(),
            params: BTreeMap::from([("bucket_name".to_string(), "bronze-layer".to_string())]),
        };
        assert_eq!(ctx.param("bucket_name"), Some("bronze-layer"));
        assert!(matches!(
            ctx.require_param("raw_data_url"),
            Err(BronzeError::MissingConfigError { field }) if field == "bronze_layer_ingestion.params.raw_data_url"
        ));
    }
}
