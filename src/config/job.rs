use crate::adapters::http::DEFAULT_SOURCE_URL;
use crate::utils::error::{BronzeError, Result};
use crate::utils::validation::{
    validate_execution_date, validate_non_empty_string, validate_s3_bucket_name, validate_url,
    Validate,
};
use chrono::NaiveDate;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

pub const BRONZE_TASK_ID: &str = "bronze_layer_ingestion";
pub const DEFAULT_BUCKET: &str = "bronze-layer";
pub const DEFAULT_RETRIES: u32 = 3;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));
static MACRO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_]+)\s*\}\}").expect("valid macro pattern"));

/// Scheduled job declaration: one DAG, its tasks and their parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub dag: DagConfig,
    #[serde(default)]
    pub tasks: Vec<TaskDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DagConfig {
    pub dag_id: String,
    #[serde(default = "default_owner")]
    pub owner: String,
    pub start_date: NaiveDate,
    /// `None` 代表只能手動觸發
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub catchup: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub task_id: String,
    /// Values may contain `{{ ds }}` / `{{ ds_nodash }}`.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

fn default_owner() -> String {
    "airflow".to_string()
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

impl JobDefinition {
    /// The `breweries_ingestion` job: a single bronze task, three retries,
    /// manual schedule.
    pub fn breweries_ingestion() -> Self {
        let params = BTreeMap::from([
            ("execution_date".to_string(), "{{ ds }}".to_string()),
            ("raw_data_url".to_string(), DEFAULT_SOURCE_URL.to_string()),
            ("bucket_name".to_string(), DEFAULT_BUCKET.to_string()),
        ]);

        Self {
            dag: DagConfig {
                dag_id: "breweries_ingestion".to_string(),
                owner: "bees".to_string(),
                start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
                schedule: None,
                catchup: false,
                tags: vec!["brewery".to_string()],
                retries: DEFAULT_RETRIES,
            },
            tasks: vec![TaskDefinition {
                task_id: BRONZE_TASK_ID.to_string(),
                params,
            }],
        }
    }

    /// 從 TOML 檔案載入
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parses a job definition, then expands `${VAR}` inside string values.
    ///
    /// Expansion runs on the parsed tree, so an environment value holding
    /// quotes or newlines is taken verbatim and cannot alter the document.
    /// Unset variables are left as written.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut table: toml::Table = toml::from_str(content).map_err(toml_error)?;
        for value in table.iter_mut().map(|(_, v)| v) {
            substitute_env_vars(value);
        }

        toml::Value::Table(table).try_into().map_err(toml_error)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| BronzeError::ConfigError {
            message: format!("Cannot render job definition: {}", e),
        })
    }

    pub fn dag_id(&self) -> &str {
        &self.dag.dag_id
    }

    /// Total tries per task: the first run plus `retries`.
    pub fn max_tries(&self) -> u32 {
        self.dag.retries.saturating_add(1)
    }

    pub fn task(&self, task_id: &str) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    /// Sets one parameter on a declared task, e.g. a CLI override.
    pub fn set_task_param(&mut self, task_id: &str, name: &str, value: impl Into<String>) -> Result<()> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.task_id == task_id)
            .ok_or_else(|| BronzeError::ConfigError {
                message: format!("Task '{}' is not declared in job '{}'", task_id, self.dag.dag_id),
            })?;
        task.params.insert(name.to_string(), value.into());
        Ok(())
    }
}

impl TaskDefinition {
    /// Renders the scheduler macros in every parameter for one execution date.
    pub fn render_params(&self, execution_date: &str) -> Result<BTreeMap<String, String>> {
        let date = validate_execution_date("execution_date", execution_date)?;
        let ds = date.format("%Y-%m-%d").to_string();
        let ds_nodash = date.format("%Y%m%d").to_string();

        let mut rendered = BTreeMap::new();
        for (name, template) in &self.params {
            let mut unknown = None;
            let value = MACRO.replace_all(template, |caps: &Captures| match &caps[1] {
                "ds" => ds.clone(),
                "ds_nodash" => ds_nodash.clone(),
                other => {
                    unknown.get_or_insert_with(|| other.to_string());
                    caps[0].to_string()
                }
            });

            if let Some(macro_name) = unknown {
                return Err(BronzeError::ConfigValidationError {
                    field: format!("{}.params.{}", self.task_id, name),
                    message: format!("Unknown template macro '{}'", macro_name),
                });
            }
            rendered.insert(name.clone(), value.into_owned());
        }

        Ok(rendered)
    }
}

fn toml_error(e: toml::de::Error) -> BronzeError {
    BronzeError::ConfigValidationError {
        field: "toml_parsing".to_string(),
        message: format!("TOML parsing error: {}", e),
    }
}

fn substitute_env_vars(value: &mut toml::Value) {
    match value {
        toml::Value::String(text) => {
            if ENV_VAR.is_match(text) {
                *text = ENV_VAR
                    .replace_all(text, |caps: &Captures| {
                        let var_name = &caps[1];
                        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
                    })
                    .into_owned();
            }
        }
        toml::Value::Array(items) => items.iter_mut().for_each(substitute_env_vars),
        toml::Value::Table(table) => table.iter_mut().map(|(_, v)| v).for_each(substitute_env_vars),
        _ => {}
    }
}

fn is_templated(value: &str) -> bool {
    MACRO.is_match(value)
}

impl Validate for JobDefinition {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("dag.dag_id", &self.dag.dag_id)?;

        if self.tasks.is_empty() {
            return Err(BronzeError::ConfigValidationError {
                field: "tasks".to_string(),
                message: format!("Job '{}' declares no tasks", self.dag.dag_id),
            });
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            validate_non_empty_string("tasks.task_id", &task.task_id)?;
            if !seen.insert(task.task_id.as_str()) {
                return Err(BronzeError::ConfigValidationError {
                    field: "tasks.task_id".to_string(),
                    message: format!("Duplicate task id '{}'", task.task_id),
                });
            }

            for (name, value) in &task.params {
                if is_templated(value) {
                    continue;
                }
                let field = format!("{}.params.{}", task.task_id, name);
                if name.ends_with("_url") {
                    validate_url(&field, value)?;
                } else if name == "bucket_name" {
                    validate_s3_bucket_name(&field, value)?;
                }
            }
        }

        tracing::debug!("✅ Job '{}' validation passed", self.dag.dag_id);
        Ok(())
    }
}
