use crate::config::job::JobDefinition;
use crate::domain::model::ExecutionContext;
use crate::domain::ports::Task;
use crate::utils::error::{BronzeError, Result};
use crate::utils::validation::{validate_execution_date, Validate};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRunReport {
    pub task_id: String,
    pub attempts: u32,
    pub output: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub dag_id: String,
    pub execution_date: String,
    pub tasks: Vec<TaskRunReport>,
}

/// Triggers one run of a job: tasks run in declaration order, each retried
/// immediately up to `dag.retries` times. Tasks themselves never retry.
#[derive(Default)]
pub struct WorkflowRunner {
    tasks: HashMap<String, Box<dyn Task>>,
}

impl WorkflowRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Task + 'static>(mut self, task_id: impl Into<String>, task: T) -> Self {
        self.tasks.insert(task_id.into(), Box::new(task));
        self
    }

    pub async fn run(&self, job: &JobDefinition, execution_date: &str) -> Result<RunReport> {
        job.validate()?;
        validate_execution_date("execution_date", execution_date)?;

        // 先確認每個 task 都有實作，避免跑到一半才失敗
        for definition in &job.tasks {
            if !self.tasks.contains_key(&definition.task_id) {
                return Err(BronzeError::ConfigError {
                    message: format!(
                        "No implementation registered for task '{}'",
                        definition.task_id
                    ),
                });
            }
        }

        tracing::info!(
            "▶️ Run of '{}' for {} ({} task(s), max {} tries each)",
            job.dag_id(),
            execution_date,
            job.tasks.len(),
            job.max_tries()
        );

        let mut reports = Vec::with_capacity(job.tasks.len());
        for definition in &job.tasks {
            let ctx = ExecutionContext {
                dag_id: job.dag_id().to_string(),
                task_id: definition.task_id.clone(),
                execution_date: execution_date.to_string(),
                params: definition.render_params(execution_date)?,
            };
            let task = &self.tasks[&definition.task_id];
            reports.push(run_with_retries(&**task, &ctx, job.max_tries()).await?);
        }

        tracing::info!("✅ Run of '{}' for {} succeeded", job.dag_id(), execution_date);
        Ok(RunReport {
            dag_id: job.dag_id().to_string(),
            execution_date: execution_date.to_string(),
            tasks: reports,
        })
    }
}

async fn run_with_retries(task: &dyn Task, ctx: &ExecutionContext, max_tries: u32) -> Result<TaskRunReport> {
    let mut attempt = 1;
    loop {
        tracing::info!("Task '{}' attempt {}/{}", ctx.task_id, attempt, max_tries);

        match task.run(ctx).await {
            Ok(output) => {
                return Ok(TaskRunReport {
                    task_id: ctx.task_id.clone(),
                    attempts: attempt,
                    output,
                })
            }
            Err(e) if attempt < max_tries => {
                tracing::warn!(
                    "⚠️ Task '{}' attempt {} failed, retrying: {}",
                    ctx.task_id,
                    attempt,
                    e
                );
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    "❌ Task '{}' failed after {} attempt(s): {}",
                    ctx.task_id,
                    attempt,
                    e
                );
                return Err(BronzeError::TaskFailed {
                    task_id: ctx.task_id.clone(),
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::job::BRONZE_TASK_ID;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Fails the first `failures` calls, then echoes its context.
    struct Flaky {
        failures: u32,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Task for Flaky {
        async fn run(&self, ctx: &ExecutionContext) -> Result<serde_json::Value> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(BronzeError::StorageUnavailable {
                    endpoint: "http://minio:9000".to_string(),
                    reason: format!("call {}", call),
                });
            }
            Ok(serde_json::json!({
                "execution_date": ctx.execution_date,
                "params": ctx.params,
            }))
        }
    }

    fn flaky(failures: u32) -> (Flaky, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        (
            Flaky {
                failures,
                calls: calls.clone(),
            },
            calls,
        )
    }

    #[tokio::test]
    async fn test_run_renders_params() {
        let (task, calls) = flaky(0);
        let runner = WorkflowRunner::new().register(BRONZE_TASK_ID, task);

        let report = runner
            .run(&JobDefinition::breweries_ingestion(), "2025-10-06")
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.dag_id, "breweries_ingestion");
        assert_eq!(report.tasks.len(), 1);
        assert_eq!(report.tasks[0].attempts, 1);
        assert_eq!(
            report.tasks[0].output["params"]["execution_date"],
            "2025-10-06"
        );
        assert_eq!(report.tasks[0].output["params"]["bucket_name"], "bronze-layer");
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let (task, calls) = flaky(2);
        let runner = WorkflowRunner::new().register(BRONZE_TASK_ID, task);

        let report = runner
            .run(&JobDefinition::breweries_ingestion(), "2025-10-06")
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.tasks[0].attempts, 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let (task, calls) = flaky(u32::MAX);
        let runner = WorkflowRunner::new().register(BRONZE_TASK_ID, task);

        let err = runner
            .run(&JobDefinition::breweries_ingestion(), "2025-10-06")
            .await
            .unwrap_err();

        // retries = 3 → 1 次執行 + 3 次重試
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match &err {
            BronzeError::TaskFailed {
                task_id, attempts, ..
            } => {
                assert_eq!(task_id, BRONZE_TASK_ID);
                assert_eq!(*attempts, 4);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(matches!(err.root_cause(), BronzeError::StorageUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_zero_retries_runs_once() {
        let mut job = JobDefinition::breweries_ingestion();
        job.dag.retries = 0;
        let (task, calls) = flaky(1);
        let runner = WorkflowRunner::new().register(BRONZE_TASK_ID, task);

        assert!(runner.run(&job, "2025-10-06").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unregistered_task_is_config_error() {
        let (task, calls) = flaky(0);
        let runner = WorkflowRunner::new().register("silver_layer", task);

        let err = runner
            .run(&JobDefinition::breweries_ingestion(), "2025-10-06")
            .await
            .unwrap_err();

        assert!(matches!(err, BronzeError::ConfigError { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_execution_date_is_rejected() {
        let (task, calls) = flaky(0);
        let runner = WorkflowRunner::new().register(BRONZE_TASK_ID, task);

        assert!(runner
            .run(&JobDefinition::breweries_ingestion(), "{{ ds }}")
            .await
            .is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
