use anyhow::Context;
use brewery_bronze::config::job::BRONZE_TASK_ID;
use brewery_bronze::utils::error::ErrorSeverity;
use brewery_bronze::utils::{logger, validation::Validate};
use brewery_bronze::{
    BronzeError, BronzeLayerTask, CliConfig, IngestOptions, JobDefinition, StorageKey,
    StorageOverrides, WorkflowRunner,
};
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(config.log_format(), config.verbose);

    tracing::info!("Starting brewery-bronze");
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.validate() {
        fail(&e);
    }

    let job = match load_job(&config) {
        Ok(job) => job,
        Err(e) => fail(&e),
    };
    let execution_date = config.execution_date_or_today();

    if config.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        print_dry_run(&job, &execution_date)?;
        return Ok(());
    }

    let options = IngestOptions {
        page_size: config.page_size,
        check_liveness: !config.skip_health_check,
        probe_public_url: config.probe_public_url,
    };
    let runner = WorkflowRunner::new().register(
        BRONZE_TASK_ID,
        BronzeLayerTask::new(StorageOverrides::default(), options),
    );

    match runner.run(&job, &execution_date).await {
        Ok(report) => {
            tracing::info!("✅ Ingestion completed successfully!");
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(e) => fail(&e),
    }
}

/// Built-in job or `--job` file, with command line overrides applied.
fn load_job(config: &CliConfig) -> brewery_bronze::Result<JobDefinition> {
    let mut job = match &config.job {
        Some(path) => {
            tracing::info!("📁 Loading job definition from: {}", path);
            JobDefinition::from_file(path)?
        }
        None => JobDefinition::breweries_ingestion(),
    };

    if let Some(url) = &config.source_url {
        job.set_task_param(BRONZE_TASK_ID, "raw_data_url", url.as_str())?;
    }
    if let Some(bucket) = &config.bucket {
        job.set_task_param(BRONZE_TASK_ID, "bucket_name", bucket.as_str())?;
    }
    if let Some(endpoint) = &config.endpoint_url {
        job.set_task_param(BRONZE_TASK_ID, "endpoint_url", endpoint.as_str())?;
    }

    job.validate()?;
    Ok(job)
}

fn print_dry_run(job: &JobDefinition, execution_date: &str) -> anyhow::Result<()> {
    println!("{}", job.to_toml_string()?);
    for task in &job.tasks {
        let params = task
            .render_params(execution_date)
            .with_context(|| format!("rendering parameters of task '{}'", task.task_id))?;
        println!("# {} rendered for {}: {:?}", task.task_id, execution_date, params);
    }
    let key = StorageKey::breweries(execution_date)?;
    println!("# target key: {}", key);
    Ok(())
}

fn fail(e: &BronzeError) -> ! {
    tracing::error!(
        "❌ Ingestion failed: {} (Severity: {:?})",
        e,
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
