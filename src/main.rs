//! Connector entry point.
//!
//! Reads `KBC_DATADIR` (default `/data`), loads `<data>/config.json` and runs
//! the configured action. Exit codes: 0 on success, 1 for errors the user can
//! fix (configuration, input data, provider rejections), 2 for anything else.

use std::process::ExitCode;

use anyhow::Context;
use embedpipe::{
    Action, ColumnSource, ComponentConfig, ConfigError, DataDir, Job, LocalColumns,
    OpenAiEmbedder, PipelineError, RuntimeEnv, Settings, StorageApiColumns, run, to_options,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,reqwest=error,hyper=error,hyper_util=error";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    match execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = exit_code(&err);
            if code == USER_ERROR {
                tracing::error!("{err:#}");
            } else {
                tracing::error!(error = ?err, "run failed");
            }
            ExitCode::from(code)
        }
    }
}

const USER_ERROR: u8 = 1;
const INTERNAL_ERROR: u8 = 2;

/// 1 for a user-facing [`PipelineError`], 2 for everything else.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PipelineError>() {
        Some(pipeline) if pipeline.is_user_error() => USER_ERROR,
        _ => INTERNAL_ERROR,
    }
}

/// Logs go to stderr; stdout is reserved for action output.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn execute() -> anyhow::Result<()> {
    let env = RuntimeEnv::load().map_err(PipelineError::from)?;
    let data = DataDir::new(&env.datadir);
    let cfg = ComponentConfig::from_file(data.config_path()).map_err(PipelineError::from)?;
    tracing::debug!(data_dir = %data.root().display(), action = ?cfg.action, "configuration loaded");

    match cfg.action {
        Action::Run => run_action(&cfg, &data).await,
        Action::ListColumns => list_columns_action(&cfg, &env, data).await,
    }
}

async fn run_action(cfg: &ComponentConfig, data: &DataDir) -> anyhow::Result<()> {
    let settings = Settings::from_config(cfg).map_err(PipelineError::from)?;
    let job = Job::resolve(&settings, data)?;
    let embedder = OpenAiEmbedder::new(&settings.embed)
        .map_err(|e| PipelineError::from(ConfigError::Validation(e.to_string())))?;

    let summary = run(&job, &embedder).await?;
    println!("{summary}");
    Ok(())
}

async fn list_columns_action(
    cfg: &ComponentConfig,
    env: &RuntimeEnv,
    data: DataDir,
) -> anyhow::Result<()> {
    let source: Box<dyn ColumnSource> = match (env.storage_api(), cfg.input_table_id()) {
        (Some((url, token)), Some(table_id)) => {
            tracing::debug!(table_id, "listing columns via storage API");
            Box::new(StorageApiColumns::new(url, token, table_id)?)
        }
        _ => Box::new(LocalColumns::new(data)),
    };

    let columns = source.list_columns().await?;
    let json = serde_json::to_string(&to_options(columns)).context("serialize column list")?;
    println!("{json}");
    Ok(())
}
