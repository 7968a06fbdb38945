//! Workspace umbrella crate for the CSV embedding connector.
//!
//! Reads one CSV table, embeds a chosen column of every row through an
//! [`Embedder`], and writes the rows plus their vectors either to a flat CSV
//! or to a columnar vector store that is archived into a single `.tar.gz`.
//!
//! ```no_run
//! use embedpipe::{DataDir, Job, Settings, ComponentConfig, run};
//! use embedpipe::OpenAiEmbedder;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let data = DataDir::new("/data");
//! let cfg = ComponentConfig::from_file(data.config_path())?;
//! let settings = Settings::from_config(&cfg)?;
//! let job = Job::resolve(&settings, &data)?;
//! let embedder = OpenAiEmbedder::new(&settings.embed)?;
//! let summary = run(&job, &embedder).await?;
//! println!("{} rows -> {}", summary.rows, summary.output.display());
//! # Ok(())
//! # }
//! ```

pub mod columns;
pub mod config;
pub mod datadir;
pub mod input;
pub mod transform;

pub use columns::{ColumnOption, ColumnSource, LocalColumns, StorageApiColumns, to_options};
pub use config::{Action, ComponentConfig, ConfigError, OutputFormat, RuntimeEnv, Settings};
pub use datadir::{DataDir, OutputTarget, output_name};
pub use embed::{EmbedConfig, EmbedError, Embedder, EmbeddingModel, OpenAiEmbedder, StubEmbedder};
pub use input::CsvRowReader;
pub use store::{ArchiveError, Schema, SchemaError, Sink, SinkError};
pub use transform::transform;

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use store::{CsvSink, DEFAULT_VECTOR_COLUMN, VectorStoreSink};

/// Errors that terminate a run.
#[derive(Debug)]
pub enum PipelineError {
    /// Zero or several input tables.
    NoInput(String),
    /// Embed column absent from the header (`row: None`) or from a record.
    MissingColumn { column: String, row: Option<u64> },
    Embedding { row: u64, source: EmbedError },
    Schema(SchemaError),
    Archive(ArchiveError),
    Config(ConfigError),
    Input { path: PathBuf, source: csv::Error },
    /// Storage API lookup for `listColumns`.
    Storage(String),
    Sink(SinkError),
}

impl PipelineError {
    /// Errors the user can fix by changing configuration or input data.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, PipelineError::Sink(_))
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::NoInput(msg) => f.write_str(msg),
            PipelineError::MissingColumn { column, row: None } => {
                write!(f, "embed column '{column}' not found in input table")
            }
            PipelineError::MissingColumn {
                column,
                row: Some(row),
            } => write!(f, "embed column '{column}' missing in row {row}"),
            PipelineError::Embedding { row, source } => {
                write!(f, "embedding failed at row {row}: {source}")
            }
            PipelineError::Schema(err) => write!(f, "invalid output schema: {err}"),
            PipelineError::Archive(err) => write!(f, "archiving failed: {err}"),
            PipelineError::Config(err) => write!(f, "{err}"),
            PipelineError::Input { path, source } => {
                write!(f, "failed to read input {}: {source}", path.display())
            }
            PipelineError::Storage(msg) => write!(f, "storage API: {msg}"),
            PipelineError::Sink(err) => write!(f, "output failed: {err}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Embedding { source, .. } => Some(source),
            PipelineError::Schema(err) => Some(err),
            PipelineError::Archive(err) => Some(err),
            PipelineError::Config(err) => Some(err),
            PipelineError::Input { source, .. } => Some(source),
            PipelineError::Sink(err) => Some(err),
            PipelineError::NoInput(_)
            | PipelineError::MissingColumn { .. }
            | PipelineError::Storage(_) => None,
        }
    }
}

impl From<SchemaError> for PipelineError {
    fn from(value: SchemaError) -> Self {
        PipelineError::Schema(value)
    }
}

impl From<ArchiveError> for PipelineError {
    fn from(value: ArchiveError) -> Self {
        PipelineError::Archive(value)
    }
}

impl From<ConfigError> for PipelineError {
    fn from(value: ConfigError) -> Self {
        PipelineError::Config(value)
    }
}

impl From<SinkError> for PipelineError {
    fn from(value: SinkError) -> Self {
        match value {
            SinkError::Archive(err) => PipelineError::Archive(err),
            other => PipelineError::Sink(other),
        }
    }
}

/// Everything a run needs, resolved before any row is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub input: PathBuf,
    pub embed_column: String,
    pub target: OutputTarget,
}

impl Job {
    /// Locate the input table and fix the output location.
    pub fn resolve(settings: &Settings, data_dir: &DataDir) -> Result<Self, PipelineError> {
        let input = data_dir.locate_input()?;
        let target = data_dir.output_target(settings, &input)?;
        Ok(Self {
            input,
            embed_column: settings.embed_column.clone(),
            target,
        })
    }

    fn sink(&self) -> Box<dyn Sink> {
        match &self.target {
            OutputTarget::Csv { path } => Box::new(CsvSink::new(path)),
            OutputTarget::VectorStore { dir, archive } => {
                Box::new(VectorStoreSink::new(dir, archive))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub rows: u64,
    pub format: OutputFormat,
    pub output: PathBuf,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "embedded {} rows, format {}, output {}",
            self.rows,
            self.format,
            self.output.display()
        )
    }
}

/// Run one job end to end.
///
/// The embed column is checked against the header before the sink is
/// touched, so a missing column never leaves a partial output behind.
pub async fn run<E>(job: &Job, embedder: &E) -> Result<RunSummary, PipelineError>
where
    E: Embedder + ?Sized,
{
    let reader = CsvRowReader::open(&job.input)?;
    if !reader.columns().iter().any(|c| c == &job.embed_column) {
        return Err(PipelineError::MissingColumn {
            column: job.embed_column.clone(),
            row: None,
        });
    }

    let schema = Schema::derive(reader.columns(), DEFAULT_VECTOR_COLUMN, embedder.dimension())?;
    tracing::info!(
        input = %job.input.display(),
        column = %job.embed_column,
        model = embedder.model_id(),
        dimension = embedder.dimension(),
        format = %job.target.format(),
        "starting embedding run"
    );

    let mut sink = job.sink();
    sink.initialize(&schema).await?;
    let rows = transform(reader, &job.embed_column, embedder, sink.as_mut()).await?;
    let archive = sink.finalize().await?;

    let output = archive.unwrap_or_else(|| job.target.output_path().to_path_buf());
    let summary = RunSummary {
        rows,
        format: job.target.format(),
        output,
    };
    tracing::info!(rows = summary.rows, output = %summary.output.display(), "run finished");
    Ok(summary)
}
