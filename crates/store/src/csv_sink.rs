use async_trait::async_trait;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::sink::check_row;
use crate::{EnrichedRow, Schema, Sink, SinkError};

/// Serialize a vector as `[v0, v1, ...]`.
pub fn format_vector(values: &[f32]) -> String {
    let mut out = String::with_capacity(values.len() * 12 + 2);
    out.push('[');
    for (idx, value) in values.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        out.push_str(&value.to_string());
    }
    out.push(']');
    out
}

/// Flat-file sink: header on `initialize`, one flushed CSV record per row.
///
/// Nothing is buffered past a single record, so a failed run leaves every
/// row before the failure on disk.
pub struct CsvSink {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    schema: Option<Schema>,
    rows_written: u64,
    finalized: bool,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            schema: None,
            rows_written: 0,
            finalized: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

#[async_trait]
impl Sink for CsvSink {
    async fn initialize(&mut self, schema: &Schema) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized);
        }
        if self.writer.is_some() {
            return Err(SinkError::AlreadyInitialized);
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(SinkError::io(parent))?;
        }

        let file = File::create(&self.path).map_err(SinkError::io(&self.path))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(schema.names())?;
        writer.flush().map_err(SinkError::io(&self.path))?;

        tracing::debug!(path = %self.path.display(), columns = schema.fields().len(), "csv sink opened");
        self.writer = Some(writer);
        self.schema = Some(schema.clone());
        Ok(())
    }

    async fn accept(&mut self, row: EnrichedRow) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized);
        }
        let (Some(writer), Some(schema)) = (self.writer.as_mut(), self.schema.as_ref()) else {
            return Err(SinkError::NotInitialized);
        };
        check_row(schema, &row)?;

        let vector = format_vector(&row.embedding);
        writer.write_record(
            row.row
                .values()
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(vector.as_str())),
        )?;
        writer.flush().map_err(SinkError::io(&self.path))?;
        self.rows_written += 1;
        Ok(())
    }

    async fn finalize(&mut self) -> Result<Option<PathBuf>, SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized);
        }
        let writer = self.writer.take().ok_or(SinkError::NotInitialized)?;
        self.finalized = true;

        let file = writer
            .into_inner()
            .map_err(|e| SinkError::io(&self.path)(e.into_error()))?;
        file.sync_all().map_err(SinkError::io(&self.path))?;

        tracing::info!(path = %self.path.display(), rows = self.rows_written, "csv output written");
        Ok(None)
    }
}
