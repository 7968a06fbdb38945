//! LanceDB-backed vector store.
//!
//! The store is a LanceDB database directory holding a single table:
//!
//! ```text
//! <store>/embeddings.lance/_versions/   one manifest per committed write
//! <store>/embeddings.lance/data/        Lance data files
//! ```
//!
//! Text columns are Arrow `Utf8`, the vector column is a
//! `FixedSizeList<Float32>`. Every batched insert is one `Table::add`.

use arrow_array::types::Float32Type;
use arrow_array::{ArrayRef, FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray};
use arrow_schema::SchemaRef;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::ExecutableQuery;
use lancedb::{connect, Connection, Table};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::sink::check_row;
use crate::{archive, EnrichedRow, Schema, Sink, SinkError};

/// Rows buffered before one batched insert.
pub const FLUSH_BATCH_SIZE: usize = 1000;

/// Name of the table inside the store directory.
pub const TABLE_NAME: &str = "embeddings";

/// Build one Arrow batch from rows already checked against `schema`.
pub fn record_batch(schema: &Schema, rows: &[EnrichedRow]) -> Result<RecordBatch, SinkError> {
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

    for idx in 0..schema.text_fields().len() {
        let values: Vec<&str> = rows.iter().map(|r| r.row.values()[idx].as_str()).collect();
        columns.push(Arc::new(StringArray::from(values)));
    }

    let vectors = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
        rows.iter()
            .map(|r| Some(r.embedding.iter().copied().map(Some))),
        schema.dimension() as i32,
    );
    columns.push(Arc::new(vectors));

    Ok(RecordBatch::try_new(Arc::new(schema.to_arrow()), columns)?)
}

pub struct VectorStore {
    dir: PathBuf,
    db: Connection,
    table: Table,
}

impl VectorStore {
    /// Create an empty store at `dir`, replacing any store already there.
    pub async fn create(dir: impl Into<PathBuf>, schema: &Schema) -> Result<Self, SinkError> {
        let dir = dir.into();
        if dir.exists() {
            tracing::warn!(path = %dir.display(), "replacing existing vector store");
            fs::remove_dir_all(&dir).map_err(SinkError::io(&dir))?;
        }
        fs::create_dir_all(&dir).map_err(SinkError::io(&dir))?;

        let db = connect(dir.to_string_lossy().as_ref()).execute().await?;
        let table = db
            .create_empty_table(TABLE_NAME, Arc::new(schema.to_arrow()))
            .execute()
            .await?;
        Ok(Self { dir, db, table })
    }

    /// Open an existing store.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        let db = connect(dir.to_string_lossy().as_ref()).execute().await?;
        let table = db.open_table(TABLE_NAME).execute().await?;
        Ok(Self { dir, db, table })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn arrow_schema(&self) -> Result<SchemaRef, SinkError> {
        Ok(self.table.schema().await?)
    }

    /// Append `batch` as one write. Lance validates it against the table
    /// schema. Empty batches write nothing.
    pub async fn add(&self, batch: RecordBatch) -> Result<usize, SinkError> {
        let rows = batch.num_rows();
        if rows == 0 {
            return Ok(0);
        }
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        self.table.add(reader).execute().await?;
        tracing::debug!(path = %self.dir.display(), rows, "batch added");
        Ok(rows)
    }

    pub async fn count_rows(&self) -> Result<u64, SinkError> {
        Ok(self.table.count_rows(None).await? as u64)
    }

    /// Read every row back.
    pub async fn scan(&self) -> Result<Vec<RecordBatch>, SinkError> {
        let stream = self.table.query().execute().await?;
        Ok(stream.try_collect().await?)
    }

    /// Release the table and the connection. Returns the row count.
    pub async fn close(self) -> Result<u64, SinkError> {
        let rows = self.count_rows().await?;
        drop(self.table);
        drop(self.db);
        Ok(rows)
    }
}

/// Vector-store sink: buffers rows and inserts them [`FLUSH_BATCH_SIZE`] at a
/// time, then archives the store directory on `finalize`.
pub struct VectorStoreSink {
    dir: PathBuf,
    archive_path: PathBuf,
    store: Option<VectorStore>,
    schema: Option<Schema>,
    buffer: Vec<EnrichedRow>,
    flushes: Vec<usize>,
    finalized: bool,
}

impl VectorStoreSink {
    /// `dir` is the working store directory, removed once `archive_path` has
    /// been written.
    pub fn new(dir: impl Into<PathBuf>, archive_path: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            archive_path: archive_path.into(),
            store: None,
            schema: None,
            buffer: Vec::with_capacity(FLUSH_BATCH_SIZE),
            flushes: Vec::new(),
            finalized: false,
        }
    }

    /// Size of every batched insert so far, in order.
    pub fn flushes(&self) -> &[usize] {
        &self.flushes
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        let (Some(store), Some(schema)) = (self.store.as_ref(), self.schema.as_ref()) else {
            return Err(SinkError::NotInitialized);
        };
        let batch = record_batch(schema, &self.buffer)?;
        let n = store.add(batch).await?;
        self.buffer.clear();
        self.flushes.push(n);
        tracing::info!(rows = n, batches = self.flushes.len(), "flushed batch to vector store");
        Ok(())
    }
}

#[async_trait]
impl Sink for VectorStoreSink {
    async fn initialize(&mut self, schema: &Schema) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized);
        }
        if self.store.is_some() {
            return Err(SinkError::AlreadyInitialized);
        }
        self.store = Some(VectorStore::create(&self.dir, schema).await?);
        self.schema = Some(schema.clone());
        tracing::debug!(path = %self.dir.display(), dimension = schema.dimension(), "vector store created");
        Ok(())
    }

    async fn accept(&mut self, row: EnrichedRow) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized);
        }
        let schema = self.schema.as_ref().ok_or(SinkError::NotInitialized)?;
        check_row(schema, &row)?;

        self.buffer.push(row);
        if self.buffer.len() >= FLUSH_BATCH_SIZE {
            self.flush().await?;
        }
        Ok(())
    }

    async fn finalize(&mut self) -> Result<Option<PathBuf>, SinkError> {
        if self.finalized {
            return Err(SinkError::Finalized);
        }
        if self.store.is_none() {
            return Err(SinkError::NotInitialized);
        }
        if !self.buffer.is_empty() {
            self.flush().await?;
        }
        self.finalized = true;

        let store = self.store.take().ok_or(SinkError::NotInitialized)?;
        let rows = store.close().await?;
        let stats = archive(&self.dir, &self.archive_path)?;

        tracing::info!(
            archive = %self.archive_path.display(),
            rows,
            files = stats.files,
            "vector store archived"
        );
        Ok(Some(self.archive_path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{unpack, Row};
    use arrow_array::Array;

    const DIM: usize = 4;

    fn schema() -> Schema {
        Schema::derive(&["id", "text"], "embedding", DIM).unwrap()
    }

    fn row(i: usize) -> EnrichedRow {
        EnrichedRow::new(
            Row::from_pairs([("id", i.to_string()), ("text", format!("row {i}"))]),
            vec![i as f32; DIM],
        )
    }

    fn ids(batches: &[RecordBatch]) -> Vec<String> {
        let mut ids: Vec<String> = batches
            .iter()
            .flat_map(|b| {
                let col = b
                    .column(0)
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .unwrap()
                    .clone();
                (0..col.len()).map(move |i| col.value(i).to_string())
            })
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn record_batch_matches_arrow_schema() {
        let batch = record_batch(&schema(), &[row(0), row(1)]).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().as_ref(), &schema().to_arrow());
        let vectors = batch
            .column(2)
            .as_any()
            .downcast_ref::<FixedSizeListArray>()
            .unwrap();
        assert_eq!(vectors.value_length(), DIM as i32);
    }

    #[tokio::test]
    async fn store_add_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("store");
        let store = VectorStore::create(&store_dir, &schema()).await.unwrap();
        store.add(record_batch(&schema(), &[row(0), row(1)]).unwrap()).await.unwrap();
        store.add(record_batch(&schema(), &[row(2)]).unwrap()).await.unwrap();
        assert_eq!(store.add(record_batch(&schema(), &[]).unwrap()).await.unwrap(), 0);
        assert_eq!(store.close().await.unwrap(), 3);

        assert!(store_dir.join("embeddings.lance/_versions").is_dir());
        let reopened = VectorStore::open(&store_dir).await.unwrap();
        assert_eq!(reopened.count_rows().await.unwrap(), 3);
        assert_eq!(
            reopened.arrow_schema().await.unwrap().field(2).data_type(),
            schema().to_arrow().field(2).data_type()
        );
        assert_eq!(ids(&reopened.scan().await.unwrap()), vec!["0", "1", "2"]);
    }

    #[tokio::test]
    async fn create_replaces_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("store");
        let first = VectorStore::create(&store_dir, &schema()).await.unwrap();
        first.add(record_batch(&schema(), &[row(0)]).unwrap()).await.unwrap();
        first.close().await.unwrap();

        let second = VectorStore::create(&store_dir, &schema()).await.unwrap();
        assert_eq!(second.count_rows().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn open_without_table_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            VectorStore::open(dir.path()).await,
            Err(SinkError::Lance(_))
        ));
    }

    #[tokio::test]
    async fn sink_flushes_every_thousand_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("vectors");
        let archive_path = dir.path().join("vectors.tar.gz");
        let mut sink = VectorStoreSink::new(&store_dir, &archive_path);
        sink.initialize(&schema()).await.unwrap();

        for i in 0..2500 {
            sink.accept(row(i)).await.unwrap();
            if i == 999 {
                assert_eq!(sink.flushes(), &[1000]);
                assert_eq!(sink.buffered(), 0);
            }
        }
        assert_eq!(sink.flushes(), &[1000, 1000]);
        assert_eq!(sink.buffered(), 500);

        let out = sink.finalize().await.unwrap();
        assert_eq!(out.as_deref(), Some(archive_path.as_path()));
        assert_eq!(sink.flushes(), &[1000, 1000, 500]);
        assert!(!store_dir.exists());
        assert!(archive_path.is_file());

        let restored = dir.path().join("restored");
        unpack(&archive_path, &restored).unwrap();
        assert!(restored.join("embeddings.lance/_versions").is_dir());
        let store = VectorStore::open(&restored).await.unwrap();
        assert_eq!(store.count_rows().await.unwrap(), 2500);
    }

    #[tokio::test]
    async fn sink_with_no_rows_still_archives() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("vectors");
        let archive_path = dir.path().join("vectors.tar.gz");
        let mut sink = VectorStoreSink::new(&store_dir, &archive_path);
        sink.initialize(&schema()).await.unwrap();
        sink.finalize().await.unwrap();
        assert!(sink.flushes().is_empty());
        assert!(archive_path.is_file());
        assert!(!store_dir.exists());

        let restored = dir.path().join("restored");
        unpack(&archive_path, &restored).unwrap();
        let store = VectorStore::open(&restored).await.unwrap();
        assert_eq!(store.count_rows().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sink_rejects_bad_rows_before_buffering() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = VectorStoreSink::new(dir.path().join("v"), dir.path().join("v.tar.gz"));
        assert!(matches!(sink.accept(row(0)).await, Err(SinkError::NotInitialized)));
        sink.initialize(&schema()).await.unwrap();
        let bad = EnrichedRow::new(Row::from_pairs([("id", "1"), ("text", "x")]), vec![1.0]);
        assert!(matches!(sink.accept(bad).await, Err(SinkError::VectorLength { .. })));
        let short = EnrichedRow::new(Row::from_pairs([("id", "1")]), vec![1.0; DIM]);
        assert!(matches!(sink.accept(short).await, Err(SinkError::RowShape { .. })));
        assert_eq!(sink.buffered(), 0);
    }

    #[tokio::test]
    async fn failed_archive_keeps_store_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("vectors");
        let archive_path = dir.path().join("missing-parent/vectors.tar.gz");
        let mut sink = VectorStoreSink::new(&store_dir, &archive_path);
        sink.initialize(&schema()).await.unwrap();
        sink.accept(row(0)).await.unwrap();

        assert!(matches!(sink.finalize().await, Err(SinkError::Archive(_))));
        let store = VectorStore::open(&store_dir).await.unwrap();
        assert_eq!(store.count_rows().await.unwrap(), 1);
    }
}
