use arrow_schema::ArrowError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::ArchiveError;

/// Errors raised by a [`Sink`](crate::Sink) or the [`VectorStore`](crate::VectorStore).
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink used before initialize")]
    NotInitialized,
    #[error("sink already initialized")]
    AlreadyInitialized,
    #[error("sink already finalized")]
    Finalized,
    #[error("row has {actual} values, schema expects {expected}")]
    RowShape { expected: usize, actual: usize },
    #[error("embedding has {actual} values, schema expects {expected}")]
    VectorLength { expected: usize, actual: usize },
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("arrow encoding failed: {0}")]
    Arrow(#[from] ArrowError),
    #[error("vector store operation failed: {0}")]
    Lance(#[from] lancedb::Error),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

impl SinkError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> SinkError {
        let path = path.into();
        move |source| SinkError::Io { path, source }
    }
}
