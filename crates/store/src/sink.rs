use async_trait::async_trait;
use std::path::PathBuf;

use crate::{EnrichedRow, Schema, SinkError};

/// Destination for enriched rows.
///
/// Call order is `initialize` once, `accept` per row, `finalize` once.
/// Implementations own their file handles for the whole run.
#[async_trait]
pub trait Sink: Send {
    /// Prepare storage for rows shaped like `schema`.
    async fn initialize(&mut self, schema: &Schema) -> Result<(), SinkError>;

    /// Take one row. Rows arrive in input order.
    async fn accept(&mut self, row: EnrichedRow) -> Result<(), SinkError>;

    /// Flush whatever is pending and close. Returns the archive path when the
    /// sink produces one.
    async fn finalize(&mut self) -> Result<Option<PathBuf>, SinkError>;
}

/// Reject rows that do not fit the schema before they reach storage.
///
/// Sinks call this in `accept`, so anything buffered is already known to fit.
pub(crate) fn check_row(schema: &Schema, row: &EnrichedRow) -> Result<(), SinkError> {
    let expected = schema.text_fields().len();
    if row.row.len() != expected {
        return Err(SinkError::RowShape {
            expected,
            actual: row.row.len(),
        });
    }
    let dimension = schema.dimension();
    if row.embedding.len() != dimension {
        return Err(SinkError::VectorLength {
            expected: dimension,
            actual: row.embedding.len(),
        });
    }
    Ok(())
}
