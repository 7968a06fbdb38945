//! Row stream transformer: one embedding call per row, strictly in order.

use embed::Embedder;
use store::{EnrichedRow, Row, Sink};

use crate::PipelineError;

/// Progress is logged every this many rows.
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Embed `embed_column` of every row and hand the result to `sink`.
///
/// Returns the number of rows accepted. The first error stops the stream;
/// rows already accepted stay with the sink. Row numbers in errors are
/// 1-based data rows (the header is not counted).
pub async fn transform<I, E, S>(
    rows: I,
    embed_column: &str,
    embedder: &E,
    sink: &mut S,
) -> Result<u64, PipelineError>
where
    I: IntoIterator<Item = Result<Row, PipelineError>>,
    E: Embedder + ?Sized,
    S: Sink + ?Sized,
{
    let mut accepted = 0u64;
    for row in rows {
        let row = row?;
        let number = accepted + 1;

        let text = row
            .get(embed_column)
            .ok_or_else(|| PipelineError::MissingColumn {
                column: embed_column.to_string(),
                row: Some(number),
            })?;
        let embedding = embedder
            .embed(text)
            .await
            .map_err(|source| PipelineError::Embedding {
                row: number,
                source,
            })?;

        sink.accept(EnrichedRow::new(row, embedding)).await?;
        accepted = number;

        if accepted % PROGRESS_INTERVAL == 0 {
            tracing::info!(rows = accepted, "rows embedded");
        }
    }
    Ok(accepted)
}
