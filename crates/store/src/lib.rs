//! Output side of the embedding pipeline.
//!
//! Rows come in already enriched with a vector; this crate decides where they
//! land. There are two [`Sink`]s:
//!
//! - [`CsvSink`] appends every row to a CSV file as soon as it arrives.
//! - [`VectorStoreSink`] buffers rows, adds them to a LanceDB-backed
//!   [`VectorStore`] in batches of [`FLUSH_BATCH_SIZE`], and packs the store
//!   directory into a `.tar.gz` via [`archive`] when finalized.
//!
//! Both sinks are initialized from a [`Schema`] derived once from the input
//! header.

pub mod archive;
pub mod csv_sink;
pub mod error;
pub mod row;
pub mod schema;
pub mod sink;
pub mod vector_store;

pub use crate::archive::{archive, unpack, ArchiveError, ArchiveStats};
pub use crate::csv_sink::{format_vector, CsvSink};
pub use crate::error::SinkError;
pub use crate::row::{EnrichedRow, Row};
pub use crate::schema::{Field, FieldKind, Schema, SchemaError, DEFAULT_VECTOR_COLUMN};
pub use crate::sink::Sink;
pub use crate::vector_store::{
    record_batch, VectorStore, VectorStoreSink, FLUSH_BATCH_SIZE, TABLE_NAME,
};
