//! Embedding client adapter.
//!
//! Turns a string into a fixed-length vector by asking a remote embedding
//! model. One call in, one vector out; no retries and no caching. Provider
//! failures surface as [`EmbedError`].
//!
//! Two implementations of [`Embedder`] ship here:
//!
//! - **[`OpenAiEmbedder`]** - talks to an OpenAI-compatible `/embeddings` endpoint.
//! - **[`StubEmbedder`]** - deterministic fake vectors, no network. Tests use it.
//!
//! ## Quick example
//!
//! ```no_run
//! use embed::{EmbedConfig, Embedder, EmbeddingModel, OpenAiEmbedder};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let cfg = EmbedConfig {
//!         api_key: "sk-...".into(),
//!         model: EmbeddingModel::TextEmbedding3Small,
//!         ..Default::default()
//!     };
//!     let embedder = OpenAiEmbedder::new(&cfg).unwrap();
//!     let vector = embedder.embed("This is a test.").await.unwrap();
//!     assert_eq!(vector.len(), 1536);
//! }
//! ```

pub mod config;
pub mod error;

mod api;
mod stub;

pub use crate::api::OpenAiEmbedder;
pub use crate::config::{EmbedConfig, EmbeddingModel};
pub use crate::error::EmbedError;
pub use crate::stub::StubEmbedder;

use async_trait::async_trait;

/// Something that can turn text into a vector.
///
/// Implementations must return exactly [`dimension`](Self::dimension) values
/// per call, or fail.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one string. Empty input is forwarded as-is.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Model identifier, for logs and summaries.
    fn model_id(&self) -> &str;
}
