use async_trait::async_trait;
use fxhash::hash64;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{EmbedError, Embedder, EmbeddingModel};

/// Deterministic embedder with no network.
/// Generates sinusoid values derived from a hash of the input text, so the same
/// text always gets the same vector.
pub struct StubEmbedder {
    dimension: usize,
    fail_on: Option<String>,
    calls: AtomicUsize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail_on: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Same output length as the real model would give.
    pub fn for_model(model: EmbeddingModel) -> Self {
        Self::new(model.dimension())
    }

    /// Fail with a provider error whenever the input equals `text`.
    pub fn failing_on(mut self, text: impl Into<String>) -> Self {
        self.fail_on = Some(text.into());
        self
    }

    /// How many times [`embed`](Embedder::embed) has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_on.as_deref() == Some(text) {
            return Err(EmbedError::Api {
                status: 500,
                body: format!("stub refused to embed {text:?}"),
            });
        }

        let h = hash64(text.as_bytes());
        let v = (0..self.dimension)
            .map(|idx| ((h >> (idx % 32)) as f32 * 0.0001).sin())
            .collect();
        Ok(v)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        "stub"
    }
}
