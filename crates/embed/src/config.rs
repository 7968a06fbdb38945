use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::EmbedError;

/// Default OpenAI-compatible API root. `/embeddings` is appended.
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

/// The embedding models we know the output length of.
///
/// Configs can use either the short aliases (`small_03`, `large_03`, `ada_002`)
/// or the provider's model id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EmbeddingModel {
    #[default]
    #[serde(rename = "text-embedding-3-small", alias = "small_03")]
    TextEmbedding3Small,
    #[serde(rename = "text-embedding-3-large", alias = "large_03")]
    TextEmbedding3Large,
    #[serde(rename = "text-embedding-ada-002", alias = "ada_002")]
    TextEmbeddingAda002,
}

impl EmbeddingModel {
    pub const ALL: [EmbeddingModel; 3] = [
        EmbeddingModel::TextEmbedding3Small,
        EmbeddingModel::TextEmbedding3Large,
        EmbeddingModel::TextEmbeddingAda002,
    ];

    /// Provider model id sent on the wire.
    pub fn id(&self) -> &'static str {
        match self {
            EmbeddingModel::TextEmbedding3Small => "text-embedding-3-small",
            EmbeddingModel::TextEmbedding3Large => "text-embedding-3-large",
            EmbeddingModel::TextEmbeddingAda002 => "text-embedding-ada-002",
        }
    }

    /// Fixed output vector length.
    pub fn dimension(&self) -> usize {
        match self {
            EmbeddingModel::TextEmbedding3Small => 1536,
            EmbeddingModel::TextEmbedding3Large => 3072,
            EmbeddingModel::TextEmbeddingAda002 => 1536,
        }
    }

    fn alias(&self) -> &'static str {
        match self {
            EmbeddingModel::TextEmbedding3Small => "small_03",
            EmbeddingModel::TextEmbedding3Large => "large_03",
            EmbeddingModel::TextEmbeddingAda002 => "ada_002",
        }
    }
}

impl fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for EmbeddingModel {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.id() == wanted || m.alias() == wanted)
            .ok_or_else(|| EmbedError::InvalidConfig(format!("unknown embedding model '{wanted}'")))
    }
}

/// Everything the HTTP embedder needs. Built once at startup.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedConfig {
    /// Bearer credential for the provider.
    pub api_key: String,
    pub model: EmbeddingModel,
    /// API root, without the trailing `/embeddings`.
    pub api_base_url: String,
    /// Overall request timeout in seconds.
    pub timeout_secs: u64,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: EmbeddingModel::default(),
            api_base_url: DEFAULT_API_BASE_URL.into(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

// Keep the key out of logs.
impl fmt::Debug for EmbedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbedConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl EmbedConfig {
    /// Full URL of the embeddings endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/embeddings", self.api_base_url.trim_end_matches('/'))
    }
}
