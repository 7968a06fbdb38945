use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use crate::{EmbedConfig, EmbedError, Embedder, EmbeddingModel};

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
///
/// One HTTP request per [`embed`](Embedder::embed) call. The client is owned
/// by the embedder, so two embedders never share connection state.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: EmbeddingModel,
}

impl OpenAiEmbedder {
    pub fn new(cfg: &EmbedConfig) -> Result<Self, EmbedError> {
        let key = cfg.api_key.trim();
        if key.is_empty() {
            return Err(EmbedError::InvalidConfig("api key is empty".into()));
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| EmbedError::InvalidConfig("api key is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| EmbedError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: cfg.endpoint(),
            model: cfg.model,
        })
    }

    pub fn model(&self) -> EmbeddingModel {
        self.model
    }

    async fn send_api_request(&self, payload: &Value) -> Result<Value, EmbedError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| EmbedError::Request(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| EmbedError::MalformedResponse(format!("invalid JSON response: {e}")))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let payload = build_api_payload(self.model, text);
        tracing::trace!(model = self.model.id(), chars = text.len(), "requesting embedding");

        let response = self.send_api_request(&payload).await?;
        let vector = parse_single_embedding(response)?;
        check_dimension(self.model, vector)
    }

    fn dimension(&self) -> usize {
        self.model.dimension()
    }

    fn model_id(&self) -> &str {
        self.model.id()
    }
}

fn status_error(status: StatusCode, body: String) -> EmbedError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        EmbedError::RateLimited(body)
    } else {
        EmbedError::Api {
            status: status.as_u16(),
            body,
        }
    }
}

fn build_api_payload(model: EmbeddingModel, text: &str) -> Value {
    json!({ "input": text, "model": model.id() })
}

fn check_dimension(model: EmbeddingModel, vector: Vec<f32>) -> Result<Vec<f32>, EmbedError> {
    if vector.len() != model.dimension() {
        return Err(EmbedError::DimensionMismatch {
            model: model.id().to_string(),
            expected: model.dimension(),
            actual: vector.len(),
        });
    }
    Ok(vector)
}

/// Pull the one vector out of `{"data": [{"embedding": [...]}]}`.
fn parse_single_embedding(value: Value) -> Result<Vec<f32>, EmbedError> {
    let mut vectors = parse_embeddings_from_value(value)?;
    match vectors.len() {
        1 => Ok(vectors.remove(0)),
        0 => Err(EmbedError::MalformedResponse(
            "API response did not contain embeddings".into(),
        )),
        n => Err(EmbedError::MalformedResponse(format!(
            "API returned {n} embeddings for 1 input"
        ))),
    }
}

fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, EmbedError> {
    let Value::Object(mut map) = value else {
        return Err(EmbedError::MalformedResponse(
            "unsupported API response shape".into(),
        ));
    };

    let Some(Value::Array(items)) = map.remove("data") else {
        return Err(EmbedError::MalformedResponse(
            "missing `data` array in response".into(),
        ));
    };

    let mut vectors = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(mut obj) => match obj.remove("embedding") {
                Some(embedding) => vectors.push(parse_embedding_vector(embedding)?),
                None => {
                    return Err(EmbedError::MalformedResponse(
                        "missing `embedding` field in data item".into(),
                    ))
                }
            },
            _ => {
                return Err(EmbedError::MalformedResponse(
                    "unexpected entry inside `data` array".into(),
                ))
            }
        }
    }
    Ok(vectors)
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, EmbedError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .filter(|f| f.is_finite())
                    .ok_or_else(|| {
                        EmbedError::MalformedResponse(format!(
                            "embedding value {num} does not fit in an f32"
                        ))
                    }),
                other => Err(EmbedError::MalformedResponse(format!(
                    "embedding entries must be numbers, got {other:?}"
                ))),
            })
            .collect(),
        other => Err(EmbedError::MalformedResponse(format!(
            "embedding vector must be an array, got {other:?}"
        ))),
    }
}
