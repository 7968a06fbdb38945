use thiserror::Error;

/// Errors surfaced by an [`Embedder`](crate::Embedder).
///
/// None of these are retried. The message always carries the provider's cause.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmbedError {
    /// Configuration is unusable (empty key, unknown model, bad header value).
    #[error("invalid embedding config: {0}")]
    InvalidConfig(String),
    /// Transport-level failure: DNS, connect, timeout, TLS.
    #[error("embedding request failed: {0}")]
    Request(String),
    /// The provider throttled us (HTTP 429).
    #[error("embedding provider rate limit hit: {0}")]
    RateLimited(String),
    /// Any other non-success HTTP status.
    #[error("embedding API error {status}: {body}")]
    Api { status: u16, body: String },
    /// The response body was not the shape we expect.
    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),
    /// The vector length does not match the model.
    #[error("embedding has {actual} dimensions, model {model} produces {expected}")]
    DimensionMismatch {
        model: String,
        expected: usize,
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_config() {
        let err = EmbedError::InvalidConfig("missing api key".into());
        assert!(err.to_string().contains("invalid embedding config"));
        assert!(err.to_string().contains("missing api key"));
    }

    #[test]
    fn error_api_status_and_body() {
        let err = EmbedError::Api {
            status: 401,
            body: "Incorrect API key provided".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("Incorrect API key provided"));
    }

    #[test]
    fn error_rate_limited() {
        let err = EmbedError::RateLimited("slow down".into());
        assert!(err.to_string().contains("rate limit"));
    }

    #[test]
    fn error_dimension_mismatch() {
        let err = EmbedError::DimensionMismatch {
            model: "text-embedding-3-small".into(),
            expected: 1536,
            actual: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("1536"));
        assert!(msg.contains("3 dimensions"));
    }

    #[test]
    fn error_debug_formatting() {
        let err = EmbedError::MalformedResponse("no data".into());
        let debug_str = format!("{err:?}");
        assert!(debug_str.contains("MalformedResponse"));
        assert!(debug_str.contains("no data"));
    }
}
