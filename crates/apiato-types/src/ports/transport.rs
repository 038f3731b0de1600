use async_trait::async_trait;

use crate::domain::http::{HttpRequest, TransportResponse};

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx answer. `body` is the decoded JSON body, or null.
    #[error("http {status}: {message}")]
    Status {
        status: u16,
        message: String,
        body: serde_json::Value,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Performs one HTTP round trip and decodes the body as JSON.
///
/// Implementations are shared across concurrently running requests, so they
/// must tolerate unbounded parallel calls.
#[async_trait]
pub trait HttpTransport: Send + Sync + 'static {
    async fn fetch(&self, request: HttpRequest) -> Result<TransportResponse, TransportError>;
}
